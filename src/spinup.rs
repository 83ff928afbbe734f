//! Spin-up diagnostics: one point per spin-up cycle, tracking how plant and
//! soil carbon pools, CO2, deposition and carbon fluxes settle towards
//! equilibrium.

use log::debug;
use ndarray::{ArrayD, ArrayView1, Axis};

use crate::aggregate::{mean, Label, Table};
use crate::data::model::RawDataset;
use crate::data::select::DEFAULT_SPATIAL_DIMS;
use crate::error::{Error, Result};
use crate::units::DAYS_PER_YEAR;

/// Spatial dimensions of CASA output.
pub const CASA_SPATIAL_DIMS: [&str; 1] = ["land"];

/// State at the end of one spin-up cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinupPoint {
    /// Foliage, wood, root (g C m-2).
    pub cplant: [f64; 3],
    /// Active, slow, passive (g C m-2).
    pub csoil: [f64; 3],
    /// umol mol-1
    pub co2: f64,
    /// g N m-2 y-1
    pub ndep: f64,
    /// g P m-2 y-1
    pub pdep: f64,
    pub gpp: f64,
    pub npp: f64,
    pub nep: f64,
}

impl SpinupPoint {
    /// Extract a point from the CASA and CABLE outputs of one cycle.
    ///
    /// Pools, deposition and CO2 come from the last time step; GPP, NPP and
    /// NEP are time means over the cycle. Deposition is scaled from per-day
    /// to per-year. Only the first grid point is read: index 0 of every
    /// spatial dimension.
    pub fn extract(casa: &RawDataset, cable: &RawDataset) -> Result<Self> {
        let point = SpinupPoint {
            cplant: last_pools(casa, "cplant")?,
            csoil: last_pools(casa, "csoil")?,
            co2: last_value(cable, "CO2air", &DEFAULT_SPATIAL_DIMS)?,
            ndep: last_value(casa, "Nmindep", &CASA_SPATIAL_DIMS)? * DAYS_PER_YEAR,
            pdep: last_value(casa, "Pdep", &CASA_SPATIAL_DIMS)? * DAYS_PER_YEAR,
            gpp: time_mean(casa, "Cgpp")?,
            npp: time_mean(casa, "Cnpp")?,
            nep: time_mean(casa, "Cnep")?,
        };
        debug!("spin-up point: {point:?}");
        Ok(point)
    }
}

/// `name` at index 0 of each dimension in `spatial_dims`, checked to have
/// `rank` remaining dimensions.
fn first_point(
    dataset: &RawDataset,
    name: &str,
    spatial_dims: &[&str],
    rank: usize,
) -> Result<ArrayD<f64>> {
    let var = dataset
        .variable(name)
        .ok_or_else(|| Error::MissingVariable(name.to_string()))?;

    let mut data = var.data.view();
    // Highest axis first so earlier indices stay valid.
    for (axis, dim) in var.dims.iter().enumerate().rev() {
        if !spatial_dims.contains(&dim.as_str()) {
            continue;
        }
        if data.len_of(Axis(axis)) == 0 {
            return Err(Error::EmptySeries(name.to_string()));
        }
        data = data.index_axis_move(Axis(axis), 0);
    }
    if data.ndim() != rank {
        return Err(Error::UnsupportedRank {
            variable: var.name.clone(),
            dims: var.dims.clone(),
        });
    }
    Ok(data.to_owned())
}

fn series(dataset: &RawDataset, name: &str, spatial_dims: &[&str]) -> Result<Vec<f64>> {
    Ok(first_point(dataset, name, spatial_dims, 1)?
        .iter()
        .copied()
        .collect())
}

fn last_value(dataset: &RawDataset, name: &str, spatial_dims: &[&str]) -> Result<f64> {
    series(dataset, name, spatial_dims)?
        .last()
        .copied()
        .ok_or_else(|| Error::EmptySeries(name.to_string()))
}

fn time_mean(dataset: &RawDataset, name: &str) -> Result<f64> {
    let values = series(dataset, name, &CASA_SPATIAL_DIMS)?;
    if values.is_empty() {
        return Err(Error::EmptySeries(name.to_string()));
    }
    Ok(mean(&values))
}

/// The first three pools of `name` at the last time step.
fn last_pools(dataset: &RawDataset, name: &str) -> Result<[f64; 3]> {
    let data = first_point(dataset, name, &CASA_SPATIAL_DIMS, 2)?;
    let steps = data.len_of(Axis(0));
    if steps == 0 {
        return Err(Error::EmptySeries(name.to_string()));
    }
    let last: ArrayView1<'_, f64> = data
        .index_axis(Axis(0), steps - 1)
        .into_dimensionality()
        .map_err(|_| Error::UnsupportedRank {
            variable: name.to_string(),
            dims: vec!["time".to_string(), "pool".to_string()],
        })?;
    if last.len() < 3 {
        return Err(Error::PoolOutOfRange {
            variable: name.to_string(),
            pool: 2,
            pools: last.len(),
        });
    }
    Ok([last[0], last[1], last[2]])
}

/// Spin-up points of one model configuration (C, CN or CNP), by cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinupTrajectory {
    pub configuration: String,
    pub points: Vec<(u32, SpinupPoint)>,
}

impl SpinupTrajectory {
    pub fn new(configuration: &str) -> Self {
        SpinupTrajectory {
            configuration: configuration.to_string(),
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, cycle: u32, point: SpinupPoint) {
        self.points.push((cycle, point));
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// One row per cycle.
    pub fn to_table(&self) -> Result<Table> {
        let columns: [(&str, fn(&SpinupPoint) -> f64); 12] = [
            ("cf", |p| p.cplant[0]),
            ("cw", |p| p.cplant[1]),
            ("cr", |p| p.cplant[2]),
            ("cactive", |p| p.csoil[0]),
            ("cslow", |p| p.csoil[1]),
            ("cpassive", |p| p.csoil[2]),
            ("co2", |p| p.co2),
            ("ndep", |p| p.ndep),
            ("pdep", |p| p.pdep),
            ("gpp", |p| p.gpp),
            ("npp", |p| p.npp),
            ("nep", |p| p.nep),
        ];
        let mut table = Table::new(
            "cycle",
            self.points.iter().map(|(c, _)| Label::Cycle(*c)).collect(),
        );
        for (name, value) in columns {
            table.push(
                name.to_string(),
                self.points.iter().map(|(_, p)| value(p)).collect(),
            )?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Variable;

    fn casa() -> RawDataset {
        // 2 steps, 3 pools, 1 land point
        RawDataset::new()
            .with_variable(
                Variable::from_shape_vec(
                    "cplant",
                    &["time", "pool", "land"],
                    &[2, 3, 1],
                    vec![1.0, 2.0, 3.0, 300.0, 4000.0, 500.0],
                )
                .unwrap(),
            )
            .with_variable(
                Variable::from_shape_vec(
                    "csoil",
                    &["time", "pool", "land"],
                    &[2, 3, 1],
                    vec![0.0, 0.0, 0.0, 100.0, 2000.0, 8000.0],
                )
                .unwrap(),
            )
            .with_variable(Variable::from_shape_vec("Nmindep", &["time", "land"], &[2, 1], vec![0.0, 0.002]).unwrap())
            .with_variable(Variable::from_shape_vec("Pdep", &["time", "land"], &[2, 1], vec![0.0, 0.0001]).unwrap())
            .with_variable(Variable::from_shape_vec("Cgpp", &["time", "land"], &[2, 1], vec![4.0, 6.0]).unwrap())
            .with_variable(Variable::from_shape_vec("Cnpp", &["time", "land"], &[2, 1], vec![2.0, 3.0]).unwrap())
            .with_variable(Variable::from_shape_vec("Cnep", &["time", "land"], &[2, 1], vec![0.5, 0.5]).unwrap())
    }

    fn cable() -> RawDataset {
        RawDataset::new().with_variable(
            Variable::from_shape_vec("CO2air", &["time", "y", "x"], &[2, 1, 1], vec![284.0, 285.0]).unwrap(),
        )
    }

    #[test]
    fn test_extract() {
        let point = SpinupPoint::extract(&casa(), &cable()).unwrap();
        assert_eq!(point.cplant, [300.0, 4000.0, 500.0]);
        assert_eq!(point.csoil, [100.0, 2000.0, 8000.0]);
        assert_eq!(point.co2, 285.0);
        assert!((point.ndep - 0.73).abs() < 1e-12);
        assert!((point.pdep - 0.0365).abs() < 1e-12);
        assert_eq!(point.gpp, 5.0);
        assert_eq!(point.npp, 2.5);
        assert_eq!(point.nep, 0.5);
    }

    #[test]
    fn test_extract_missing_cable_variable() {
        assert!(matches!(
            SpinupPoint::extract(&casa(), &RawDataset::new()),
            Err(Error::MissingVariable(name)) if name == "CO2air"
        ));
    }

    #[test]
    fn test_trajectory_table() {
        let point = SpinupPoint::extract(&casa(), &cable()).unwrap();
        let mut trajectory = SpinupTrajectory::new("CNP");
        trajectory.push(1, point);
        trajectory.push(2, point);
        let table = trajectory.to_table().unwrap();
        assert_eq!(table.rows(), &[Label::Cycle(1), Label::Cycle(2)]);
        assert_eq!(table.column("cw").unwrap(), &[4000.0, 4000.0]);
        assert_eq!(table.columns().len(), 12);
    }

    #[test]
    fn test_extract_reads_first_land_point() {
        // one step, 3 pools, 2 land points; land 0 holds 1, 2, 3
        let two_points = |name: &str| {
            Variable::from_shape_vec(
                name,
                &["time", "pool", "land"],
                &[1, 3, 2],
                vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0],
            )
            .unwrap()
        };
        let flux = |name: &str, v: f64| {
            Variable::from_shape_vec(name, &["time", "land"], &[1, 2], vec![v, -1.0]).unwrap()
        };
        let casa = RawDataset::new()
            .with_variable(two_points("cplant"))
            .with_variable(two_points("csoil"))
            .with_variable(flux("Nmindep", 0.001))
            .with_variable(flux("Pdep", 0.0))
            .with_variable(flux("Cgpp", 4.0))
            .with_variable(flux("Cnpp", 2.0))
            .with_variable(flux("Cnep", 1.0));

        let point = SpinupPoint::extract(&casa, &cable()).unwrap();
        assert_eq!(point.cplant, [1.0, 2.0, 3.0]);
        assert_eq!(point.csoil, [1.0, 2.0, 3.0]);
        assert_eq!(point.gpp, 4.0);
        assert!((point.ndep - 0.365).abs() < 1e-12);
    }

    #[test]
    fn test_extract_rejects_unexpected_rank() {
        let casa = casa().with_variable(
            Variable::from_shape_vec("Cgpp", &["time", "patch", "land"], &[2, 2, 1], vec![1.0; 4])
                .unwrap(),
        );
        assert!(matches!(
            SpinupPoint::extract(&casa, &cable()),
            Err(Error::UnsupportedRank { variable, .. }) if variable == "Cgpp"
        ));
    }
}
