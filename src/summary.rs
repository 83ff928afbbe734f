//! Annual carbon and nitrogen numbers from daily CASA output.

use std::fmt;

use crate::aggregate::{mean, Table};
use crate::error::Result;
use crate::frame::AnalysisFrame;
use crate::profile::VariableProfile;

/// Mean annual pool sizes for three pools, carbon and nitrogen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolSummary {
    pub carbon: [f64; 3],
    pub nitrogen: [f64; 3],
}

impl PoolSummary {
    fn from_table(table: &Table, carbon: &str, nitrogen: &str) -> Result<Self> {
        let mut summary = PoolSummary {
            carbon: [0.0; 3],
            nitrogen: [0.0; 3],
        };
        for p in 0..3 {
            summary.carbon[p] = table.mean(&format!("{carbon}[{p}]"))?;
            summary.nitrogen[p] = table.mean(&format!("{nitrogen}[{p}]"))?;
        }
        Ok(summary)
    }

    /// N:C per pool, from the mean pool sizes.
    pub fn nc_ratios(&self) -> [f64; 3] {
        [0, 1, 2].map(|p| self.nitrogen[p] / self.carbon[p])
    }
}

/// Annual C/N diagnostics of one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualSummary {
    pub years: usize,
    /// Foliage, wood, root.
    pub plant: PoolSummary,
    /// Active, slow, passive.
    pub soil: PoolSummary,
    /// Mean over years of the yearly wood:foliage carbon ratio.
    pub wood_to_foliage: f64,
    /// Mean annual mineral N input: net mineralisation + fixation + deposition.
    pub n_input: f64,
    /// Mean annual mineral N loss: gaseous loss + leaching + plant uptake.
    pub n_loss: f64,
    /// Mean annual change of the mineral N pool.
    pub n_change: f64,
    pub immobilisation: f64,
    pub uptake: f64,
    pub net_mineralisation: f64,
}

impl AnnualSummary {
    /// Aggregate a daily CASA frame (see [`VariableProfile::casa_annual`]) by
    /// calendar year and summarise.
    pub fn from_frame(frame: &AnalysisFrame) -> Result<Self> {
        let table = frame.annual(&VariableProfile::casa_annual().reducers())?;

        let foliage = table.column("cplant[0]")?;
        let wood = table.column("cplant[1]")?;
        let ratios: Vec<f64> = wood.iter().zip(foliage).map(|(w, f)| w / f).collect();

        let yearly = |names: [&str; 3]| -> Result<Vec<f64>> {
            let [a, b, c] = [table.column(names[0])?, table.column(names[1])?, table.column(names[2])?];
            Ok((0..table.len()).map(|i| a[i] + b[i] + c[i]).collect())
        };
        let input = yearly(["Nsnet", "Nminfix", "Nmindep"])?;
        let loss = yearly(["Nminloss", "Nminleach", "Nupland"])?;
        let change: Vec<f64> = input.iter().zip(&loss).map(|(i, l)| i - l).collect();

        Ok(AnnualSummary {
            years: table.len(),
            plant: PoolSummary::from_table(&table, "cplant", "nplant")?,
            soil: PoolSummary::from_table(&table, "csoil", "nsoil")?,
            wood_to_foliage: mean(&ratios),
            n_input: mean(&input),
            n_loss: mean(&loss),
            n_change: mean(&change),
            immobilisation: table.mean("Nsimm")?,
            uptake: table.mean("Nupland")?,
            net_mineralisation: table.mean("Nsnet")?,
        })
    }
}

impl fmt::Display for AnnualSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [cf, cw, cr] = self.plant.carbon;
        let [nf, nw, nr] = self.plant.nitrogen;
        let [rf, rw, rr] = self.plant.nc_ratios();
        writeln!(f, "Plant C & N ({} years)", self.years)?;
        writeln!(f, "  C  foliage {cf:.4}  wood {cw:.4}  root {cr:.4}  wood:foliage {:.4}", self.wood_to_foliage)?;
        writeln!(f, "  N  foliage {nf:.4}  wood {nw:.4}  root {nr:.4}")?;
        writeln!(f, "  N:C foliage {rf:.4}  wood {rw:.4}  root {rr:.4}")?;

        let [ca, cs, cp] = self.soil.carbon;
        let [na, ns, np] = self.soil.nitrogen;
        let [ra, rs, rp] = self.soil.nc_ratios();
        writeln!(f, "\nSoil C & N")?;
        writeln!(f, "  C  active {ca:.4}  slow {cs:.4}  passive {cp:.4}")?;
        writeln!(f, "  N  active {na:.4}  slow {ns:.4}  passive {np:.4}")?;
        writeln!(f, "  N:C active {ra:.4}  slow {rs:.4}  passive {rp:.4}")?;

        writeln!(f, "\nChange in mineral N pool (g N m-2 y-1)")?;
        writeln!(f, "  input {:.4}  loss {:.4}  net {:.4}", self.n_input, self.n_loss, self.n_change)?;
        writeln!(f, "\nN immobilisation\n  {:.4}", self.immobilisation)?;
        writeln!(f, "\nN uptake (g N m-2 y-1)\n  {:.4}", self.uptake)?;
        write!(f, "\nNet N mineralisation (g N m-2 y-1)\n  {:.4}", self.net_mineralisation)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, NaiveTime};
    use ndarray::Array2;

    use super::*;
    use crate::frame::Column;

    fn casa_frame(days: usize) -> AnalysisFrame {
        let start = NaiveDate::from_ymd_opt(2002, 1, 1).unwrap().and_time(NaiveTime::MIN);
        let index = (0..days).map(|i| start + Duration::days(i as i64)).collect();
        let pools = |values: [f64; 3]| Array2::from_shape_fn((days, 3), |(_, p)| values[p]);
        let named = |name: &str, v: f64| Column::from_values(name, vec![v; days]);

        let mut frame = AnalysisFrame::new(index);
        for column in [
            Column::new("cplant", pools([100.0, 1000.0, 200.0])),
            Column::new("nplant", pools([2.0, 5.0, 4.0])),
            Column::new("csoil", pools([50.0, 500.0, 5000.0])),
            Column::new("nsoil", pools([10.0, 50.0, 500.0])),
            named("Nsnet", 0.03),
            named("Nmindep", 0.002),
            named("Nminfix", 0.001),
            named("Nminleach", 0.001),
            named("Nupland", 0.025),
            named("Nminloss", 0.002),
            named("Nsimm", 0.5),
        ] {
            frame.push_column(column).unwrap();
        }
        frame
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_summary_numbers() {
        // two full non-leap years
        let summary = AnnualSummary::from_frame(&casa_frame(730)).unwrap();
        assert_eq!(summary.years, 2);
        assert_eq!(summary.plant.carbon, [100.0, 1000.0, 200.0]);
        assert!(close(summary.wood_to_foliage, 10.0));
        assert!(close(summary.plant.nc_ratios()[0], 0.02));
        assert!(close(summary.soil.nc_ratios()[2], 0.1));
        assert!(close(summary.n_input, 0.033 * 365.0));
        assert!(close(summary.n_loss, 0.028 * 365.0));
        assert!(close(summary.n_change, 0.005 * 365.0));
        assert!(close(summary.uptake, 0.025 * 365.0));
        assert!(close(summary.immobilisation, 0.5));
    }

    #[test]
    fn test_summary_missing_pool() {
        let mut frame = AnalysisFrame::new(casa_frame(10).index().to_vec());
        frame.push_column(Column::from_values("cplant", vec![1.0; 10])).unwrap();
        assert!(AnnualSummary::from_frame(&frame).is_err());
    }

    #[test]
    fn test_display_mentions_sections() {
        let text = AnnualSummary::from_frame(&casa_frame(365)).unwrap().to_string();
        assert!(text.contains("Plant C & N (1 years)"));
        assert!(text.contains("Soil C & N"));
        assert!(text.contains("Net N mineralisation"));
    }
}
