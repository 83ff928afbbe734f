use chrono::NaiveDateTime;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::data::model::Variable;
use crate::error::{Error, Result};
use crate::units::UnitConversion;

// ---------------------------------------------------------------------------
// Column – one variable, N rows by P pools
// ---------------------------------------------------------------------------

/// One retained variable of an [`AnalysisFrame`].
///
/// Values are stored as an `N × P` matrix: `P == 1` for plain time series,
/// `P > 1` for pooled variables such as `cplant` (foliage, wood, root).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    units: Option<String>,
    data: Array2<f64>,
    conversion: Option<UnitConversion>,
}

impl Column {
    pub fn new(name: &str, data: Array2<f64>) -> Self {
        Column {
            name: name.to_string(),
            units: None,
            data,
            conversion: None,
        }
    }

    pub fn from_values(name: &str, values: Vec<f64>) -> Self {
        Column::new(name, Array1::from(values).insert_axis(Axis(1)))
    }

    /// A new column with the same name, units and conversion state, holding
    /// `data` (e.g. after resampling).
    pub fn derived(&self, data: Array2<f64>) -> Self {
        Column {
            name: self.name.clone(),
            units: self.units.clone(),
            data,
            conversion: self.conversion.clone(),
        }
    }

    /// Take a squeezed `(time)` or `(time, pool)` variable.
    pub fn from_variable(var: &Variable) -> Result<Self> {
        let data = match var.data.ndim() {
            1 => var.data.clone().insert_axis(Axis(1)),
            2 => var.data.clone(),
            _ => {
                return Err(Error::UnsupportedRank {
                    variable: var.name.clone(),
                    dims: var.dims.clone(),
                })
            }
        };
        let data = data
            .into_dimensionality()
            .map_err(|_| Error::UnsupportedRank {
                variable: var.name.clone(),
                dims: var.dims.clone(),
            })?;
        Ok(Column {
            name: var.name.clone(),
            units: var.units.clone(),
            data,
            conversion: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    pub fn pools(&self) -> usize {
        self.data.ncols()
    }

    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    /// The conversion already applied, if any.
    pub fn conversion(&self) -> Option<&UnitConversion> {
        self.conversion.as_ref()
    }

    /// The single series of a non-pooled column.
    pub fn series(&self) -> Result<ArrayView1<'_, f64>> {
        if self.pools() != 1 {
            return Err(Error::UnsupportedRank {
                variable: self.name.clone(),
                dims: vec!["time".to_string(), format!("pool({})", self.pools())],
            });
        }
        Ok(self.data.column(0))
    }

    pub fn pool(&self, pool: usize) -> Result<ArrayView1<'_, f64>> {
        if pool >= self.pools() {
            return Err(Error::PoolOutOfRange {
                variable: self.name.clone(),
                pool,
                pools: self.pools(),
            });
        }
        Ok(self.data.column(pool))
    }

    /// Series names after flattening: `GPP`, or `cplant[0]`, `cplant[1]`, ...
    pub fn series_names(&self) -> Vec<String> {
        if self.pools() == 1 {
            vec![self.name.clone()]
        } else {
            (0..self.pools())
                .map(|p| format!("{}[{p}]", self.name))
                .collect()
        }
    }

    /// Multiply every value by the conversion's multiplier for
    /// `step_seconds` and adopt its target units.
    ///
    /// A column is converted at most once; a second call fails with
    /// [`Error::ConversionAlreadyApplied`] and leaves the values untouched.
    pub fn apply_conversion(&mut self, conversion: &UnitConversion, step_seconds: f64) -> Result<()> {
        if self.conversion.is_some() {
            return Err(Error::ConversionAlreadyApplied(self.name.clone()));
        }
        let multiplier = conversion.multiplier(step_seconds);
        self.data.mapv_inplace(|v| v * multiplier);
        self.units = Some(conversion.target_units.clone());
        self.conversion = Some(conversion.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnalysisFrame – date-indexed table
// ---------------------------------------------------------------------------

/// A calendar-indexed table of retained variables, in target units.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl AnalysisFrame {
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        AnalysisFrame {
            index,
            columns: Vec::new(),
        }
    }

    /// Append a column; its row count must match the index.
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if column.len() != self.index.len() {
            return Err(Error::ShapeMismatch {
                variable: column.name,
                expected: self.index.len(),
                found: column.data.nrows(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn with_column(mut self, column: Column) -> Result<Self> {
        self.push_column(column)?;
        Ok(self)
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    pub fn column_mut(&mut self, name: &str) -> Result<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    /// Every column flattened to named series, pools split out.
    pub fn series(&self) -> Vec<(String, ArrayView1<'_, f64>)> {
        self.columns
            .iter()
            .flat_map(|c| {
                c.series_names()
                    .into_iter()
                    .enumerate()
                    .map(move |(p, name)| (name, c.data.column(p)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2002, 1, 1).unwrap();
        (0..n)
            .map(|i| (start + chrono::Duration::days(i as i64)).and_hms_opt(0, 0, 0).unwrap())
            .collect()
    }

    #[test]
    fn test_conversion_applies_once() {
        let mut col = Column::from_values("GPP", vec![10.0]);
        col.apply_conversion(&UnitConversion::carbon_flux_per_day(), 86400.0)
            .unwrap();
        let converted = col.series().unwrap()[0];
        assert!((converted - 10.368).abs() < 1e-9);
        assert_eq!(col.units(), Some("g C m-2 d-1"));

        let again = col.apply_conversion(&UnitConversion::carbon_flux_per_day(), 86400.0);
        assert!(matches!(again, Err(Error::ConversionAlreadyApplied(name)) if name == "GPP"));
        assert_eq!(col.series().unwrap()[0], converted);
    }

    #[test]
    fn test_per_step_conversion_uses_step() {
        let mut col = Column::from_values("TVeg", vec![1e-5, 2e-5]);
        col.apply_conversion(&UnitConversion::water_flux_per_step(), 1800.0)
            .unwrap();
        let s = col.series().unwrap();
        assert!((s[0] - 0.018).abs() < 1e-12);
        assert!((s[1] - 0.036).abs() < 1e-12);
    }

    #[test]
    fn test_push_column_checks_length() {
        let mut frame = AnalysisFrame::new(index(3));
        assert!(frame.push_column(Column::from_values("GPP", vec![1.0, 2.0, 3.0])).is_ok());
        assert!(matches!(
            frame.push_column(Column::from_values("Qle", vec![1.0])),
            Err(Error::ShapeMismatch { expected: 3, found: 1, .. })
        ));
    }

    #[test]
    fn test_pooled_series_names() {
        let var = Variable::from_shape_vec(
            "cplant",
            &["time", "pool"],
            &[2, 3],
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        )
        .unwrap();
        let col = Column::from_variable(&var).unwrap();
        assert_eq!(col.series_names(), vec!["cplant[0]", "cplant[1]", "cplant[2]"]);
        assert_eq!(col.pool(1).unwrap().to_vec(), vec![2.0, 5.0]);
        assert!(matches!(col.pool(3), Err(Error::PoolOutOfRange { pools: 3, .. })));
        assert!(col.series().is_err());

        let frame = AnalysisFrame::new(index(2)).with_column(col).unwrap();
        let names: Vec<String> = frame.series().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["cplant[0]", "cplant[1]", "cplant[2]"]);
    }

    #[test]
    fn test_from_variable_rejects_rank_three() {
        let var = Variable::from_shape_vec("GPP", &["time", "y", "x"], &[2, 1, 1], vec![1.0, 2.0]).unwrap();
        assert!(matches!(
            Column::from_variable(&var),
            Err(Error::UnsupportedRank { .. })
        ));
    }
}
