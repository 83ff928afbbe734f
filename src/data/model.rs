use std::collections::BTreeMap;

use ndarray::{ArrayD, IxDyn, ShapeError};

// ---------------------------------------------------------------------------
// TimeCoordinate – raw offsets plus their text encoding
// ---------------------------------------------------------------------------

/// The raw `time` coordinate: numeric offsets relative to `units`,
/// e.g. `"seconds since 2002-01-01 00:00:00"`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeCoordinate {
    pub values: Vec<f64>,
    pub units: Option<String>,
}

impl TimeCoordinate {
    pub fn new(values: Vec<f64>, units: Option<String>) -> Self {
        TimeCoordinate { values, units }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Variable – one named n-d array
// ---------------------------------------------------------------------------

/// A named variable with labeled dimensions.
///
/// `dims` and `data.shape()` always have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub units: Option<String>,
}

impl Variable {
    pub fn new(name: &str, dims: &[&str], data: ArrayD<f64>) -> Self {
        debug_assert_eq!(dims.len(), data.ndim());
        Variable {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
            data,
            units: None,
        }
    }

    /// Build from a flat row-major buffer.
    pub fn from_shape_vec(
        name: &str,
        dims: &[&str],
        shape: &[usize],
        values: Vec<f64>,
    ) -> Result<Self, ShapeError> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Ok(Variable::new(name, dims, data))
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Length of the named dimension, if present.
    pub fn dim_len(&self, dim: &str) -> Option<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .map(|axis| self.data.shape()[axis])
    }
}

// ---------------------------------------------------------------------------
// RawDataset – the complete loaded file
// ---------------------------------------------------------------------------

/// A loaded model output file. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    pub time: Option<TimeCoordinate>,
    pub variables: BTreeMap<String, Variable>,
}

impl RawDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, values: Vec<f64>, units: &str) -> Self {
        self.time = Some(TimeCoordinate::new(values, Some(units.to_string())));
        self
    }

    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.insert(variable);
        self
    }

    pub fn insert(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Variable names in sorted order.
    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(|k| k.as_str()).collect()
    }

    /// Number of time steps, taken from the time coordinate.
    pub fn time_len(&self) -> Option<usize> {
        self.time.as_ref().map(|t| t.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_len() {
        let var = Variable::from_shape_vec("cplant", &["time", "pool", "land"], &[4, 3, 1], vec![0.0; 12])
            .unwrap();
        assert_eq!(var.dim_len("pool"), Some(3));
        assert_eq!(var.dim_len("land"), Some(1));
        assert_eq!(var.dim_len("x"), None);
    }

    #[test]
    fn test_from_shape_vec_rejects_bad_length() {
        assert!(Variable::from_shape_vec("GPP", &["time"], &[4], vec![1.0; 3]).is_err());
    }

    #[test]
    fn test_dataset_lookup() {
        let ds = RawDataset::new()
            .with_time(vec![0.0, 3600.0], "seconds since 2002-01-01 00:00:00")
            .with_variable(Variable::from_shape_vec("Qle", &["time"], &[2], vec![1.0, 2.0]).unwrap());
        assert_eq!(ds.time_len(), Some(2));
        assert!(ds.variable("Qle").is_some());
        assert!(ds.variable("GPP").is_none());
        assert_eq!(ds.variable_names(), vec!["Qle"]);
    }
}
