use log::debug;
use ndarray::Axis;

use super::model::{RawDataset, Variable};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Variable selection: keep the requested names, drop singleton spatial axes
// ---------------------------------------------------------------------------

/// Spatial dimensions squeezed by default.
pub const DEFAULT_SPATIAL_DIMS: [&str; 2] = ["x", "y"];

/// Restrict `dataset` to `names`, in the requested order, with every named
/// spatial dimension squeezed out.
///
/// A requested name that is absent from the dataset is an error.
pub fn select(dataset: &RawDataset, names: &[&str], spatial_dims: &[&str]) -> Result<Vec<Variable>> {
    names
        .iter()
        .map(|name| {
            let var = dataset
                .variable(name)
                .ok_or_else(|| Error::MissingVariable(name.to_string()))?;
            squeeze(var, spatial_dims)
        })
        .collect()
}

/// Remove every dimension listed in `spatial_dims` from a copy of `var`.
///
/// A listed dimension is only dropped when it has length 1:
/// * not present on the variable → ignored
/// * length 1 → removed
/// * any other length → [`Error::NonSingletonDimension`]
pub fn squeeze(var: &Variable, spatial_dims: &[&str]) -> Result<Variable> {
    let mut axes = Vec::new();
    for (axis, dim) in var.dims.iter().enumerate() {
        if !spatial_dims.contains(&dim.as_str()) {
            continue;
        }
        let len = var.data.shape()[axis];
        if len != 1 {
            return Err(Error::NonSingletonDimension {
                variable: var.name.clone(),
                dim: dim.clone(),
                len,
            });
        }
        axes.push(axis);
    }

    let mut data = var.data.clone();
    let mut dims = var.dims.clone();
    // Highest axis first so earlier indices stay valid.
    for &axis in axes.iter().rev() {
        data = data.index_axis_move(Axis(axis), 0);
        dims.remove(axis);
    }
    if !axes.is_empty() {
        debug!("squeezed {:?} -> {:?} for '{}'", var.dims, dims, var.name);
    }

    Ok(Variable {
        name: var.name.clone(),
        dims,
        data,
        units: var.units.clone(),
    })
}
