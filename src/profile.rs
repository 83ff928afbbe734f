//! Variable profiles: which variables a pipeline keeps, how each is
//! converted, and how each is reduced when aggregated.
//!
//! Profiles are plain data. The built-in constructors cover the CABLE,
//! flux-tower and met files analysed by the binaries; anything else can be
//! described in JSON and loaded with [`VariableProfile::from_json_file`].

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::aggregate::{Reducer, Reducers};
use crate::data::select::DEFAULT_SPATIAL_DIMS;
use crate::units::UnitConversion;

/// One retained variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub conversion: Option<UnitConversion>,
    /// `None` drops the variable from resampled output.
    #[serde(default)]
    pub reducer: Option<Reducer>,
}

impl VariableSpec {
    pub fn new(name: &str) -> Self {
        VariableSpec {
            name: name.to_string(),
            conversion: None,
            reducer: None,
        }
    }

    pub fn convert(mut self, conversion: UnitConversion) -> Self {
        self.conversion = Some(conversion);
        self
    }

    pub fn mean(mut self) -> Self {
        self.reducer = Some(Reducer::Mean);
        self
    }

    pub fn sum(mut self) -> Self {
        self.reducer = Some(Reducer::Sum);
        self
    }
}

fn default_spatial_dims() -> Vec<String> {
    DEFAULT_SPATIAL_DIMS.iter().map(|d| d.to_string()).collect()
}

/// A named variable set with per-variable conversions and reducers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableProfile {
    pub name: String,
    /// Singleton dimensions squeezed away before building the frame.
    #[serde(default = "default_spatial_dims")]
    pub spatial_dims: Vec<String>,
    pub variables: Vec<VariableSpec>,
}

impl VariableProfile {
    pub fn new(name: &str, variables: Vec<VariableSpec>) -> Self {
        VariableProfile {
            name: name.to_string(),
            spatial_dims: default_spatial_dims(),
            variables,
        }
    }

    pub fn with_spatial_dims(mut self, dims: &[&str]) -> Self {
        self.spatial_dims = dims.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing profile {}", path.display()))
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.iter().map(|v| v.name.as_str()).collect()
    }

    pub fn spatial_dims(&self) -> Vec<&str> {
        self.spatial_dims.iter().map(|d| d.as_str()).collect()
    }

    pub fn spec(&self, name: &str) -> Option<&VariableSpec> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// The per-variable reducer mapping, for variables that have one.
    pub fn reducers(&self) -> Reducers {
        self.variables
            .iter()
            .filter_map(|v| v.reducer.map(|r| (v.name.clone(), r)))
            .collect()
    }

    // -- Built-in profiles --

    /// CABLE biophysics for seasonal cycles: rates converted to daily
    /// amounts, every variable averaged.
    pub fn cable_seasonal() -> Self {
        Self::new(
            "cable-seasonal",
            vec![
                VariableSpec::new("GPP")
                    .convert(UnitConversion::carbon_flux_per_day())
                    .mean(),
                VariableSpec::new("NEE")
                    .convert(UnitConversion::carbon_flux_per_day())
                    .mean(),
                VariableSpec::new("Qle").mean(),
                VariableSpec::new("LAI").mean(),
                VariableSpec::new("TVeg")
                    .convert(UnitConversion::water_flux_per_day())
                    .mean(),
                VariableSpec::new("ESoil")
                    .convert(UnitConversion::water_flux_per_day())
                    .mean(),
            ],
        )
    }

    /// CABLE biophysics for daily time series: fluxes converted to amounts
    /// per raw step, then summed per day.
    pub fn cable_timeseries() -> Self {
        Self::new(
            "cable-timeseries",
            vec![
                VariableSpec::new("GPP")
                    .convert(UnitConversion::carbon_flux_per_step())
                    .sum(),
                VariableSpec::new("Qle").mean(),
                VariableSpec::new("LAI"),
                VariableSpec::new("TVeg")
                    .convert(UnitConversion::water_flux_per_step())
                    .sum(),
                VariableSpec::new("ESoil").convert(UnitConversion::water_flux_per_step()),
                VariableSpec::new("NEE"),
            ],
        )
    }

    /// Flux-tower observations.
    pub fn flux_timeseries() -> Self {
        Self::new(
            "flux-timeseries",
            vec![
                VariableSpec::new("GPP")
                    .convert(UnitConversion::carbon_flux_per_step())
                    .sum(),
                VariableSpec::new("Qle").mean(),
            ],
        )
    }

    /// Meteorological forcing: rainfall per step, summed per day.
    pub fn met_timeseries() -> Self {
        Self::new(
            "met-timeseries",
            vec![VariableSpec::new("Rainf")
                .convert(UnitConversion::water_flux_per_step())
                .sum()],
        )
    }

    /// Daily CASA output for annual budgets: pools averaged, N fluxes
    /// summed, immobilisation averaged.
    pub fn casa_annual() -> Self {
        let pool = |name: &str| VariableSpec::new(name).mean();
        let flux = |name: &str| VariableSpec::new(name).sum();
        Self::new(
            "casa-annual",
            vec![
                pool("cplant"),
                pool("nplant"),
                pool("csoil"),
                pool("nsoil"),
                flux("Nsnet"),
                flux("Nmindep"),
                flux("Nminfix"),
                flux("Nminleach"),
                flux("Nupland"),
                flux("Nminloss"),
                VariableSpec::new("Nsimm").mean(),
            ],
        )
        .with_spatial_dims(&["land"])
    }
}
