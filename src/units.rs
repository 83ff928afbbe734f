//! Unit conversion factors.
//!
//! Conversions are declared by the caller per variable; nothing here is
//! inferred from the `units` attribute of the source file.

use serde::{Deserialize, Serialize};

pub const UMOL_TO_MOL: f64 = 1e-6;
pub const MOL_C_TO_GRAMS_C: f64 = 12.0;
pub const SEC_PER_DAY: f64 = 86400.0;
pub const DAYS_PER_YEAR: f64 = 365.0;

/// A multiplier taking a raw variable to its target units.
///
/// With `per_step` set, the factor is additionally multiplied by the raw
/// step length in seconds, turning a per-second rate into an amount per
/// time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub factor: f64,
    #[serde(default)]
    pub per_step: bool,
    pub target_units: String,
}

impl UnitConversion {
    pub fn new(factor: f64, target_units: impl Into<String>) -> Self {
        Self {
            factor,
            per_step: false,
            target_units: target_units.into(),
        }
    }

    pub fn per_step(factor: f64, target_units: impl Into<String>) -> Self {
        Self {
            factor,
            per_step: true,
            target_units: target_units.into(),
        }
    }

    /// The effective multiplier for a series sampled every `step_seconds`.
    pub fn multiplier(&self, step_seconds: f64) -> f64 {
        if self.per_step {
            self.factor * step_seconds
        } else {
            self.factor
        }
    }

    /// umol C m-2 s-1 -> g C m-2 d-1
    pub fn carbon_flux_per_day() -> Self {
        Self::new(UMOL_TO_MOL * MOL_C_TO_GRAMS_C * SEC_PER_DAY, "g C m-2 d-1")
    }

    /// umol C m-2 s-1 -> g C m-2 per raw time step
    pub fn carbon_flux_per_step() -> Self {
        Self::per_step(UMOL_TO_MOL * MOL_C_TO_GRAMS_C, "g C m-2 step-1")
    }

    /// kg m-2 s-1 -> mm d-1
    pub fn water_flux_per_day() -> Self {
        Self::new(SEC_PER_DAY, "mm d-1")
    }

    /// kg m-2 s-1 -> mm per raw time step
    pub fn water_flux_per_step() -> Self {
        Self::per_step(1.0, "mm step-1")
    }

    /// x d-1 -> x y-1, for daily deposition rates
    pub fn per_day_to_per_year(target_units: impl Into<String>) -> Self {
        Self::new(DAYS_PER_YEAR, target_units)
    }
}
