//! Raw dataset → [`AnalysisFrame`].
//!
//! ```text
//!  RawDataset ──► cadence (first two offsets) ──► reference date ("... since <date>")
//!      │                                                │
//!      └──► select + squeeze ──► columns ──► TimeAxis index ──► unit conversion
//! ```

use chrono::NaiveDate;
use log::{debug, info};

use crate::data::model::RawDataset;
use crate::data::select::select;
use crate::error::{Error, Result};
use crate::frame::{AnalysisFrame, Column};
use crate::profile::VariableProfile;
use crate::time::{ReferenceEncoding, SamplingFrequency, TimeAxis};

/// Where the calendar axis comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisSource {
    /// Infer the cadence from the raw time offsets and take the start date
    /// from `encoding`, or from the time coordinate's `units` when `None`.
    Encoded { encoding: Option<String> },
    /// Ignore the raw time coordinate: `start` at midnight, fixed cadence,
    /// one entry per time step of the selected variables.
    Explicit {
        start: NaiveDate,
        frequency: SamplingFrequency,
    },
}

/// Builds analysis frames for one [`VariableProfile`].
#[derive(Debug, Clone)]
pub struct TimeSeriesLoader {
    profile: VariableProfile,
    axis: AxisSource,
}

impl TimeSeriesLoader {
    pub fn new(profile: VariableProfile) -> Self {
        TimeSeriesLoader {
            profile,
            axis: AxisSource::Encoded { encoding: None },
        }
    }

    /// Use `encoding` instead of the time coordinate's `units` attribute.
    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.axis = AxisSource::Encoded {
            encoding: Some(encoding.to_string()),
        };
        self
    }

    pub fn with_explicit_start(mut self, start: NaiveDate, frequency: SamplingFrequency) -> Self {
        self.axis = AxisSource::Explicit { start, frequency };
        self
    }

    pub fn profile(&self) -> &VariableProfile {
        &self.profile
    }

    /// Build the frame. Fails without a partial result on an unsupported
    /// cadence, a malformed encoding, or a missing/misshapen variable.
    pub fn load(&self, dataset: &RawDataset) -> Result<AnalysisFrame> {
        let resolved = self.resolve_axis(dataset)?;

        let names = self.profile.variable_names();
        let variables = select(dataset, &names, &self.profile.spatial_dims())?;

        // Explicit axes take their length from the data.
        let len = resolved.len.unwrap_or_else(|| {
            variables
                .first()
                .and_then(|v| v.shape().first().copied())
                .unwrap_or(0)
        });
        let axis = TimeAxis::new(resolved.start, resolved.frequency, len);
        let step_seconds = axis.frequency.step_seconds() as f64;

        let mut frame = AnalysisFrame::new(axis.dates());
        for var in &variables {
            if var.data.ndim() == 0 || var.data.ndim() > 2 {
                return Err(Error::UnsupportedRank {
                    variable: var.name.clone(),
                    dims: var.dims.clone(),
                });
            }
            let found = var.shape()[0];
            if found != len {
                return Err(Error::ShapeMismatch {
                    variable: var.name.clone(),
                    expected: len,
                    found,
                });
            }

            let mut column = Column::from_variable(var)?;
            if let Some(conversion) = self
                .profile
                .spec(&var.name)
                .and_then(|spec| spec.conversion.as_ref())
            {
                column.apply_conversion(conversion, step_seconds)?;
                debug!(
                    "converted '{}' to {} (x{})",
                    var.name,
                    conversion.target_units,
                    conversion.multiplier(step_seconds)
                );
            }
            frame.push_column(column)?;
        }

        info!(
            "built {} frame: {} {} steps from {} ({} columns)",
            self.profile.name,
            len,
            axis.frequency,
            axis.start,
            frame.columns().len()
        );
        Ok(frame)
    }

    fn resolve_axis(&self, dataset: &RawDataset) -> Result<ResolvedAxis> {
        match &self.axis {
            AxisSource::Explicit { start, frequency } => Ok(ResolvedAxis {
                start: *start,
                frequency: *frequency,
                len: None,
            }),
            AxisSource::Encoded { encoding } => {
                let time = dataset.time.as_ref().ok_or(Error::MissingTimeCoordinate)?;
                let frequency = SamplingFrequency::infer(&time.values)?;
                let encoding = match encoding {
                    Some(e) => e.as_str(),
                    None => time.units.as_deref().ok_or(Error::MissingTimeUnits)?,
                };
                let reference = ReferenceEncoding::parse(encoding)?;
                debug!(
                    "time axis starts {} (from '{}')",
                    reference.start_token, encoding
                );
                Ok(ResolvedAxis {
                    start: reference.start,
                    frequency,
                    len: Some(time.len()),
                })
            }
        }
    }
}

struct ResolvedAxis {
    start: NaiveDate,
    frequency: SamplingFrequency,
    len: Option<usize>,
}

/// Load `dataset` with `profile`, taking the start date from
/// `reference_encoding` (`"<units> since <date>"`).
pub fn load(
    dataset: &RawDataset,
    profile: &VariableProfile,
    reference_encoding: &str,
) -> Result<AnalysisFrame> {
    TimeSeriesLoader::new(profile.clone())
        .with_encoding(reference_encoding)
        .load(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Variable;
    use crate::profile::VariableSpec;
    use crate::units::UnitConversion;

    fn gridded(name: &str, values: Vec<f64>) -> Variable {
        let n = values.len();
        Variable::from_shape_vec(name, &["time", "y", "x"], &[n, 1, 1], values).unwrap()
    }

    fn dataset(step: f64, n: usize) -> RawDataset {
        RawDataset::new()
            .with_time(
                (0..n).map(|i| i as f64 * step).collect(),
                "seconds since 2002-01-01 00:00:00",
            )
            .with_variable(gridded("GPP", vec![10.0; n]))
            .with_variable(gridded("Qle", (0..n).map(|i| i as f64).collect()))
    }

    fn profile() -> VariableProfile {
        VariableProfile::new(
            "test",
            vec![
                VariableSpec::new("GPP").convert(UnitConversion::carbon_flux_per_day()),
                VariableSpec::new("Qle"),
            ],
        )
    }

    #[test]
    fn test_load_hourly() {
        let frame = TimeSeriesLoader::new(profile()).load(&dataset(3600.0, 30)).unwrap();
        assert_eq!(frame.len(), 30);
        assert_eq!(frame.column_names(), vec!["GPP", "Qle"]);
        assert_eq!(
            frame.index()[25],
            NaiveDate::from_ymd_opt(2002, 1, 2).unwrap().and_hms_opt(1, 0, 0).unwrap()
        );
        let gpp = frame.column("GPP").unwrap();
        assert!((gpp.series().unwrap()[0] - 10.368).abs() < 1e-9);
        assert_eq!(gpp.units(), Some("g C m-2 d-1"));
        assert_eq!(frame.column("Qle").unwrap().series().unwrap()[7], 7.0);
    }

    #[test]
    fn test_load_half_hourly_index_is_uniform() {
        let frame = TimeSeriesLoader::new(profile()).load(&dataset(1800.0, 96)).unwrap();
        assert_eq!(frame.len(), 96);
        assert!(frame
            .index()
            .windows(2)
            .all(|w| w[1] - w[0] == chrono::Duration::minutes(30)));
        assert_eq!(
            frame.index()[95],
            NaiveDate::from_ymd_opt(2002, 1, 2).unwrap().and_hms_opt(23, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_load_rejects_irregular_step() {
        let err = TimeSeriesLoader::new(profile()).load(&dataset(600.0, 10)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSamplingCadence(600)));
    }

    #[test]
    fn test_explicit_encoding_overrides_units() {
        let frame = load(&dataset(86400.0, 3), &profile(), "days since 1999-06-30 12:00").unwrap();
        assert_eq!(
            frame.index()[2],
            NaiveDate::from_ymd_opt(1999, 7, 2).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_units() {
        let mut ds = dataset(3600.0, 4);
        ds.time.as_mut().unwrap().units = None;
        assert!(matches!(
            TimeSeriesLoader::new(profile()).load(&ds),
            Err(Error::MissingTimeUnits)
        ));
    }

    #[test]
    fn test_explicit_start_ignores_time_coordinate() {
        let ds = RawDataset::new().with_variable(
            Variable::from_shape_vec("Nsnet", &["time", "land"], &[3, 1], vec![1.0, 2.0, 3.0]).unwrap(),
        );
        let profile = VariableProfile::new("casa", vec![VariableSpec::new("Nsnet")]).with_spatial_dims(&["land"]);
        let frame = TimeSeriesLoader::new(profile)
            .with_explicit_start(NaiveDate::from_ymd_opt(2002, 1, 1).unwrap(), SamplingFrequency::Daily)
            .load(&ds)
            .unwrap();
        assert_eq!(frame.len(), 3);
        assert_eq!(
            frame.index()[2],
            NaiveDate::from_ymd_opt(2002, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_variable_length_mismatch() {
        let ds = dataset(3600.0, 4).with_variable(gridded("Qle", vec![1.0; 3]));
        assert!(matches!(
            TimeSeriesLoader::new(profile()).load(&ds),
            Err(Error::ShapeMismatch { expected: 4, found: 3, .. })
        ));
    }
}
