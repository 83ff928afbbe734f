//! Calendar time axes rebuilt from raw offset coordinates.
//!
//! Model output stores time as numeric offsets against a text encoding such
//! as `"seconds since 2002-01-01 00:00:00"`. Only three regular cadences are
//! ever emitted, so the cadence is a closed enum rather than something
//! inferred from arbitrary offsets.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;

use crate::error::{Error, Result};

/// Sampling cadence of a raw time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingFrequency {
    Hourly,
    HalfHourly,
    Daily,
}

impl SamplingFrequency {
    /// Map the step between two raw time values onto a cadence.
    ///
    /// Exact equality only: 3600, 1800 or 86400 seconds.
    pub fn from_step(step: i64) -> Result<Self> {
        match step {
            3600 => Ok(Self::Hourly),
            1800 => Ok(Self::HalfHourly),
            86400 => Ok(Self::Daily),
            other => Err(Error::UnsupportedSamplingCadence(other)),
        }
    }

    /// Infer the cadence from the first two raw offsets.
    ///
    /// Offsets are truncated to integers before differencing. Later samples
    /// are not checked.
    pub fn infer(offsets: &[f64]) -> Result<Self> {
        match offsets {
            [first, second, ..] => {
                let step = (*second as i64) - (*first as i64);
                let frequency = Self::from_step(step)?;
                debug!("inferred {frequency} cadence from step of {step} s");
                Ok(frequency)
            }
            _ => Err(Error::InsufficientTimeSteps(offsets.len())),
        }
    }

    pub fn step_seconds(self) -> i64 {
        match self {
            Self::Hourly => 3600,
            Self::HalfHourly => 1800,
            Self::Daily => 86400,
        }
    }

    pub fn step(self) -> Duration {
        Duration::seconds(self.step_seconds())
    }
}

impl fmt::Display for SamplingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hourly => write!(f, "hourly"),
            Self::HalfHourly => write!(f, "30-minute"),
            Self::Daily => write!(f, "daily"),
        }
    }
}

/// A parsed `"<units> since <reference date>"` encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEncoding {
    /// Left of `since`, trimmed. Kept for diagnostics only.
    pub unit_phrase: String,
    /// The date token with `-` replaced by `/`, e.g. `2002/01/01`.
    pub start_token: String,
    pub start: NaiveDate,
}

impl ReferenceEncoding {
    /// Parse a time `units` attribute.
    ///
    /// Anything after the first whitespace-delimited token on the right of
    /// `since` (usually a time of day) is ignored, so the axis always starts
    /// at midnight.
    pub fn parse(encoding: &str) -> Result<Self> {
        let (units, reference) = encoding
            .split_once("since")
            .ok_or_else(|| Error::MalformedTimeUnits(encoding.to_string()))?;

        let date_token = reference
            .split_whitespace()
            .next()
            .ok_or_else(|| Error::MalformedTimeUnits(encoding.to_string()))?;
        let start_token = date_token.replace('-', "/");

        let start = NaiveDate::parse_from_str(&start_token, "%Y/%m/%d").map_err(|source| {
            Error::InvalidReferenceDate {
                token: start_token.clone(),
                source,
            }
        })?;

        Ok(Self {
            unit_phrase: units.trim().to_string(),
            start_token,
            start,
        })
    }
}

/// A regular calendar time axis: `start + i * step` for `i in 0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeAxis {
    pub start: NaiveDateTime,
    pub frequency: SamplingFrequency,
    pub len: usize,
}

impl TimeAxis {
    pub fn new(start: NaiveDate, frequency: SamplingFrequency, len: usize) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN),
            frequency,
            len,
        }
    }

    pub fn get(&self, index: usize) -> NaiveDateTime {
        self.start + Duration::seconds(index as i64 * self.frequency.step_seconds())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Materialize the whole axis.
    pub fn dates(&self) -> Vec<NaiveDateTime> {
        (0..self.len).map(|i| self.get(i)).collect()
    }
}
