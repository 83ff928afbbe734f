use thiserror::Error;

/// Errors raised while turning a raw dataset into an analysis frame or
/// aggregating one.
///
/// None of these are recovered from inside the crate: a bad time axis or a
/// missing variable invalidates everything downstream.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported sampling cadence: step of {0} s between the first two time values")]
    UnsupportedSamplingCadence(i64),

    #[error("time coordinate has {0} value(s), need at least 2 to infer a cadence")]
    InsufficientTimeSteps(usize),

    #[error("dataset has no time coordinate")]
    MissingTimeCoordinate,

    #[error("time coordinate has no units attribute")]
    MissingTimeUnits,

    #[error("malformed time units '{0}': expected '<units> since <reference date>'")]
    MalformedTimeUnits(String),

    #[error("invalid reference date '{token}'")]
    InvalidReferenceDate {
        token: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("variable '{0}' not found in dataset")]
    MissingVariable(String),

    #[error("cannot squeeze dimension '{dim}' of '{variable}': length {len}")]
    NonSingletonDimension {
        variable: String,
        dim: String,
        len: usize,
    },

    #[error("variable '{variable}' has {found} time steps, expected {expected}")]
    ShapeMismatch {
        variable: String,
        expected: usize,
        found: usize,
    },

    #[error("variable '{variable}' has dimensions {dims:?} after squeezing; expected (time) or (time, pool)")]
    UnsupportedRank { variable: String, dims: Vec<String> },

    #[error("pool {pool} out of range for '{variable}' ({pools} pools)")]
    PoolOutOfRange {
        variable: String,
        pool: usize,
        pools: usize,
    },

    #[error("unit conversion already applied to '{0}'")]
    ConversionAlreadyApplied(String),

    #[error("no data for month {month} in '{series}'; cannot build a 12-month climatology")]
    IncompleteClimatology { series: String, month: u32 },

    #[error("'{0}' has no values")]
    EmptySeries(String),
}

pub type Result<T> = std::result::Result<T, Error>;
