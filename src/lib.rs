//! Post-processing of CABLE / CASA land-surface model output.
//!
//! Raw model files are loaded into a [`RawDataset`], turned into a
//! calendar-indexed [`AnalysisFrame`] by a [`TimeSeriesLoader`], then
//! aggregated (annual, monthly climatology, daily) into [`Table`]s that are
//! printed or written out by [`export`].

pub mod aggregate;
pub mod data;
pub mod error;
pub mod export;
pub mod frame;
pub mod pipeline;
pub mod profile;
pub mod spinup;
pub mod summary;
pub mod time;
pub mod units;

pub use aggregate::{Label, Period, Reducer, Reducers, Table};
pub use data::model::{RawDataset, TimeCoordinate, Variable};
pub use error::{Error, Result};
pub use export::{write_table, ExportConfig, ExportFormat};
pub use frame::{AnalysisFrame, Column};
pub use pipeline::{load, AxisSource, TimeSeriesLoader};
pub use profile::{VariableProfile, VariableSpec};
pub use spinup::{SpinupPoint, SpinupTrajectory};
pub use summary::{AnnualSummary, PoolSummary};
pub use time::{ReferenceEncoding, SamplingFrequency, TimeAxis};
pub use units::UnitConversion;
