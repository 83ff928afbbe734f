/// Data layer: raw dataset model, file loading, and variable selection.
///
/// Architecture:
/// ```text
///  layout stem ──► .nc / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ RawDataset  │  time coordinate, named n-d variables
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  select   │  keep requested variables, squeeze spatial dims
///   └──────────┘
/// ```

pub mod layout;
pub mod loader;
pub mod model;
pub mod select;
