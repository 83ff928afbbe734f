use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, LargeListArray, ListArray, ListBuilder,
};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::{debug, info};
use ndarray::{ArrayD, Axis, IxDyn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use super::model::{RawDataset, TimeCoordinate, Variable};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a model output file.  Dispatch by extension.
///
/// Supported formats:
/// * `.nc`      – netCDF (requires the `netcdf` feature)
/// * `.json`    – `{ "time": {...}, "variables": {...} }` dump
/// * `.parquet` – one row per time step, `time` column plus variables
pub fn load_file(path: &Path) -> Result<RawDataset> {
    let ext = extension(path);
    let dataset = match ext.as_str() {
        "nc" | "nc4" => load_netcdf(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    info!(
        "loaded {} ({} variables, {} time steps)",
        path.display(),
        dataset.variables.len(),
        dataset.time_len().unwrap_or(0)
    );
    Ok(dataset)
}

/// Write a dataset in the format implied by the extension (`.json` or
/// `.parquet`).
pub fn save_file(dataset: &RawDataset, path: &Path) -> Result<()> {
    match extension(path).as_str() {
        "json" => save_json(dataset, path),
        "parquet" | "pq" => save_parquet(dataset, path),
        other => bail!("Cannot write datasets as .{other}"),
    }
    .with_context(|| format!("writing {}", path.display()))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

// ---------------------------------------------------------------------------
// netCDF loader
// ---------------------------------------------------------------------------

/// Read every numeric variable as `f64` with its dimension names. The
/// `time` variable and its `units` attribute become the time coordinate.
#[cfg(feature = "netcdf")]
fn load_netcdf(path: &Path) -> Result<RawDataset> {
    let file = netcdf::open(path).context("opening netCDF file")?;
    let mut dataset = RawDataset::new();

    if let Some(time) = file.variable("time") {
        let values = time
            .get_values::<f64, _>(..)
            .context("reading time coordinate")?;
        let units = match time.attribute_value("units") {
            Some(Ok(netcdf::AttributeValue::Str(s))) => Some(s),
            _ => None,
        };
        dataset.time = Some(TimeCoordinate::new(values, units));
    }

    for var in file.variables() {
        let name = var.name();
        if name == "time" {
            continue;
        }
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

        let values = match var.get_values::<f64, _>(..) {
            Ok(values) => values,
            Err(e) => {
                debug!("skipping non-numeric variable '{name}': {e}");
                continue;
            }
        };
        let packing = Packing {
            fill_values: ["_FillValue", "missing_value"]
                .iter()
                .filter_map(|attr| numeric_attribute(&var, attr))
                .collect(),
            scale_factor: numeric_attribute(&var, "scale_factor"),
            add_offset: numeric_attribute(&var, "add_offset"),
        };
        let values: Vec<f64> = values.into_iter().map(|v| packing.decode(v)).collect();

        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)
            .with_context(|| format!("variable '{name}' has an inconsistent shape"))?;
        let units = match var.attribute_value("units") {
            Some(Ok(netcdf::AttributeValue::Str(s))) => Some(s),
            _ => None,
        };

        dataset.insert(Variable {
            name,
            dims,
            data,
            units,
        });
    }

    Ok(dataset)
}

/// First value of a numeric attribute as `f64`.
#[cfg(feature = "netcdf")]
fn numeric_attribute(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    use netcdf::AttributeValue as V;
    match var.attribute_value(name)?.ok()? {
        V::Double(v) => Some(v),
        V::Float(v) => Some(f64::from(v)),
        V::Longlong(v) => Some(v as f64),
        V::Ulonglong(v) => Some(v as f64),
        V::Int(v) => Some(f64::from(v)),
        V::Uint(v) => Some(f64::from(v)),
        V::Short(v) => Some(f64::from(v)),
        V::Ushort(v) => Some(f64::from(v)),
        V::Schar(v) => Some(f64::from(v)),
        V::Uchar(v) => Some(f64::from(v)),
        V::Doubles(v) => v.first().copied(),
        V::Floats(v) => v.first().map(|&x| f64::from(x)),
        _ => None,
    }
}

#[cfg(not(feature = "netcdf"))]
fn load_netcdf(_path: &Path) -> Result<RawDataset> {
    bail!("netCDF support not compiled in; rebuild with `--features netcdf`")
}

/// netCDF default fill for `double` (and `float`, widened), assumed when a
/// variable declares no fill value of its own.
pub const DEFAULT_FILL_F64: f64 = 9.969_209_968_386_869e36;

/// CF masking and packing attributes of one stored variable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packing {
    /// `_FillValue` and `missing_value`.
    pub fill_values: Vec<f64>,
    pub scale_factor: Option<f64>,
    pub add_offset: Option<f64>,
}

impl Packing {
    /// Stored value → physical value. Fill values become NaN; everything
    /// else is `raw * scale_factor + add_offset`.
    pub fn decode(&self, raw: f64) -> f64 {
        let missing = if self.fill_values.is_empty() {
            raw == DEFAULT_FILL_F64
        } else {
            self.fill_values.contains(&raw)
        };
        if missing {
            return f64::NAN;
        }
        raw * self.scale_factor.unwrap_or(1.0) + self.add_offset.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// JSON loader / writer
// ---------------------------------------------------------------------------

/// On-disk JSON layout. `data` is row-major; `null` stands for a missing
/// (NaN) value.
///
/// ```json
/// {
///   "time": { "units": "seconds since 2002-01-01 00:00:00", "values": [0, 3600] },
///   "variables": {
///     "GPP": { "dims": ["time", "y", "x"], "shape": [2, 1, 1], "data": [1.5, 2.0] }
///   }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
struct DatasetRecord {
    #[serde(default)]
    time: Option<TimeRecord>,
    #[serde(default)]
    variables: BTreeMap<String, VariableRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimeRecord {
    #[serde(default)]
    units: Option<String>,
    values: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct VariableRecord {
    dims: Vec<String>,
    shape: Vec<usize>,
    data: Vec<Option<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    units: Option<String>,
}

fn load_json(path: &Path) -> Result<RawDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let record: DatasetRecord = serde_json::from_str(&text).context("parsing JSON")?;

    let mut dataset = RawDataset::new();
    dataset.time = record
        .time
        .map(|t| TimeCoordinate::new(t.values, t.units));

    for (name, var) in record.variables {
        if var.dims.len() != var.shape.len() {
            bail!(
                "Variable '{name}': {} dims but {} shape entries",
                var.dims.len(),
                var.shape.len()
            );
        }
        let values: Vec<f64> = var.data.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&var.shape), values)
            .with_context(|| format!("Variable '{name}': data does not match shape"))?;
        dataset.insert(Variable {
            name,
            dims: var.dims,
            data,
            units: var.units,
        });
    }

    Ok(dataset)
}

fn save_json(dataset: &RawDataset, path: &Path) -> Result<()> {
    let record = DatasetRecord {
        time: dataset.time.as_ref().map(|t| TimeRecord {
            units: t.units.clone(),
            values: t.values.clone(),
        }),
        variables: dataset
            .variables
            .iter()
            .map(|(name, var)| {
                let record = VariableRecord {
                    dims: var.dims.clone(),
                    shape: var.shape().to_vec(),
                    data: var
                        .data
                        .iter()
                        .map(|&v| if v.is_nan() { None } else { Some(v) })
                        .collect(),
                    units: var.units.clone(),
                };
                (name.clone(), record)
            })
            .collect(),
    };
    let file = std::fs::File::create(path).context("creating JSON file")?;
    serde_json::to_writer(std::io::BufWriter::new(file), &record).context("serializing JSON")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet loader / writer
// ---------------------------------------------------------------------------

/// Load a Parquet file holding one row per time step.
///
/// Expected schema:
/// - `time`: any integer or float column; field metadata `units` carries
///   the `"<units> since <date>"` encoding
/// - Float / Int columns → variables with dims `(time)`
/// - List<Float> / LargeList<Float> columns → variables with dims
///   `(time, pool)`; every row must have the same length
/// - Anything else is skipped
fn load_parquet(path: &Path) -> Result<RawDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let time_idx = schema
        .index_of("time")
        .map_err(|_| anyhow!("Parquet file missing 'time' column"))?;
    let time_units = schema.field(time_idx).metadata().get("units").cloned();

    // column index → (name, flat values, pool width)
    let mut columns: Vec<(usize, String, Vec<f64>, Option<usize>)> = Vec::new();
    for (i, field) in schema.fields().iter().enumerate() {
        if i == time_idx {
            continue;
        }
        match field.data_type() {
            DataType::List(_) | DataType::LargeList(_) => {
                columns.push((i, field.name().clone(), Vec::new(), Some(0)))
            }
            dt if dt.is_numeric() => columns.push((i, field.name().clone(), Vec::new(), None)),
            other => debug!("skipping column '{}' of type {other:?}", field.name()),
        }
    }

    let mut time = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        time.extend(numeric_column(batch.column(time_idx)).context("reading 'time'")?);

        for (col_idx, name, values, width) in columns.iter_mut() {
            let col = batch.column(*col_idx);
            match width {
                None => values.extend(
                    numeric_column(col).with_context(|| format!("reading '{name}'"))?,
                ),
                Some(width) => {
                    for row in 0..batch.num_rows() {
                        let pools = extract_f64_list(col, row)
                            .with_context(|| format!("Row {row}: failed to read '{name}'"))?;
                        if *width == 0 {
                            *width = pools.len();
                        } else if pools.len() != *width {
                            bail!(
                                "Row {row}: '{name}' has {} pools, expected {width}",
                                pools.len()
                            );
                        }
                        values.extend(pools);
                    }
                }
            }
        }
    }

    let n = time.len();
    let mut dataset = RawDataset::new();
    dataset.time = Some(TimeCoordinate::new(time, time_units));

    for (_, name, values, width) in columns {
        let var = match width {
            None => Variable::from_shape_vec(&name, &["time"], &[n], values),
            Some(width) => Variable::from_shape_vec(&name, &["time", "pool"], &[n, width], values),
        }
        .with_context(|| format!("Column '{name}' does not line up with 'time'"))?;
        dataset.insert(var);
    }

    Ok(dataset)
}

/// Cast any numeric column to `f64`; nulls become NaN.
fn numeric_column(col: &ArrayRef) -> Result<Vec<f64>> {
    let cast_col = cast(col, &DataType::Float64).context("casting to Float64")?;
    let arr = cast_col
        .as_any()
        .downcast_ref::<Float64Array>()
        .context("expected Float64Array after cast")?;
    Ok(arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    numeric_column(&values_array)
}

/// Write a dataset as Parquet. Only `(time)` and `(time, pool)` variables
/// fit the row-per-step layout; squeeze spatial dims first.
fn save_parquet(dataset: &RawDataset, path: &Path) -> Result<()> {
    let time = dataset
        .time
        .as_ref()
        .context("dataset has no time coordinate")?;

    let mut time_field = Field::new("time", DataType::Float64, false);
    if let Some(units) = &time.units {
        time_field = time_field.with_metadata([("units".to_string(), units.clone())].into());
    }
    let mut fields = vec![time_field];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(time.values.clone()))];

    for (name, var) in &dataset.variables {
        match var.data.ndim() {
            1 => {
                fields.push(Field::new(name, DataType::Float64, true));
                arrays.push(Arc::new(Float64Array::from(
                    var.data.iter().copied().collect::<Vec<f64>>(),
                )));
            }
            2 => {
                let mut builder = ListBuilder::new(Float64Builder::new());
                for row in var.data.axis_iter(Axis(0)) {
                    let values = builder.values();
                    for &v in row.iter() {
                        values.append_value(v);
                    }
                    builder.append(true);
                }
                fields.push(Field::new(
                    name,
                    DataType::List(Arc::new(Field::new("item", DataType::Float64, true))),
                    true,
                ));
                arrays.push(Arc::new(builder.finish()));
            }
            _ => bail!(
                "Variable '{name}' has dims {:?}; only (time) or (time, pool) can be written",
                var.dims
            ),
        }
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
