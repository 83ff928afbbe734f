use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

use crate::aggregate::Table;

// ---------------------------------------------------------------------------
// Export configuration – passed per call, no shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Where and how one table is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    pub dir: PathBuf,
    pub format: ExportFormat,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("plots"),
            format: ExportFormat::Csv,
        }
    }
}

impl ExportConfig {
    pub fn new(dir: impl Into<PathBuf>, format: ExportFormat) -> Self {
        Self {
            dir: dir.into(),
            format,
        }
    }

    pub fn path_for(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{}", self.format.extension()))
    }
}

// ---------------------------------------------------------------------------
// Writers
// ---------------------------------------------------------------------------

/// Write `table` to `<dir>/<stem>.<ext>`, creating `dir` if needed.
/// Returns the written path.
pub fn write_table(table: &Table, stem: &str, config: &ExportConfig) -> Result<PathBuf> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("creating output directory {}", config.dir.display()))?;

    let path = config.path_for(stem);
    match config.format {
        ExportFormat::Csv => write_csv(table, &path),
        ExportFormat::Parquet => write_parquet(table, &path),
    }
    .with_context(|| format!("writing {}", path.display()))?;

    info!("wrote {} rows to {}", table.len(), path.display());
    Ok(path)
}

/// Header: label column then one column per series. NaN is written empty.
fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("opening CSV")?;

    let mut header = vec![table.label().to_string()];
    header.extend(table.columns().iter().map(|(name, _)| name.clone()));
    writer.write_record(&header).context("writing CSV header")?;

    for (row, label) in table.rows().iter().enumerate() {
        let mut record = vec![label.to_string()];
        record.extend(table.columns().iter().map(|(_, values)| {
            let v = values[row];
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer
            .write_record(&record)
            .with_context(|| format!("writing CSV row {row}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

/// Label column as text, series as nullable Float64 (NaN → null).
fn write_parquet(table: &Table, path: &Path) -> Result<()> {
    let mut fields = vec![Field::new(table.label(), DataType::Utf8, false)];
    let mut arrays: Vec<ArrayRef> = vec![Arc::new(StringArray::from(
        table.rows().iter().map(|l| l.to_string()).collect::<Vec<_>>(),
    ))];
    for (name, values) in table.columns() {
        fields.push(Field::new(name, DataType::Float64, true));
        arrays.push(Arc::new(Float64Array::from(
            values
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

    use super::*;
    use crate::aggregate::Label;

    fn table() -> Table {
        let mut table = Table::new("month", vec![Label::Month(1), Label::Month(2)]);
        table.push("GPP".to_string(), vec![1.5, f64::NAN]).unwrap();
        table.push("Qle".to_string(), vec![40.0, 55.25]).unwrap();
        table
    }

    #[test]
    fn test_csv_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::new(dir.path().join("plots"), ExportFormat::Csv);
        let path = write_table(&table(), "AU-Tum_seasonal", &config).unwrap();

        assert_eq!(path, dir.path().join("plots").join("AU-Tum_seasonal.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["month,GPP,Qle", "1,1.5,40", "2,,55.25"]);
    }

    #[test]
    fn test_parquet_nulls_nan() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExportConfig::new(dir.path(), ExportFormat::Parquet);
        let path = write_table(&table(), "seasonal", &config).unwrap();

        let file = std::fs::File::open(path).unwrap();
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.schema().field(0).name(), "month");
        let gpp = batch
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(gpp.value(0), 1.5);
        assert!(gpp.is_null(1));
    }
}
