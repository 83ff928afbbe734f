//! Temporal aggregation of analysis frames.
//!
//! Two granularities feed the analyses: calendar years and a 12-month
//! climatology. Daily resampling and trailing rolling means are used by the
//! flux comparison. Every reduction skips NaN, so gaps in observations do
//! not poison a whole bucket.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use log::debug;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::AnalysisFrame;

// ---------------------------------------------------------------------------
// Reducers
// ---------------------------------------------------------------------------

/// How the values of one bucket collapse to a single number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Mean,
    Sum,
}

/// Per-variable reducer mapping. Variables missing from it are dropped from
/// resampled output.
pub type Reducers = BTreeMap<String, Reducer>;

impl Reducer {
    /// Reduce, ignoring NaN. An empty (or all-NaN) bucket gives NaN for
    /// `Mean` and `0.0` for `Sum`.
    pub fn reduce<I: IntoIterator<Item = f64>>(self, values: I) -> f64 {
        let (sum, count) = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        match self {
            Reducer::Sum => sum,
            Reducer::Mean if count == 0 => f64::NAN,
            Reducer::Mean => sum / count as f64,
        }
    }
}

/// NaN-skipping mean of a whole series.
pub fn mean(values: &[f64]) -> f64 {
    Reducer::Mean.reduce(values.iter().copied())
}

/// Trailing rolling mean over `window` samples.
///
/// The first `window - 1` entries, and any window containing NaN, are NaN.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return vec![f64::NAN; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return f64::NAN;
            }
            let slice = &values[i + 1 - window..=i];
            if slice.iter().any(|v| v.is_nan()) {
                f64::NAN
            } else {
                slice.iter().sum::<f64>() / window as f64
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Calendar buckets
// ---------------------------------------------------------------------------

/// Resampling period. Buckets follow calendar boundaries, not fixed sample
/// counts, so leap years and truncated final years are handled naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Month,
    Year,
}

impl Period {
    /// First day of the bucket containing `t`.
    pub fn bucket(self, t: NaiveDateTime) -> NaiveDate {
        let date = t.date();
        match self {
            Period::Day => date,
            Period::Month => date.with_day(1).unwrap_or(date),
            Period::Year => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
        }
    }
}

/// Reduce one series into calendar buckets, in chronological order. Only
/// buckets that contain at least one sample are emitted.
pub fn resample_series(
    index: &[NaiveDateTime],
    values: ArrayView1<'_, f64>,
    period: Period,
    reducer: Reducer,
) -> Vec<(NaiveDate, f64)> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for (t, &v) in index.iter().zip(values.iter()) {
        buckets.entry(period.bucket(*t)).or_default().push(v);
    }
    buckets
        .into_iter()
        .map(|(start, vals)| (start, reducer.reduce(vals)))
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregated tables
// ---------------------------------------------------------------------------

/// Row label of an aggregated [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Label {
    Date(NaiveDateTime),
    Year(i32),
    Month(u32),
    Cycle(u32),
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Date(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
            Label::Year(y) => write!(f, "{y}"),
            Label::Month(m) => write!(f, "{m}"),
            Label::Cycle(c) => write!(f, "{c}"),
        }
    }
}

/// A labeled table of named series: the output of aggregation and the input
/// of export. Every column has one value per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    label: String,
    rows: Vec<Label>,
    columns: Vec<(String, Vec<f64>)>,
}

impl Table {
    pub fn new(label: &str, rows: Vec<Label>) -> Self {
        Table {
            label: label.to_string(),
            rows,
            columns: Vec::new(),
        }
    }

    pub fn push(&mut self, name: String, values: Vec<f64>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(Error::ShapeMismatch {
                variable: name,
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.push((name, values));
        Ok(())
    }

    /// Header for the label column, e.g. `year`.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn rows(&self) -> &[Label] {
        &self.rows
    }

    pub fn columns(&self) -> &[(String, Vec<f64>)] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
            .ok_or_else(|| Error::MissingVariable(name.to_string()))
    }

    /// NaN-skipping mean over all rows of one column.
    pub fn mean(&self, name: &str) -> Result<f64> {
        let values = self.column(name)?;
        if values.is_empty() {
            return Err(Error::EmptySeries(name.to_string()));
        }
        Ok(mean(values))
    }
}

// ---------------------------------------------------------------------------
// Frame-level aggregation
// ---------------------------------------------------------------------------

impl AnalysisFrame {
    /// Resample every reduced column to `period` buckets. The new index holds
    /// bucket start dates; columns without a reducer are dropped.
    pub fn resample(&self, period: Period, reducers: &Reducers) -> Result<AnalysisFrame> {
        let mut starts: Vec<NaiveDate> = self.index().iter().map(|t| period.bucket(*t)).collect();
        starts.sort();
        starts.dedup();
        let position: HashMap<NaiveDate, usize> =
            starts.iter().enumerate().map(|(i, d)| (*d, i)).collect();

        let mut out = AnalysisFrame::new(starts.iter().map(|d| d.and_time(NaiveTime::MIN)).collect());
        for column in self.columns() {
            let Some(&reducer) = reducers.get(column.name()) else {
                debug!("dropping '{}' from resampled frame: no reducer", column.name());
                continue;
            };
            let mut data = Array2::from_elem((starts.len(), column.pools()), f64::NAN);
            for p in 0..column.pools() {
                let series = column.pool(p)?;
                for (start, value) in resample_series(self.index(), series, period, reducer) {
                    data[[position[&start], p]] = value;
                }
            }
            out.push_column(column.derived(data))?;
        }
        Ok(out)
    }

    /// Group by calendar year and reduce each reduced series.
    pub fn annual(&self, reducers: &Reducers) -> Result<Table> {
        let yearly = self.resample(Period::Year, reducers)?;
        let rows = yearly
            .index()
            .iter()
            .map(|t| Label::Year(t.year()))
            .collect();
        let mut table = Table::new("year", rows);
        for (name, series) in yearly.series() {
            table.push(name, series.to_vec())?;
        }
        Ok(table)
    }

    /// Monthly climatology: reduce to calendar-month buckets, then average
    /// each month-of-year across years. Always 12 rows, months 1–12.
    pub fn monthly_climatology(&self, reducers: &Reducers) -> Result<Table> {
        let monthly = self.resample(Period::Month, reducers)?;
        let mut table = Table::new("month", (1..=12).map(Label::Month).collect());

        for (name, series) in monthly.series() {
            let mut by_month: [Vec<f64>; 12] = Default::default();
            for (t, &v) in monthly.index().iter().zip(series.iter()) {
                by_month[t.month0() as usize].push(v);
            }
            let mut values = Vec::with_capacity(12);
            for (m, vals) in by_month.into_iter().enumerate() {
                if vals.is_empty() {
                    return Err(Error::IncompleteClimatology {
                        series: name,
                        month: m as u32 + 1,
                    });
                }
                values.push(Reducer::Mean.reduce(vals));
            }
            table.push(name, values)?;
        }
        Ok(table)
    }

    /// The frame itself as a date-labeled table.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new("date", self.index().iter().map(|t| Label::Date(*t)).collect());
        for (name, series) in self.series() {
            table.columns.push((name, series.to_vec()));
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::frame::Column;

    fn daily_frame(start: (i32, u32, u32), values: Vec<f64>) -> AnalysisFrame {
        let start = NaiveDate::from_ymd_opt(start.0, start.1, start.2)
            .unwrap()
            .and_time(NaiveTime::MIN);
        let index = (0..values.len())
            .map(|i| start + Duration::days(i as i64))
            .collect();
        AnalysisFrame::new(index)
            .with_column(Column::from_values("GPP", values))
            .unwrap()
    }

    fn reducers(r: Reducer) -> Reducers {
        [("GPP".to_string(), r)].into_iter().collect()
    }

    #[test]
    fn test_reduce_skips_nan() {
        assert_eq!(Reducer::Mean.reduce([1.0, f64::NAN, 3.0]), 2.0);
        assert_eq!(Reducer::Sum.reduce([1.0, f64::NAN, 3.0]), 4.0);
        assert!(Reducer::Mean.reduce([f64::NAN]).is_nan());
        assert_eq!(Reducer::Sum.reduce(std::iter::empty()), 0.0);
    }

    #[test]
    fn test_table_rejects_short_column() {
        let mut table = Table::new("year", vec![Label::Year(2002), Label::Year(2003)]);
        assert!(matches!(
            table.push("GPP".to_string(), vec![1.0]),
            Err(Error::ShapeMismatch { expected: 2, found: 1, .. })
        ));
        assert!(table.columns().is_empty());
    }

    #[test]
    fn test_rolling_mean_warm_up() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert!(out[0].is_nan() && out[1].is_nan());
        assert_eq!(&out[2..], &[2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rolling_mean_nan_window() {
        let out = rolling_mean(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(out[1].is_nan() && out[2].is_nan());
        assert_eq!(out[3], 3.5);
    }

    #[test]
    fn test_climatology_of_constant_series() {
        // 2002 and 2003: 730 days
        let frame = daily_frame((2002, 1, 1), vec![2.5; 730]);
        let table = frame.monthly_climatology(&reducers(Reducer::Mean)).unwrap();
        assert_eq!(table.len(), 12);
        assert_eq!(table.rows(), (1..=12).map(Label::Month).collect::<Vec<_>>());
        assert!(table.column("GPP").unwrap().iter().all(|&v| v == 2.5));
    }

    #[test]
    fn test_climatology_sums_within_month() {
        let frame = daily_frame((2002, 1, 1), vec![1.0; 365]);
        let table = frame.monthly_climatology(&reducers(Reducer::Sum)).unwrap();
        let gpp = table.column("GPP").unwrap();
        assert_eq!(gpp[0], 31.0);
        assert_eq!(gpp[1], 28.0);
        assert_eq!(gpp[3], 30.0);
    }

    #[test]
    fn test_climatology_requires_every_month() {
        let frame = daily_frame((2002, 1, 1), vec![1.0; 200]);
        assert!(matches!(
            frame.monthly_climatology(&reducers(Reducer::Mean)),
            Err(Error::IncompleteClimatology { month: 8, .. })
        ));
    }

    #[test]
    fn test_annual_uses_calendar_years() {
        // 2003-12-30 .. 2004-03-01: leap February, truncated final year
        let frame = daily_frame((2003, 12, 30), vec![1.0; 63]);
        let table = frame.annual(&reducers(Reducer::Sum)).unwrap();
        assert_eq!(table.rows(), &[Label::Year(2003), Label::Year(2004)]);
        assert_eq!(table.column("GPP").unwrap(), &[2.0, 61.0]);
    }

    #[test]
    fn test_resample_daily_drops_unreduced_columns() {
        let start = NaiveDate::from_ymd_opt(2008, 1, 1).unwrap().and_time(NaiveTime::MIN);
        let index: Vec<NaiveDateTime> = (0..48).map(|i| start + Duration::hours(i)).collect();
        let frame = AnalysisFrame::new(index)
            .with_column(Column::from_values("GPP", vec![0.5; 48]))
            .unwrap()
            .with_column(Column::from_values("Qle", (0..48).map(|i| i as f64).collect()))
            .unwrap()
            .with_column(Column::from_values("LAI", vec![3.0; 48]))
            .unwrap();
        let mut reducers = reducers(Reducer::Sum);
        reducers.insert("Qle".to_string(), Reducer::Mean);

        let daily = frame.resample(Period::Day, &reducers).unwrap();
        assert_eq!(daily.len(), 2);
        assert_eq!(daily.column_names(), vec!["GPP", "Qle"]);
        assert_eq!(daily.column("GPP").unwrap().series().unwrap().to_vec(), vec![12.0, 12.0]);
        assert_eq!(daily.column("Qle").unwrap().series().unwrap().to_vec(), vec![11.5, 35.5]);
    }

    #[test]
    fn test_annual_pooled_column() {
        let start = NaiveDate::from_ymd_opt(2002, 1, 1).unwrap().and_time(NaiveTime::MIN);
        let index: Vec<NaiveDateTime> = (0..730).map(|i| start + Duration::days(i)).collect();
        let data = Array2::from_shape_fn((730, 3), |(i, p)| if i < 365 { p as f64 } else { 10.0 * p as f64 });
        let frame = AnalysisFrame::new(index)
            .with_column(Column::new("cplant", data))
            .unwrap();
        let reducers: Reducers = [("cplant".to_string(), Reducer::Mean)].into_iter().collect();

        let table = frame.annual(&reducers).unwrap();
        assert_eq!(table.column("cplant[2]").unwrap(), &[2.0, 20.0]);
        assert_eq!(table.mean("cplant[1]").unwrap(), 5.5);
    }
}
