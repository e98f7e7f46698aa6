//! Historical hourly demand series.
//!
//! Loads a demand file into a [`DemandHistory`], buckets it into trends and
//! derives the calendar, lag and rolling features the model expects for a
//! given hour. A missing history file degrades to a warning through
//! [`try_load_history`].

use std::{fs::File, path::Path};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime};
use polars::prelude::*;
#[cfg(feature = "parquet")]
use polars::prelude::ParquetReader;
use tracing::{info, warn};

mod history;

pub use history::{calendar_for, DemandHistory, HistoryPoint, TrendBucket, TrendPoint};

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Read a demand series from a CSV (or Parquet) file.
///
/// `timestamp_column` may hold date-time strings, integer Unix seconds or
/// (with the `temporal` feature) native Date/Datetime values;
/// `value_column` is cast to MW floats. Rows with a missing timestamp or
/// value are skipped.
pub fn load_history(
    input_path: &Path,
    timestamp_column: &str,
    value_column: &str,
) -> Result<DemandHistory> {
    let df = read_frame(input_path)?;
    let timestamps = timestamp_values(&df, timestamp_column)?;
    let value_series = df
        .column(value_column)
        .with_context(|| format!("column '{value_column}' not found"))?
        .cast(&DataType::Float64)
        .context("casting value column to Float64")?;
    let values = value_series.f64()?;

    let mut points = Vec::with_capacity(df.height());
    let mut skipped = 0usize;
    for (ts_opt, val_opt) in timestamps.into_iter().zip(values.into_iter()) {
        match (ts_opt, val_opt) {
            (Some(timestamp), Some(value)) if value.is_finite() => {
                points.push(HistoryPoint::new(timestamp, value))
            }
            _ => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(skipped, path = %input_path.display(), "skipped incomplete history rows");
    }

    let history = DemandHistory::from_points(points);
    info!(
        rows = history.len(),
        path = %input_path.display(),
        "loaded demand history"
    );
    Ok(history)
}

/// Like [`load_history`], but a missing file is a warning rather than an error.
pub fn try_load_history(
    input_path: &Path,
    timestamp_column: &str,
    value_column: &str,
) -> Result<Option<DemandHistory>> {
    if !input_path.exists() {
        warn!(
            path = %input_path.display(),
            "historical data file not found; trend data unavailable"
        );
        return Ok(None);
    }
    load_history(input_path, timestamp_column, value_column).map(Some)
}

/// Parse a timestamp in one of the accepted layouts.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| anyhow!("unrecognized timestamp '{raw}'; use YYYY-MM-DD HH:MM:SS"))
}

fn timestamp_values(df: &DataFrame, column: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let series = df
        .column(column)
        .with_context(|| format!("column '{column}' not found"))?;
    match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .map(|raw| raw.map(parse_timestamp).transpose())
            .collect(),
        #[cfg(feature = "temporal")]
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            physical_values(series)?
                .into_iter()
                .map(|raw| raw.map(|v| from_epoch(v, unit)).transpose())
                .collect()
        }
        #[cfg(feature = "temporal")]
        DataType::Date => physical_values(series)?
            .into_iter()
            .map(|days| {
                days.map(|d| {
                    d.checked_mul(86_400)
                        .ok_or_else(|| anyhow!("date {d} days out of range"))
                        .and_then(from_unix_seconds)
                })
                .transpose()
            })
            .collect(),
        _ => {
            let seconds = series
                .cast(&DataType::Int64)
                .context("casting timestamp column to Int64")?;
            seconds
                .i64()?
                .into_iter()
                .map(|secs| secs.map(from_unix_seconds).transpose())
                .collect()
        }
    }
}

/// Raw epoch offsets behind a temporal column.
#[cfg(feature = "temporal")]
fn physical_values(series: &Series) -> Result<Vec<Option<i64>>> {
    let raw = series
        .to_physical_repr()
        .cast(&DataType::Int64)
        .context("reading temporal column")?;
    Ok(raw.i64()?.into_iter().collect())
}

#[cfg(feature = "temporal")]
fn from_epoch(value: i64, unit: TimeUnit) -> Result<NaiveDateTime> {
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let secs = value.div_euclid(per_second);
    let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
    DateTime::from_timestamp(secs, nanos as u32)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow!("timestamp {value} ({unit:?}) out of range"))
}

fn from_unix_seconds(secs: i64) -> Result<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| anyhow!("timestamp {secs} out of range"))
}

fn read_frame(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;

    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => {
            let reader = ParquetReader::new(&mut file);
            reader.finish().context("reading Parquet file")
        }
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => {
            let reader = CsvReader::new(&mut file);
            reader.has_header(true).finish().context("reading CSV file")
        }
        _ => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[cfg(feature = "temporal")]
    #[test]
    fn test_native_temporal_columns_use_their_unit() {
        let expected = parse_timestamp("2018-08-03 14:00:00").unwrap();
        let millis = expected.and_utc().timestamp_millis();
        let datetime = Series::new("ts", &[millis])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        let date = Series::new("day", &[17746i32]).cast(&DataType::Date).unwrap();
        let df = DataFrame::new(vec![datetime, date]).unwrap();

        assert_eq!(timestamp_values(&df, "ts").unwrap(), vec![Some(expected)]);
        assert_eq!(
            timestamp_values(&df, "day").unwrap(),
            vec![Some(parse_timestamp("2018-08-03 00:00").unwrap())]
        );
    }

    #[cfg(feature = "temporal")]
    #[test]
    fn test_epoch_offsets_by_unit() {
        let expected = parse_timestamp("1970-01-01 00:00:01").unwrap();
        assert_eq!(from_epoch(1_000_000_000, TimeUnit::Nanoseconds).unwrap(), expected);
        assert_eq!(from_epoch(1_000_000, TimeUnit::Microseconds).unwrap(), expected);
        assert_eq!(from_epoch(1_000, TimeUnit::Milliseconds).unwrap(), expected);
        let before = from_epoch(-1, TimeUnit::Milliseconds).unwrap();
        let expected_before =
            parse_timestamp("1969-12-31 23:59:59").unwrap() + chrono::Duration::milliseconds(999);
        assert_eq!(before, expected_before);
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let expected = NaiveDateTime::parse_from_str("2018-08-03 14:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap();
        assert_eq!(parse_timestamp("2018-08-03 14:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2018-08-03T14:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2018-08-03 14:00 ").unwrap(), expected);
        assert!(parse_timestamp("03/08/2018").is_err());
    }

    #[test]
    fn test_load_csv_with_string_timestamps() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demand.csv");
        fs::write(
            &path,
            "timestamp,demand_mw\n\
             2018-01-01 01:00:00,30100.5\n\
             2018-01-01 00:00:00,30000\n\
             2018-01-01 02:00:00,\n",
        )
        .unwrap();

        let history = load_history(&path, "timestamp", "demand_mw").unwrap();
        assert_eq!(history.len(), 2);
        let first = &history.points()[0];
        assert_eq!(first.timestamp, parse_timestamp("2018-01-01 00:00:00").unwrap());
        assert_eq!(first.demand.value(), 30000.0);
    }

    #[test]
    fn test_load_csv_with_unix_seconds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demand.csv");
        fs::write(&path, "ts,load\n0,10.0\n3600,20.0\n").unwrap();

        let history = load_history(&path, "ts", "load").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.points()[1].timestamp,
            parse_timestamp("1970-01-01 01:00:00").unwrap()
        );
    }

    #[test]
    fn test_missing_column_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demand.csv");
        fs::write(&path, "timestamp,value\n2018-01-01 00:00:00,1\n").unwrap();
        let err = load_history(&path, "timestamp", "demand_mw").unwrap_err();
        assert!(format!("{err:#}").contains("demand_mw"));
    }

    #[test]
    fn test_missing_file_degrades_to_none() {
        let dir = tempdir().unwrap();
        let result = try_load_history(&dir.path().join("absent.csv"), "timestamp", "demand_mw");
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("demand.xlsx");
        fs::write(&path, "x").unwrap();
        assert!(load_history(&path, "timestamp", "demand_mw").is_err());
    }
}
