use std::collections::BTreeMap;

use anyhow::{anyhow, ensure, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use demand_core::{CalendarInputs, DemandLags, FeatureVector, Megawatts};
use serde::Serialize;

/// Hours in the trailing window used for rolling statistics.
const WINDOW_HOURS: i64 = 24;

/// One observed demand value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryPoint {
    pub timestamp: NaiveDateTime,
    pub demand: Megawatts,
}

impl HistoryPoint {
    pub fn new(timestamp: NaiveDateTime, demand_mw: f64) -> Self {
        Self {
            timestamp,
            demand: Megawatts(demand_mw),
        }
    }
}

/// Bucket width for [`DemandHistory::trend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBucket {
    Hourly,
    Daily,
    Monthly,
}

impl TrendBucket {
    fn floor(self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        match self {
            TrendBucket::Hourly => ts
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0)),
            TrendBucket::Daily => date.and_hms_opt(0, 0, 0),
            TrendBucket::Monthly => NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0)),
        }
        .unwrap_or(ts)
    }
}

/// Aggregated demand for one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendPoint {
    pub bucket_start: NaiveDateTime,
    pub count: usize,
    pub mean: Megawatts,
    pub min: Megawatts,
    pub max: Megawatts,
}

#[derive(Debug, Clone, Copy)]
struct BucketStats {
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl Default for BucketStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

/// A time-ordered demand series.
///
/// Timestamps are unique; when the input repeats a timestamp the first
/// occurrence is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandHistory {
    points: Vec<HistoryPoint>,
}

impl DemandHistory {
    pub fn from_points(mut points: Vec<HistoryPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        points.dedup_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn points(&self) -> &[HistoryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Demand observed exactly at `timestamp`.
    pub fn value_at(&self, timestamp: NaiveDateTime) -> Option<Megawatts> {
        self.points
            .binary_search_by_key(&timestamp, |p| p.timestamp)
            .ok()
            .map(|idx| self.points[idx].demand)
    }

    /// Mean, min and max demand per bucket, in time order.
    pub fn trend(&self, bucket: TrendBucket) -> Vec<TrendPoint> {
        let mut buckets: BTreeMap<NaiveDateTime, BucketStats> = BTreeMap::new();
        for point in &self.points {
            let value = point.demand.value();
            let entry = buckets.entry(bucket.floor(point.timestamp)).or_default();
            entry.count += 1;
            entry.sum += value;
            entry.min = entry.min.min(value);
            entry.max = entry.max.max(value);
        }

        buckets
            .into_iter()
            .map(|(bucket_start, stats)| TrendPoint {
                bucket_start,
                count: stats.count,
                mean: Megawatts(stats.sum / stats.count as f64),
                min: Megawatts(stats.min),
                max: Megawatts(stats.max),
            })
            .collect()
    }

    /// Lag and rolling features for a prediction at `timestamp`.
    ///
    /// `lag_1` and `lag_24` are the values 1 and 24 hours earlier. The
    /// rolling mean and sample standard deviation cover the 24 hourly
    /// values before `timestamp`; every one of them must be present.
    pub fn lags_at(&self, timestamp: NaiveDateTime) -> Result<DemandLags> {
        let mut window = Vec::with_capacity(WINDOW_HOURS as usize);
        for hours_back in 1..=WINDOW_HOURS {
            let at = timestamp
                .checked_sub_signed(Duration::hours(hours_back))
                .ok_or_else(|| anyhow!("{timestamp} is too early to look back {hours_back}h"))?;
            let value = self
                .value_at(at)
                .ok_or_else(|| anyhow!("no demand recorded at {at} ({hours_back}h before {timestamp})"))?;
            window.push(value.value());
        }

        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);

        Ok(DemandLags {
            lag_1: window[0],
            lag_24: window[window.len() - 1],
            rolling_mean_24: mean,
            rolling_std_24: variance.sqrt(),
        })
    }

    /// Complete feature vector for a prediction at `timestamp`.
    pub fn feature_vector_at(&self, timestamp: NaiveDateTime) -> Result<FeatureVector> {
        ensure!(!self.is_empty(), "demand history is empty");
        Ok(FeatureVector::new(
            calendar_for(timestamp),
            self.lags_at(timestamp)?,
        ))
    }
}

/// Calendar features of a timestamp (Monday = 0, weekend = Saturday/Sunday).
pub fn calendar_for(timestamp: NaiveDateTime) -> CalendarInputs {
    let day_of_week = timestamp.weekday().num_days_from_monday() as u8;
    CalendarInputs {
        year: timestamp.year(),
        month: timestamp.month() as u8,
        day_of_week,
        is_weekend: u8::from(day_of_week >= 5),
        hour: timestamp.hour() as u8,
    }
}
