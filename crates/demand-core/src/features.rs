//! The ten-field feature contract consumed by demand models.
//!
//! The order of [`FEATURE_NAMES`] is the order the trained model expects.
//! [`FeatureVector`] is the only way rows reach a model, so the field list,
//! their numeric types and their order are fixed by the struct rather than
//! by convention.

use serde::{Deserialize, Serialize};

use crate::error::{DemandError, DemandResult};

/// Number of model inputs.
pub const FEATURE_COUNT: usize = 10;

/// Model input names, in training order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Year",
    "Quarter",
    "Month",
    "DayOfWeek",
    "is_weekend",
    "Hour",
    "lag_1",
    "lag_24",
    "rolling_mean_24",
    "rolling_std_24",
];

/// Earliest year accepted by the input forms.
pub const MIN_YEAR: i32 = 2004;
/// Latest year accepted by the input forms.
pub const MAX_YEAR: i32 = 2050;

/// Calendar quarter (1-4) for a month (1-12).
pub fn quarter_for_month(month: u8) -> u8 {
    (month.saturating_sub(1)) / 3 + 1
}

/// Calendar part of a feature vector, as supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarInputs {
    pub year: i32,
    pub month: u8,
    /// 0 = Monday, 6 = Sunday
    pub day_of_week: u8,
    pub is_weekend: u8,
    pub hour: u8,
}

/// Recent demand statistics, in MW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DemandLags {
    pub lag_1: f64,
    pub lag_24: f64,
    pub rolling_mean_24: f64,
    pub rolling_std_24: f64,
}

/// A fully populated model input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Quarter")]
    pub quarter: u8,
    #[serde(rename = "Month")]
    pub month: u8,
    #[serde(rename = "DayOfWeek")]
    pub day_of_week: u8,
    pub is_weekend: u8,
    #[serde(rename = "Hour")]
    pub hour: u8,
    pub lag_1: f64,
    pub lag_24: f64,
    pub rolling_mean_24: f64,
    pub rolling_std_24: f64,
}

/// The nine caller-supplied fields; Quarter is derived on conversion.
///
/// Deserializes from rows carrying the same column names as
/// [`FEATURE_NAMES`]. A `Quarter` column, if present, is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureInputs {
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Month")]
    pub month: u8,
    #[serde(rename = "DayOfWeek")]
    pub day_of_week: u8,
    pub is_weekend: u8,
    #[serde(rename = "Hour")]
    pub hour: u8,
    pub lag_1: f64,
    pub lag_24: f64,
    pub rolling_mean_24: f64,
    pub rolling_std_24: f64,
}

impl FeatureVector {
    /// Build a vector from calendar inputs and lags, deriving Quarter.
    pub fn new(calendar: CalendarInputs, lags: DemandLags) -> Self {
        Self {
            year: calendar.year,
            quarter: quarter_for_month(calendar.month),
            month: calendar.month,
            day_of_week: calendar.day_of_week,
            is_weekend: calendar.is_weekend,
            hour: calendar.hour,
            lag_1: lags.lag_1,
            lag_24: lags.lag_24,
            rolling_mean_24: lags.rolling_mean_24,
            rolling_std_24: lags.rolling_std_24,
        }
    }

    /// The model-facing row, in [`FEATURE_NAMES`] order.
    pub fn to_row(&self) -> [f64; FEATURE_COUNT] {
        [
            f64::from(self.year),
            f64::from(self.quarter),
            f64::from(self.month),
            f64::from(self.day_of_week),
            f64::from(self.is_weekend),
            f64::from(self.hour),
            self.lag_1,
            self.lag_24,
            self.rolling_mean_24,
            self.rolling_std_24,
        ]
    }

    /// `(name, value)` pairs in model order.
    pub fn named_values(&self) -> impl Iterator<Item = (&'static str, f64)> {
        FEATURE_NAMES.into_iter().zip(self.to_row())
    }

    /// Check every field against the domains the input forms allow.
    ///
    /// The inference service does not call this; it is for presentation
    /// surfaces that accept free-form input (files, APIs).
    pub fn validate(&self) -> DemandResult<()> {
        let mut problems = Vec::new();

        if !(MIN_YEAR..=MAX_YEAR).contains(&self.year) {
            problems.push(format!(
                "Year {} outside {}-{}",
                self.year, MIN_YEAR, MAX_YEAR
            ));
        }
        if !(1..=12).contains(&self.month) {
            problems.push(format!("Month {} outside 1-12", self.month));
        } else if self.quarter != quarter_for_month(self.month) {
            problems.push(format!(
                "Quarter {} does not match Month {} (expected {})",
                self.quarter,
                self.month,
                quarter_for_month(self.month)
            ));
        }
        if self.day_of_week > 6 {
            problems.push(format!("DayOfWeek {} outside 0-6", self.day_of_week));
        }
        if self.is_weekend > 1 {
            problems.push(format!("is_weekend {} is not 0 or 1", self.is_weekend));
        }
        if self.hour > 23 {
            problems.push(format!("Hour {} outside 0-23", self.hour));
        }
        for (name, value) in self.named_values().skip(6) {
            if !value.is_finite() {
                problems.push(format!("{name} is not a finite number"));
            }
        }
        if self.rolling_std_24 < 0.0 {
            problems.push(format!(
                "rolling_std_24 {} is negative",
                self.rolling_std_24
            ));
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(DemandError::InvalidFeatures(problems.join("; ")))
        }
    }

    /// Plausibility notes that do not block a prediction.
    pub fn advisories(&self) -> Vec<String> {
        let mut notes = Vec::new();
        let weekend_day = self.day_of_week >= 5;
        if self.day_of_week <= 6 && self.is_weekend <= 1 && weekend_day != (self.is_weekend == 1)
        {
            notes.push(format!(
                "is_weekend={} disagrees with DayOfWeek={}",
                self.is_weekend, self.day_of_week
            ));
        }
        for (name, value) in self.named_values().skip(6).take(3) {
            if value < 0.0 {
                notes.push(format!("{name} is negative ({value})"));
            }
        }
        notes
    }
}

impl From<FeatureInputs> for FeatureVector {
    fn from(inputs: FeatureInputs) -> Self {
        FeatureVector::new(
            CalendarInputs {
                year: inputs.year,
                month: inputs.month,
                day_of_week: inputs.day_of_week,
                is_weekend: inputs.is_weekend,
                hour: inputs.hour,
            },
            DemandLags {
                lag_1: inputs.lag_1,
                lag_24: inputs.lag_24,
                rolling_mean_24: inputs.rolling_mean_24,
                rolling_std_24: inputs.rolling_std_24,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector::new(
            CalendarInputs {
                year: 2025,
                month: 6,
                day_of_week: 2,
                is_weekend: 0,
                hour: 12,
            },
            DemandLags {
                lag_1: 35000.0,
                lag_24: 36000.0,
                rolling_mean_24: 35500.0,
                rolling_std_24: 500.0,
            },
        )
    }

    #[test]
    fn test_quarter_mapping() {
        let expected = [1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4];
        for (month, quarter) in (1..=12u8).zip(expected) {
            assert_eq!(quarter_for_month(month), quarter, "month {month}");
        }
    }

    #[test]
    fn test_quarter_scenarios() {
        assert_eq!(quarter_for_month(1), 1);
        assert_eq!(quarter_for_month(6), 2);
        assert_eq!(quarter_for_month(12), 4);
    }

    #[test]
    fn test_row_order_matches_names() {
        let row = sample().to_row();
        assert_eq!(
            row,
            [2025.0, 2.0, 6.0, 2.0, 0.0, 12.0, 35000.0, 36000.0, 35500.0, 500.0]
        );
        let names: Vec<_> = sample().named_values().map(|(name, _)| name).collect();
        assert_eq!(names, FEATURE_NAMES);
    }

    #[test]
    fn test_serde_uses_model_column_names() {
        let json = serde_json::to_value(sample()).unwrap();
        let obj = json.as_object().unwrap();
        for name in FEATURE_NAMES {
            assert!(obj.contains_key(name), "missing {name}");
        }
        assert_eq!(obj.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_inputs_derive_quarter() {
        let inputs: FeatureInputs = serde_json::from_str(
            r#"{"Year":2024,"Quarter":1,"Month":11,"DayOfWeek":5,"is_weekend":1,"Hour":3,
                "lag_1":1.0,"lag_24":2.0,"rolling_mean_24":3.0,"rolling_std_24":0.5}"#,
        )
        .unwrap();
        let vector = FeatureVector::from(inputs);
        assert_eq!(vector.quarter, 4);
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
        assert!(sample().advisories().is_empty());
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let mut vector = sample();
        vector.month = 13;
        vector.hour = 24;
        vector.lag_1 = f64::NAN;
        let err = vector.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Month 13"));
        assert!(msg.contains("Hour 24"));
        assert!(msg.contains("lag_1"));
    }

    #[test]
    fn test_validate_rejects_inconsistent_quarter() {
        let mut vector = sample();
        vector.quarter = 3;
        assert!(matches!(
            vector.validate(),
            Err(DemandError::InvalidFeatures(_))
        ));
    }

    #[test]
    fn test_advisories_flag_weekend_mismatch_and_negative_demand() {
        let mut vector = sample();
        vector.day_of_week = 6;
        vector.lag_24 = -10.0;
        let notes = vector.advisories();
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("is_weekend=0"));
        assert!(notes[1].contains("lag_24"));
        assert!(vector.validate().is_ok());
    }
}
