//! Inference service over a loaded demand model.
//!
//! [`InferenceService`] owns the loaded model and is handed to whatever
//! serves requests. The model is read-only after loading, so the service is
//! cheap to clone and safe to share across threads without locking.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::artifact::load_artifact;
use crate::error::{DemandError, DemandResult};
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::model::DemandModel;
use crate::units::Megawatts;

/// Model output for one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub demand: Megawatts,
}

impl Prediction {
    pub fn value_mw(&self) -> f64 {
        self.demand.value()
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.demand, f)
    }
}

/// Importance score per feature, in model input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportances {
    entries: Vec<(&'static str, f64)>,
}

impl FeatureImportances {
    /// Pair raw scores with [`FEATURE_NAMES`].
    pub fn from_scores(scores: &[f64]) -> DemandResult<Self> {
        if scores.len() != FEATURE_COUNT {
            return Err(DemandError::DiagnosticsUnavailable(format!(
                "model reports {} importances for {} features",
                scores.len(),
                FEATURE_COUNT
            )));
        }
        if scores.iter().any(|s| !s.is_finite()) {
            return Err(DemandError::DiagnosticsUnavailable(
                "model reports non-finite importances".to_string(),
            ));
        }
        let entries = FEATURE_NAMES.into_iter().zip(scores.iter().copied()).collect();
        Ok(Self { entries })
    }

    /// Entries in model input order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, score)| *score)
    }

    /// Entries sorted by descending importance; ties keep input order.
    pub fn ranked(&self) -> Vec<(&'static str, f64)> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }
}

/// Serves predictions from a single loaded model.
#[derive(Debug, Clone)]
pub struct InferenceService {
    model: Arc<dyn DemandModel>,
}

impl InferenceService {
    /// Load the artifact at `path`.
    pub fn load(path: &Path) -> DemandResult<Self> {
        Ok(Self::from_model(load_artifact(path)?))
    }

    /// Wrap an already constructed model.
    pub fn from_model(model: impl Into<Arc<dyn DemandModel>>) -> Self {
        Self {
            model: model.into(),
        }
    }

    pub fn model_family(&self) -> &str {
        self.model.family()
    }

    /// Predict demand for `vector`.
    ///
    /// Fields are passed to the model unmodified and in [`FEATURE_NAMES`]
    /// order; range checks are the caller's business.
    pub fn predict(&self, vector: &FeatureVector) -> DemandResult<Prediction> {
        let row = vector.to_row();
        let value = self
            .model
            .predict(&row)
            .map_err(|e| DemandError::Prediction(format!("{e:#}")))?;
        if !value.is_finite() {
            return Err(DemandError::Prediction(format!(
                "model returned non-finite value {value}"
            )));
        }
        debug!(family = self.model.family(), value, "prediction");
        Ok(Prediction {
            demand: Megawatts(value),
        })
    }

    /// Per-feature importances reported by the model.
    pub fn feature_importances(&self) -> DemandResult<FeatureImportances> {
        let scores = self.model.feature_importances().ok_or_else(|| {
            DemandError::DiagnosticsUnavailable(format!(
                "{} models do not expose feature importances",
                self.model.family()
            ))
        })?;
        FeatureImportances::from_scores(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Echo;

    impl DemandModel for Echo {
        fn family(&self) -> &str {
            "echo"
        }

        fn predict(&self, row: &[f64; FEATURE_COUNT]) -> anyhow::Result<f64> {
            Ok(row[6])
        }

        fn feature_importances(&self) -> Option<&[f64]> {
            Some(&[0.0, 0.0, 0.1, 0.0, 0.0, 0.3, 0.4, 0.1, 0.1, 0.0])
        }
    }

    #[test]
    fn test_ranked_sorts_descending_with_stable_ties() {
        let service = InferenceService::from_model(Box::new(Echo) as Box<dyn DemandModel>);
        let ranked = service.feature_importances().unwrap().ranked();
        assert_eq!(ranked[0].0, "lag_1");
        assert_eq!(ranked[1].0, "Hour");
        assert_eq!(ranked[2].0, "Month");
        assert_eq!(ranked[3].0, "lag_24");
    }

    #[test]
    fn test_importances_length_mismatch() {
        let err = FeatureImportances::from_scores(&[1.0; 9]).unwrap_err();
        assert!(matches!(err, DemandError::DiagnosticsUnavailable(_)));
    }

    #[test]
    fn test_get_by_name() {
        let imp = FeatureImportances::from_scores(&[0.5; FEATURE_COUNT]).unwrap();
        assert_eq!(imp.get("rolling_std_24"), Some(0.5));
        assert_eq!(imp.get("temperature"), None);
        assert_eq!(imp.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_clones_share_model() {
        let service = InferenceService::from_model(Box::new(Echo) as Box<dyn DemandModel>);
        let other = service.clone();
        assert!(Arc::ptr_eq(&service.model, &other.model));
    }
}
