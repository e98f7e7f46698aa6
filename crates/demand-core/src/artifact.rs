//! Serialized model artifacts.
//!
//! An artifact is a JSON document with a small envelope around the model
//! parameters:
//!
//! ```json
//! {
//!   "format": "demand-model",
//!   "version": 1,
//!   "feature_names": ["Year", "Quarter", "Month", "..."],
//!   "model": { "kind": "random_forest", "trees": [ ... ] }
//! }
//! ```
//!
//! Loading either yields a fully checked model or a
//! [`DemandError::ModelLoad`]; nothing half-built escapes.

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DemandError, DemandResult};
use crate::features::FEATURE_NAMES;
use crate::model::{DemandModel, LinearModel, RandomForest};

/// Value of the envelope `format` field.
pub const ARTIFACT_FORMAT: &str = "demand-model";

/// Newest envelope version this build understands.
pub const ARTIFACT_VERSION: u32 = 1;

/// First byte of a Python pickle stream (protocol 2+).
const PICKLE_PROTO: u8 = 0x80;

/// On-disk representation of a trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub format: String,
    pub version: u32,
    /// Input names the model was trained on, in order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub model: ModelSpec,
}

/// Model parameters, tagged by family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    RandomForest(RandomForest),
    Linear(LinearModel),
}

impl ArtifactFile {
    /// Wrap model parameters in a current-version envelope.
    pub fn new(model: ModelSpec) -> Self {
        Self {
            format: ARTIFACT_FORMAT.to_string(),
            version: ARTIFACT_VERSION,
            feature_names: Some(FEATURE_NAMES.iter().map(|s| s.to_string()).collect()),
            model,
        }
    }

    /// Verify the envelope and model structure.
    pub fn check(&self) -> Result<()> {
        ensure!(
            self.format == ARTIFACT_FORMAT,
            "unrecognized artifact format '{}'",
            self.format
        );
        ensure!(
            (1..=ARTIFACT_VERSION).contains(&self.version),
            "artifact version {} is not supported (this build reads up to v{})",
            self.version,
            ARTIFACT_VERSION
        );
        if let Some(names) = &self.feature_names {
            if names.len() != FEATURE_NAMES.len()
                || names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
            {
                bail!(
                    "model was trained on features [{}], expected [{}]",
                    names.join(", "),
                    FEATURE_NAMES.join(", ")
                );
            }
        }
        match &self.model {
            ModelSpec::RandomForest(forest) => forest.check(),
            ModelSpec::Linear(linear) => linear.check(),
        }
    }

    /// Consume the envelope, yielding the model behind the trait.
    pub fn into_model(self) -> Box<dyn DemandModel> {
        match self.model {
            ModelSpec::RandomForest(forest) => Box::new(forest),
            ModelSpec::Linear(linear) => Box::new(linear),
        }
    }
}

/// Parse and check an artifact from raw bytes.
pub fn parse_artifact(bytes: &[u8]) -> Result<ArtifactFile> {
    ensure!(!bytes.is_empty(), "artifact file is empty");
    if bytes[0] == PICKLE_PROTO {
        bail!("unsupported format: Python pickle; export the model as a demand-model JSON artifact");
    }
    let artifact: ArtifactFile =
        serde_json::from_slice(bytes).context("artifact is not a valid demand-model document")?;
    artifact.check()?;
    Ok(artifact)
}

/// Load a model artifact from disk.
pub fn load_artifact(path: &Path) -> DemandResult<Box<dyn DemandModel>> {
    let bytes = fs::read(path).map_err(|e| DemandError::model_load(path, e))?;
    let artifact =
        parse_artifact(&bytes).map_err(|e| DemandError::model_load(path, format!("{e:#}")))?;
    let model = artifact.into_model();
    info!(
        path = %path.display(),
        family = model.family(),
        "loaded model artifact"
    );
    Ok(model)
}

/// Write an artifact to disk as pretty-printed JSON.
pub fn save_artifact(artifact: &ArtifactFile, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let contents = serde_json::to_vec_pretty(artifact).context("serializing artifact")?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RegressionTree, TreeNode};

    fn leaf_forest(value: f64) -> ModelSpec {
        ModelSpec::RandomForest(RandomForest {
            trees: vec![RegressionTree {
                nodes: vec![TreeNode::Leaf { value }],
            }],
            feature_importances: Some(vec![0.1; 10]),
        })
    }

    #[test]
    fn test_parse_round_trip_of_new_envelope() {
        let bytes = serde_json::to_vec(&ArtifactFile::new(leaf_forest(5.0))).unwrap();
        let artifact = parse_artifact(&bytes).unwrap();
        let model = artifact.into_model();
        assert_eq!(model.family(), "random_forest");
        assert_eq!(model.predict(&[0.0; 10]).unwrap(), 5.0);
    }

    #[test]
    fn test_saved_artifact_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models/demand_model.json");
        save_artifact(&ArtifactFile::new(leaf_forest(31000.0)), &path).unwrap();

        let model = load_artifact(&path).unwrap();
        assert_eq!(model.family(), "random_forest");
        assert_eq!(model.predict(&[1.0; 10]).unwrap(), 31000.0);
        assert_eq!(model.feature_importances().map(<[f64]>::len), Some(10));
    }

    #[test]
    fn test_feature_names_must_match_order() {
        let mut artifact = ArtifactFile::new(leaf_forest(1.0));
        if let Some(names) = artifact.feature_names.as_mut() {
            names.swap(0, 1);
        }
        let err = artifact.check().unwrap_err();
        assert!(err.to_string().contains("trained on features"));
    }

    #[test]
    fn test_feature_names_are_optional() {
        let mut artifact = ArtifactFile::new(leaf_forest(1.0));
        artifact.feature_names = None;
        assert!(artifact.check().is_ok());
    }

    #[test]
    fn test_rejects_pickle() {
        let err = parse_artifact(&[0x80, 0x04, 0x95]).unwrap_err();
        assert!(err.to_string().contains("pickle"));
    }

    #[test]
    fn test_rejects_unknown_kind_and_version() {
        let json = br#"{"format":"demand-model","version":1,"model":{"kind":"svm"}}"#;
        assert!(parse_artifact(json).is_err());

        let mut artifact = ArtifactFile::new(leaf_forest(1.0));
        artifact.version = ARTIFACT_VERSION + 1;
        assert!(artifact.check().is_err());
    }

    #[test]
    fn test_linear_kind_json() {
        let json = br#"{"format":"demand-model","version":1,
            "model":{"kind":"linear","intercept":1.0,"coefficients":[0,0,0,0,0,0,1,0,0,0]}}"#;
        let model = parse_artifact(json).unwrap().into_model();
        assert_eq!(model.family(), "linear");
    }
}
