//! Error taxonomy for provisioning, loading and inference
//!
//! [`DemandError`] separates failures that must halt the serving surface at
//! startup (provisioning, artifact loading, configuration) from failures that
//! only affect a single request (prediction, invalid inputs, diagnostics).
//! The presentation layer is expected to match on the variant rather than
//! catching everything uniformly.
//!
//! # Example
//!
//! ```ignore
//! use demand_core::{DemandError, DemandResult, InferenceService};
//!
//! fn serve(path: &Path, vector: &FeatureVector) -> DemandResult<()> {
//!     let service = InferenceService::load(path)?;
//!     match service.predict(vector) {
//!         Ok(prediction) => println!("{prediction}"),
//!         Err(err @ DemandError::Prediction(_)) => eprintln!("{err}"),
//!         Err(err) => return Err(err),
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for demand inference operations.
#[derive(Error, Debug)]
pub enum DemandError {
    /// The model artifact could not be fetched from its remote source.
    #[error("Provisioning error: failed to fetch {url}: {reason}")]
    Provisioning { url: String, reason: String },

    /// The local model artifact is missing, unreadable or corrupt.
    #[error("Model load error: {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },

    /// The model raised while producing a prediction.
    #[error("Prediction failed: {0}")]
    Prediction(String),

    /// The loaded model cannot report feature importances.
    #[error("Diagnostics unavailable: {0}")]
    DiagnosticsUnavailable(String),

    /// A feature vector falls outside the accepted input domains.
    #[error("Invalid features: {0}")]
    InvalidFeatures(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemandError {
    /// Build a [`DemandError::Provisioning`] from any displayable cause.
    pub fn provisioning(url: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DemandError::Provisioning {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`DemandError::ModelLoad`] from any displayable cause.
    pub fn model_load(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        DemandError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error must halt the serving surface.
    ///
    /// Startup failures leave no usable model behind; request-level failures
    /// leave the loaded model intact so the user can retry with other inputs.
    pub fn is_fatal(&self) -> bool {
        match self {
            DemandError::Provisioning { .. }
            | DemandError::ModelLoad { .. }
            | DemandError::Config(_)
            | DemandError::Io(_) => true,
            DemandError::Prediction(_)
            | DemandError::DiagnosticsUnavailable(_)
            | DemandError::InvalidFeatures(_) => false,
        }
    }
}

/// Convenience type alias for Results using DemandError.
pub type DemandResult<T> = Result<T, DemandError>;

impl From<toml::de::Error> for DemandError {
    fn from(err: toml::de::Error) -> Self {
        DemandError::Config(err.to_string())
    }
}
