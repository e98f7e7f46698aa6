//! # demand-core: Electricity Demand Inference Core
//!
//! Provides the feature contract, model artifacts and inference service used
//! to predict hourly electricity demand from ten calendar and lag features.
//!
//! ## Flow
//!
//! 1. [`Provisioner`] makes sure the model artifact is on local disk,
//!    downloading it once if needed.
//! 2. [`InferenceService::load`] deserializes and checks the artifact.
//! 3. Each request supplies a [`FeatureVector`] and receives a
//!    [`Prediction`] or a typed [`DemandError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demand_core::*;
//! use std::path::Path;
//!
//! let path = Path::new("demand_model.json");
//! Provisioner::http(DEFAULT_FETCH_TIMEOUT)
//!     .ensure(Some("https://example.org/demand_model.json"), path)?;
//! let service = InferenceService::load(path)?;
//!
//! let vector = FeatureVector::new(
//!     CalendarInputs { year: 2025, month: 6, day_of_week: 2, is_weekend: 0, hour: 12 },
//!     DemandLags {
//!         lag_1: 35000.0,
//!         lag_24: 36000.0,
//!         rolling_mean_24: 35500.0,
//!         rolling_std_24: 500.0,
//!     },
//! );
//! println!("{}", service.predict(&vector)?);
//! # Ok::<(), DemandError>(())
//! ```

pub mod artifact;
pub mod config;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;
pub mod provision;
pub mod units;

pub use artifact::{load_artifact, parse_artifact, save_artifact, ArtifactFile, ModelSpec};
pub use config::{load_config, DemandConfig};
pub use error::{DemandError, DemandResult};
pub use features::{
    quarter_for_month, CalendarInputs, DemandLags, FeatureInputs, FeatureVector, FEATURE_COUNT,
    FEATURE_NAMES,
};
pub use inference::{FeatureImportances, InferenceService, Prediction};
pub use model::{DemandModel, LinearModel, RandomForest, RegressionTree, TreeNode};
pub use provision::{
    provision_and_load, ArtifactSource, HttpSource, ProvisionOutcome, Provisioner,
    DEFAULT_FETCH_TIMEOUT,
};
pub use units::Megawatts;
