use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use demand_core::config::expand_home;
use demand_core::{DemandConfig, InferenceService, ProvisionOutcome, Provisioner};
use demand_cli::cli::ModelArgs;
use tracing::info;

/// Model location after merging flags over the configuration file.
#[derive(Debug, Clone)]
pub struct ModelSource {
    pub url: Option<String>,
    pub path: PathBuf,
    pub sha256: Option<String>,
    pub timeout: Duration,
}

impl ModelSource {
    pub fn resolve(args: &ModelArgs, config: &DemandConfig) -> Self {
        Self {
            url: args.model_url.clone().or_else(|| config.model.url.clone()),
            path: args
                .model_path
                .as_ref()
                .map(|p| expand_home(&p.to_string_lossy()))
                .unwrap_or_else(|| config.model.resolved_path()),
            sha256: args.sha256.clone().or_else(|| config.model.sha256.clone()),
            timeout: args
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.model.timeout()),
        }
    }

    /// Make sure the artifact is on disk.
    pub fn provision(&self) -> Result<ProvisionOutcome> {
        let outcome = Provisioner::http(self.timeout)
            .with_sha256(self.sha256.clone())
            .ensure(self.url.as_deref(), &self.path)?;
        Ok(outcome)
    }

    /// Provision and load; any error here is fatal for the command.
    pub fn start_service(&self) -> Result<InferenceService> {
        self.provision()?;
        let service = InferenceService::load(&self.path)?;
        info!(family = service.model_family(), "inference service ready");
        Ok(service)
    }
}

pub fn history_columns(
    config: &DemandConfig,
    timestamp: Option<&str>,
    value: Option<&str>,
) -> (String, String) {
    (
        timestamp
            .map(String::from)
            .unwrap_or_else(|| config.history.timestamp_column.clone()),
        value
            .map(String::from)
            .unwrap_or_else(|| config.history.value_column.clone()),
    )
}
