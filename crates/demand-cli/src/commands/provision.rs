use anyhow::Result;
use demand_core::{DemandConfig, ProvisionOutcome};
use demand_cli::cli::ModelArgs;

use crate::commands::util::ModelSource;

pub fn handle(args: &ModelArgs, config: &DemandConfig) -> Result<()> {
    let source = ModelSource::resolve(args, config);
    match source.provision()? {
        ProvisionOutcome::AlreadyPresent => {
            println!("Model artifact already present at {}", source.path.display());
        }
        ProvisionOutcome::Downloaded { bytes } => {
            println!(
                "Downloaded model artifact ({bytes} bytes) to {}",
                source.path.display()
            );
        }
    }
    Ok(())
}
