use std::io::{self, Write};

use anyhow::Result;
use demand_cli::cli::{ModelArgs, OutputFormat};
use demand_core::{DemandConfig, DemandError, FeatureImportances};
use serde_json::{json, Value};
use tabwriter::TabWriter;

use crate::commands::util::ModelSource;

pub fn handle(model: &ModelArgs, format: OutputFormat, config: &DemandConfig) -> Result<()> {
    let service = ModelSource::resolve(model, config).start_service()?;
    let importances = match service.feature_importances() {
        Ok(importances) => importances,
        Err(err @ DemandError::DiagnosticsUnavailable(_)) => {
            eprintln!("Warning: {err}");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    match format {
        OutputFormat::Plain => print_table(&importances),
        OutputFormat::Json => print_json(&importances),
    }
}

fn print_table(importances: &FeatureImportances) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "RANK\tFEATURE\tIMPORTANCE")?;
    for (rank, (name, score)) in importances.ranked().into_iter().enumerate() {
        writeln!(writer, "{}\t{}\t{:.4}", rank + 1, name, score)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_json(importances: &FeatureImportances) -> Result<()> {
    let entries: Vec<Value> = importances
        .iter()
        .map(|(name, score)| json!({ "feature": name, "importance": score }))
        .collect();
    let body = json!({ "feature_importances": entries });
    serde_json::to_writer_pretty(io::stdout(), &body)
        .map_err(|err| anyhow::anyhow!("serializing importances to JSON: {err}"))?;
    println!();
    Ok(())
}
