use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use demand_cli::cli::{ModelArgs, OutputFormat, PredictInputs};
use demand_core::{CalendarInputs, DemandConfig, DemandLags, FeatureVector};
use demand_ts::{load_history, parse_timestamp};
use serde::Serialize;
use tracing::{info, warn};

use crate::commands::util::{history_columns, ModelSource};

#[derive(Serialize)]
struct PredictionReport<'a> {
    prediction_mw: f64,
    features: &'a FeatureVector,
    advisories: &'a [String],
}

pub fn handle(
    model: &ModelArgs,
    inputs: &PredictInputs,
    format: OutputFormat,
    config: &DemandConfig,
) -> Result<()> {
    let service = ModelSource::resolve(model, config).start_service()?;
    let vector = feature_vector(inputs, config)?;

    let advisories = vector.advisories();
    for note in &advisories {
        warn!("{note}");
    }

    let prediction = service.predict(&vector)?;
    match format {
        OutputFormat::Plain => println!("Predicted Electricity Demand: {prediction}"),
        OutputFormat::Json => {
            let report = PredictionReport {
                prediction_mw: prediction.value_mw(),
                features: &vector,
                advisories: &advisories,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Build the vector from flags, or from history when `--at` is given.
fn feature_vector(inputs: &PredictInputs, config: &DemandConfig) -> Result<FeatureVector> {
    let Some(at) = inputs.at.as_deref() else {
        let vector = FeatureVector::new(
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
        );
        vector.validate()?;
        return Ok(vector);
    };

    let path: PathBuf = inputs
        .history
        .clone()
        .or_else(|| config.history.resolved_path())
        .ok_or_else(|| anyhow!("--at needs a history file (--history or [history] path)"))?;
    let timestamp = parse_timestamp(at)?;
    let (ts_col, value_col) =
        history_columns(config, inputs.timestamp.as_deref(), inputs.value.as_deref());
    let history = load_history(&path, &ts_col, &value_col)?;
    let vector = history
        .feature_vector_at(timestamp)
        .with_context(|| format!("deriving features for {timestamp} from {}", path.display()))?;
    info!(
        year = vector.year,
        month = vector.month,
        hour = vector.hour,
        lag_1 = vector.lag_1,
        lag_24 = vector.lag_24,
        "features derived from history"
    );
    vector.validate()?;
    Ok(vector)
}
