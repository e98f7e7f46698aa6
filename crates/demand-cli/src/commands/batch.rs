use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use demand_cli::cli::ModelArgs;
use demand_core::{
    DemandConfig, DemandError, FeatureInputs, FeatureVector, InferenceService, FEATURE_NAMES,
};
use tracing::{info, warn};

use crate::commands::util::ModelSource;

/// Per-row result of a batch run.
enum RowOutcome {
    Predicted(FeatureVector, f64),
    Failed(Option<FeatureVector>, String),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub predicted: usize,
    pub failed: usize,
}

pub fn handle(
    input: &Path,
    out: Option<&Path>,
    model: &ModelArgs,
    config: &DemandConfig,
) -> Result<()> {
    let service = ModelSource::resolve(model, config).start_service()?;
    let reader = csv::Reader::from_path(input)
        .with_context(|| format!("opening batch input {}", input.display()))?;

    let summary = match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating batch output {}", path.display()))?;
            run_batch(&service, reader, file)?
        }
        None => run_batch(&service, reader, io::stdout())?,
    };

    info!(
        predicted = summary.predicted,
        failed = summary.failed,
        "batch complete"
    );
    eprintln!(
        "batch {} -> {}/{} ok/fail",
        input.display(),
        summary.predicted,
        summary.failed
    );
    Ok(())
}

/// Predict every row of `reader`, writing one output row per input row.
///
/// Rows that fail to parse, validate or predict are recorded with an error
/// message; the run continues with the next row.
pub fn run_batch<R: io::Read, W: Write>(
    service: &InferenceService,
    mut reader: csv::Reader<R>,
    sink: W,
) -> Result<BatchSummary> {
    let mut writer = csv::Writer::from_writer(sink);
    let mut header: Vec<&str> = FEATURE_NAMES.to_vec();
    header.extend(["prediction_mw", "error"]);
    writer.write_record(&header)?;

    let mut summary = BatchSummary::default();
    for (idx, row) in reader.deserialize::<FeatureInputs>().enumerate() {
        let line = idx + 2;
        let outcome = match row {
            Ok(inputs) => predict_row(service, FeatureVector::from(inputs)),
            Err(err) => RowOutcome::Failed(None, format!("unreadable row: {err}")),
        };
        match &outcome {
            RowOutcome::Predicted(..) => summary.predicted += 1,
            RowOutcome::Failed(_, reason) => {
                warn!(line, "{reason}");
                summary.failed += 1;
            }
        }
        writer.write_record(output_record(&outcome))?;
    }
    writer.flush()?;
    Ok(summary)
}

fn predict_row(service: &InferenceService, vector: FeatureVector) -> RowOutcome {
    let result = vector
        .validate()
        .and_then(|()| service.predict(&vector));
    match result {
        Ok(prediction) => RowOutcome::Predicted(vector, prediction.value_mw()),
        Err(err @ (DemandError::InvalidFeatures(_) | DemandError::Prediction(_))) => {
            RowOutcome::Failed(Some(vector), err.to_string())
        }
        Err(err) => RowOutcome::Failed(Some(vector), format!("unexpected error: {err}")),
    }
}

fn output_record(outcome: &RowOutcome) -> Vec<String> {
    let (vector, prediction, error) = match outcome {
        RowOutcome::Predicted(vector, value) => (Some(vector), format!("{value:.2}"), String::new()),
        RowOutcome::Failed(vector, reason) => (vector.as_ref(), String::new(), reason.clone()),
    };
    let mut record: Vec<String> = match vector {
        Some(v) => vec![
            v.year.to_string(),
            v.quarter.to_string(),
            v.month.to_string(),
            v.day_of_week.to_string(),
            v.is_weekend.to_string(),
            v.hour.to_string(),
            v.lag_1.to_string(),
            v.lag_24.to_string(),
            v.rolling_mean_24.to_string(),
            v.rolling_std_24.to_string(),
        ],
        None => vec![String::new(); FEATURE_NAMES.len()],
    };
    record.push(prediction);
    record.push(error);
    record
}
