use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, Result};
use demand_cli::cli::{OutputFormat, TrendBucketArg};
use demand_core::units::group_thousands;
use demand_core::DemandConfig;
use demand_ts::{try_load_history, TrendBucket, TrendPoint};
use tabwriter::TabWriter;

use crate::commands::util::history_columns;

pub struct HistoryRequest<'a> {
    pub input: Option<&'a Path>,
    pub bucket: TrendBucketArg,
    pub timestamp: Option<&'a str>,
    pub value: Option<&'a str>,
    pub format: OutputFormat,
}

pub fn handle(request: HistoryRequest<'_>, config: &DemandConfig) -> Result<()> {
    let path = request
        .input
        .map(Path::to_path_buf)
        .or_else(|| config.history.resolved_path())
        .ok_or_else(|| anyhow!("no history file given (pass a path or set [history] path)"))?;
    let (ts_col, value_col) = history_columns(config, request.timestamp, request.value);

    let Some(history) = try_load_history(&path, &ts_col, &value_col)? else {
        eprintln!(
            "Warning: historical data file {} not found; trend data unavailable",
            path.display()
        );
        return Ok(());
    };

    let trend = history.trend(bucket_for(request.bucket));
    match request.format {
        OutputFormat::Plain => print_table(&trend),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&trend)?);
            Ok(())
        }
    }
}

fn bucket_for(arg: TrendBucketArg) -> TrendBucket {
    match arg {
        TrendBucketArg::Hourly => TrendBucket::Hourly,
        TrendBucketArg::Daily => TrendBucket::Daily,
        TrendBucketArg::Monthly => TrendBucket::Monthly,
    }
}

fn print_table(trend: &[TrendPoint]) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "BUCKET\tCOUNT\tMEAN_MW\tMIN_MW\tMAX_MW")?;
    for point in trend {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            point.bucket_start.format("%Y-%m-%d %H:%M"),
            point.count,
            group_thousands(point.mean.value(), 2),
            group_thousands(point.min.value(), 2),
            group_thousands(point.max.value(), 2),
        )?;
    }
    writer.flush()?;
    Ok(())
}
