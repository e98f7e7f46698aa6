use std::process::ExitCode;

use clap::Parser;
use demand_cli::cli::{Cli, Commands};
use demand_core::{load_config, DemandConfig, DemandError};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::history::HistoryRequest;

/// Exit status for a request-level failure (bad inputs, failed prediction).
const EXIT_REQUEST_FAILED: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let level = cli
        .log_level
        .or_else(|| config.logging.level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: could not install log subscriber: {err}");
    }

    match run(&cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => match err.downcast_ref::<DemandError>() {
            Some(request_err) if !request_err.is_fatal() => {
                eprintln!("{request_err}");
                ExitCode::from(EXIT_REQUEST_FAILED)
            }
            _ => {
                eprintln!("Error: {err:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(command: &Commands, config: &DemandConfig) -> anyhow::Result<()> {
    match command {
        Commands::Provision { model } => commands::provision::handle(model, config),
        Commands::Predict {
            model,
            inputs,
            format,
        } => commands::predict::handle(model, inputs, *format, config),
        Commands::Importances { model, format } => {
            commands::importances::handle(model, *format, config)
        }
        Commands::Batch { input, out, model } => {
            commands::batch::handle(input, out.as_deref(), model, config)
        }
        Commands::History {
            input,
            bucket,
            timestamp,
            value,
            format,
        } => commands::history::handle(
            HistoryRequest {
                input: input.as_deref(),
                bucket: *bucket,
                timestamp: timestamp.as_deref(),
                value: value.as_deref(),
                format: *format,
            },
            config,
        ),
        Commands::Completions { shell, out } => {
            commands::completions::handle(*shell, out.as_deref())
        }
    }
}
