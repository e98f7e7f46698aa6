use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Hourly electricity demand predictor",
    long_about = None
)]
pub struct Cli {
    /// Set the logging level (defaults to the configured level, then info)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file (defaults to ~/.demand/config/demand.toml)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the model artifact if it is not cached locally
    Provision {
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Predict demand for one hour
    Predict {
        #[command(flatten)]
        model: ModelArgs,
        #[command(flatten)]
        inputs: PredictInputs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Show the model's feature importances
    Importances {
        #[command(flatten)]
        model: ModelArgs,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Predict every row of a CSV file of feature inputs
    Batch {
        /// Input CSV with Year, Month, DayOfWeek, is_weekend, Hour, lag_1, lag_24,
        /// rolling_mean_24 and rolling_std_24 columns
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Write results here instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Summarize historical demand by hour, day or month
    History {
        /// Historical demand file (defaults to the configured history path)
        #[arg(value_hint = ValueHint::FilePath)]
        input: Option<PathBuf>,
        /// Bucket width
        #[arg(long, value_enum, default_value_t = TrendBucketArg::Daily)]
        bucket: TrendBucketArg,
        /// Timestamp column name
        #[arg(long)]
        timestamp: Option<String>,
        /// Demand column name
        #[arg(long)]
        value: Option<String>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Where to find the model; unset flags fall back to the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Remote URL fetched when the local artifact is missing
    #[arg(long)]
    pub model_url: Option<String>,
    /// Local model artifact path
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub model_path: Option<PathBuf>,
    /// Expected SHA-256 of the downloaded artifact
    #[arg(long)]
    pub sha256: Option<String>,
    /// Download timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Feature inputs; defaults match a typical weekday midday hour.
#[derive(Args, Debug, Clone)]
pub struct PredictInputs {
    /// Year
    #[arg(long, default_value_t = 2025, value_parser = clap::value_parser!(i32).range(2004..=2050))]
    pub year: i32,
    /// Month (1-12); Quarter is derived from it
    #[arg(long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(1..=12))]
    pub month: u8,
    /// Day of week (0=Mon)
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u8).range(0..=6))]
    pub day_of_week: u8,
    /// Is weekend? (0 or 1)
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub is_weekend: u8,
    /// Hour (0-23)
    #[arg(long, default_value_t = 12, value_parser = clap::value_parser!(u8).range(0..=23))]
    pub hour: u8,
    /// Lag 1 hour demand (MW)
    #[arg(long = "lag-1", default_value_t = 35000.0, allow_negative_numbers = true)]
    pub lag_1: f64,
    /// Lag 24 hour demand (MW)
    #[arg(long = "lag-24", default_value_t = 36000.0, allow_negative_numbers = true)]
    pub lag_24: f64,
    /// Rolling mean (24h, MW)
    #[arg(long = "rolling-mean-24", default_value_t = 35500.0, allow_negative_numbers = true)]
    pub rolling_mean_24: f64,
    /// Rolling std (24h, MW)
    #[arg(long = "rolling-std-24", default_value_t = 500.0)]
    pub rolling_std_24: f64,
    /// Derive calendar and lag features from this history file instead
    #[arg(long, requires = "at", value_hint = ValueHint::FilePath)]
    pub history: Option<PathBuf>,
    /// Hour to predict when deriving from history (YYYY-MM-DD HH:MM:SS)
    #[arg(
        long,
        conflicts_with_all = [
            "year", "month", "day_of_week", "is_weekend", "hour",
            "lag_1", "lag_24", "rolling_mean_24", "rolling_std_24",
        ]
    )]
    pub at: Option<String>,
    /// Timestamp column of the history file
    #[arg(long, requires = "at")]
    pub timestamp: Option<String>,
    /// Demand column of the history file
    #[arg(long, requires = "at")]
    pub value: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TrendBucketArg {
    Hourly,
    Daily,
    Monthly,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
