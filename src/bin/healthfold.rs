//! healthfold CLI - Command-line interface for healthfold
//!
//! Commands:
//! - aggregate: Aggregate a provider export into daily metrics
//! - trend: Build a chart series from a saved day history
//! - doctor: Diagnose configuration and stored state

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use healthfold::controller::{ProviderController, SnapshotSource, DEFAULT_SYNC_DAYS};
use healthfold::encoder::MetricsEncoder;
use healthfold::history::MetricsHistory;
use healthfold::trends::{
    build_trend, TrendGrouping, TrendMetric, TrendQuery, TrendRange, DEFAULT_WEIGHT_KG,
};
use healthfold::types::{DataSource, WeightSample};
use healthfold::{AggregationConfig, Aggregator, HEALTHFOLD_VERSION, PRODUCER_NAME};

/// healthfold - Daily health metrics from Apple Health and Health Connect
#[derive(Parser)]
#[command(name = "healthfold")]
#[command(author = "Synheart AI Inc")]
#[command(version = HEALTHFOLD_VERSION)]
#[command(about = "Aggregate health provider exports into daily metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a provider export into daily metrics
    Aggregate {
        /// Provider the export came from
        #[arg(long, value_enum)]
        provider: Provider,

        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Window size; the output covers days + 1 calendar days (at most 3650)
        #[arg(long, default_value_t = DEFAULT_SYNC_DAYS)]
        days: u32,

        /// Last day of the window (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,

        /// Aggregation config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Merge the computed days into this history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Write the export's weight readings to this file (for `trend --weights`)
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Pretty-print the output
        #[arg(long)]
        pretty: bool,
    },

    /// Build a chart series from a saved day history
    Trend {
        /// History file written by `aggregate --history`
        #[arg(short, long)]
        input: PathBuf,

        /// Metric to chart
        #[arg(long, value_enum)]
        metric: Metric,

        /// Lookback window
        #[arg(long, value_enum, default_value = "7d")]
        range: Range,

        /// Point spacing
        #[arg(long, value_enum, default_value = "daily")]
        group: Group,

        /// Weight readings (JSON array) for the weight metric
        #[arg(long)]
        weights: Option<PathBuf>,

        /// Weight assumed before the first reading (kg)
        #[arg(long, default_value_t = DEFAULT_WEIGHT_KG)]
        fallback_weight: f64,

        /// Last day of the series (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// Diagnose configuration and stored state
    Doctor {
        /// Check aggregation config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check history file
        #[arg(long)]
        history: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Provider {
    /// Apple Health export
    Apple,
    /// Android Health Connect export
    HealthConnect,
}

impl From<Provider> for DataSource {
    fn from(p: Provider) -> Self {
        match p {
            Provider::Apple => DataSource::Apple,
            Provider::HealthConnect => DataSource::Google,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Steps,
    Active,
    Sleep,
    Heart,
    Calories,
    Weight,
}

impl From<Metric> for TrendMetric {
    fn from(m: Metric) -> Self {
        match m {
            Metric::Steps => TrendMetric::Steps,
            Metric::Active => TrendMetric::Active,
            Metric::Sleep => TrendMetric::Sleep,
            Metric::Heart => TrendMetric::Heart,
            Metric::Calories => TrendMetric::Calories,
            Metric::Weight => TrendMetric::Weight,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Range {
    #[value(name = "7d")]
    Week,
    #[value(name = "30d")]
    Month,
    #[value(name = "90d")]
    Quarter,
}

impl From<Range> for TrendRange {
    fn from(r: Range) -> Self {
        match r {
            Range::Week => TrendRange::Week,
            Range::Month => TrendRange::Month,
            Range::Quarter => TrendRange::Quarter,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Group {
    Daily,
    Weekly,
}

impl From<Group> for TrendGrouping {
    fn from(g: Group) -> Self {
        match g {
            Group::Daily => TrendGrouping::Daily,
            Group::Weekly => TrendGrouping::Weekly,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| error.message.clone())
            );
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr, filtered by `HEALTHFOLD_LOG` (or `RUST_LOG`, default `info`)
fn init_tracing() {
    let log_env = std::env::var("HEALTHFOLD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn run(cli: Cli) -> Result<(), HealthfoldCliError> {
    match cli.command {
        Commands::Aggregate {
            provider,
            input,
            output,
            days,
            today,
            config,
            history,
            weights,
            pretty,
        } => cmd_aggregate(
            provider.into(),
            &input,
            &output,
            days,
            today,
            config.as_deref(),
            history.as_deref(),
            weights.as_deref(),
            pretty,
        ),
        Commands::Trend {
            input,
            metric,
            range,
            group,
            weights,
            fallback_weight,
            today,
        } => {
            let query = TrendQuery {
                metric: metric.into(),
                range: range.into(),
                grouping: group.into(),
                fallback_weight_kg: fallback_weight,
            };
            cmd_trend(&input, &query, weights.as_deref(), today)
        }
        Commands::Doctor {
            config,
            history,
            json,
        } => cmd_doctor(config.as_deref(), history.as_deref(), json),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_aggregate(
    provider: DataSource,
    input: &Path,
    output: &Path,
    days: u32,
    today: Option<NaiveDate>,
    config: Option<&Path>,
    history: Option<&Path>,
    weights: Option<&Path>,
    pretty: bool,
) -> Result<(), HealthfoldCliError> {
    let config = match config {
        Some(path) => AggregationConfig::from_file(path)?,
        None => AggregationConfig::default(),
    };
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let raw = read_input(input)?;
    let source = SnapshotSource::from_json(provider, &raw)?;
    let mut controller = ProviderController::with_aggregator(source, Aggregator::new(config));
    let outcome = controller.sync_ending(today, days)?;

    if let Some(history_path) = history {
        let mut stored = if history_path.exists() {
            MetricsHistory::from_json(&fs::read_to_string(history_path)?)?
        } else {
            MetricsHistory::new()
        };
        stored.merge(outcome.days.clone());
        fs::write(history_path, stored.to_json()?)?;
    }

    if let Some(weights_path) = weights {
        fs::write(weights_path, serde_json::to_string(&outcome.weights)?)?;
    }

    let payload = MetricsEncoder::new().encode(outcome.provider, &outcome.days);
    let output_data = if pretty {
        serde_json::to_string_pretty(&payload)?
    } else {
        serde_json::to_string(&payload)?
    };
    write_output(output, &output_data)
}

fn cmd_trend(
    input: &Path,
    query: &TrendQuery,
    weights: Option<&Path>,
    today: Option<NaiveDate>,
) -> Result<(), HealthfoldCliError> {
    let history = MetricsHistory::from_json(&read_input(input)?)?;
    let weights: Vec<WeightSample> = match weights {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => Vec::new(),
    };
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let days: Vec<_> = history.iter().cloned().collect();
    let report = build_trend(&days, &weights, query, today);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    history: Option<&Path>,
    json: bool,
) -> Result<(), HealthfoldCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "healthfold_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("healthfold version {}", HEALTHFOLD_VERSION),
    });

    if let Some(config_path) = config {
        checks.push(match AggregationConfig::from_file(config_path) {
            Ok(cfg) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Config valid (series target {}, resting percentile {})",
                    cfg.series_target, cfg.resting_percentile
                ),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    if let Some(history_path) = history {
        let check = if !history_path.exists() {
            DoctorCheck {
                name: "history".to_string(),
                status: CheckStatus::Warning,
                message: "History file does not exist".to_string(),
            }
        } else {
            match fs::read_to_string(history_path)
                .map_err(healthfold::MetricsError::from)
                .and_then(|raw| MetricsHistory::from_json(&raw))
            {
                Ok(stored) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Ok,
                    message: match stored.latest() {
                        Some(latest) => format!(
                            "History valid ({} days, latest {})",
                            stored.len(),
                            latest.date
                        ),
                        None => "History valid (empty)".to_string(),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "history".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid history file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Check stdin is available (for `--input -`)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (ready for --input -)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: HEALTHFOLD_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("healthfold Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(HealthfoldCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn read_input(input: &Path) -> Result<String, HealthfoldCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), HealthfoldCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error handling

#[derive(Debug)]
enum HealthfoldCliError {
    Io(io::Error),
    Metrics(healthfold::MetricsError),
    Json(serde_json::Error),
    DoctorFailed,
}

impl From<io::Error> for HealthfoldCliError {
    fn from(e: io::Error) -> Self {
        HealthfoldCliError::Io(e)
    }
}

impl From<healthfold::MetricsError> for HealthfoldCliError {
    fn from(e: healthfold::MetricsError) -> Self {
        HealthfoldCliError::Metrics(e)
    }
}

impl From<serde_json::Error> for HealthfoldCliError {
    fn from(e: serde_json::Error) -> Self {
        HealthfoldCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HealthfoldCliError> for CliError {
    fn from(e: HealthfoldCliError) -> Self {
        use healthfold::MetricsError;

        match e {
            HealthfoldCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HealthfoldCliError::Metrics(MetricsError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Check --days, or run 'healthfold doctor --config FILE'".to_string()),
            },
            HealthfoldCliError::Metrics(MetricsError::Source(e)) => CliError {
                code: "SOURCE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check provider permissions and retry".to_string()),
            },
            HealthfoldCliError::Metrics(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the selected provider's export format".to_string()),
            },
            HealthfoldCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HealthfoldCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
