// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Parkmeter main entry point - CLI and commands.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::Level;

use parkmeter::config::{self, CliOptions, RatePreset, ResolvedConfig, StoreBackend};
use parkmeter::parking::{
    billable_minutes, compute_fee, compute_live_duration, Dashboard, JsonFileStore, MemoryStore,
    ParkedVehicle, ParkingService, ParkingSession, Receipt, SessionId, SessionStore, SqliteStore,
};
use parkmeter::telemetry::{init_telemetry, TelemetryConfig};
use parkmeter::{ConfigError, ParkingError};

/// Parkmeter version string.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parkmeter - parking lot entry, exit, and billing.
#[derive(Parser)]
#[command(name = "parkmeter")]
#[command(author, version, about = "Parking lot entry, exit, and billing", long_about = None)]
struct Cli {
    /// Billing preset
    #[arg(long, value_enum, env = "PARKMETER_PRESET")]
    preset: Option<Preset>,

    /// Billing unit length in minutes (overrides the preset)
    #[arg(long)]
    unit_minutes: Option<u32>,

    /// Price per unit, e.g. 2.50 (overrides the preset)
    #[arg(long)]
    unit_price: Option<f64>,

    /// Session store backend
    #[arg(long, value_enum, env = "PARKMETER_BACKEND")]
    backend: Option<Backend>,

    /// Session file or database path
    #[arg(long, env = "PARKMETER_STORE")]
    store: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    output_format: OutputFormat,

    /// Print operation metrics to stderr on exit
    #[arg(long)]
    metrics: bool,

    /// Show debug output
    #[arg(long)]
    debug: bool,

    /// Show trace output
    #[arg(long)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Billing presets.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// $5.00 per started hour
    Hourly,
    /// $0.50 per started half hour
    HalfHour,
}

impl From<Preset> for RatePreset {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Hourly => RatePreset::Hourly,
            Preset::HalfHour => RatePreset::HalfHour,
        }
    }
}

/// Session store backends.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Json,
    Sqlite,
    Memory,
}

impl From<Backend> for StoreBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Json => StoreBackend::Json,
            Backend::Sqlite => StoreBackend::Sqlite,
            Backend::Memory => StoreBackend::Memory,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Subcommands for parkmeter.
#[derive(Subcommand)]
enum Commands {
    /// Log a vehicle entering the lot
    Enter {
        /// Plate number (case-insensitive)
        plate: String,
    },

    /// Log a vehicle leaving and print its receipt
    Exit {
        plate: String,
    },

    /// Exit a specific session by id
    ExitId {
        id: String,
    },

    /// Show a parked vehicle with its running fee
    Search {
        plate: String,
    },

    /// Show the lot dashboard
    Status,

    /// List completed sessions, most recent first
    History {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Price a stay without recording it
    Quote {
        /// Entry time (RFC 3339)
        #[arg(long)]
        entry: String,
        /// Exit time (RFC 3339, defaults to now)
        #[arg(long)]
        exit: Option<String>,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// Initialize a new configuration file
    Init,

    /// Show version information
    Version,
}

/// Config subcommand actions.
#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = if cli.trace {
        TelemetryConfig::development().with_level(Level::TRACE)
    } else if cli.debug {
        TelemetryConfig::development()
    } else {
        TelemetryConfig::default()
    };
    let _guard = match init_telemetry(&telemetry.with_metrics_report(cli.metrics)) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", "warning:".yellow(), e);
            None
        }
    };

    let format = cli.output_format;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report_error(&err, format),
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.output_format;
    let cli_options = CliOptions {
        preset: cli.preset.map(Into::into),
        unit_minutes: cli.unit_minutes,
        unit_price: cli.unit_price,
        backend: cli.backend.map(Into::into),
        store_path: cli.store,
    };

    let cwd = std::env::current_dir()?;
    let workspace_root = config::find_workspace_root(&cwd).unwrap_or(cwd);

    match cli.command {
        Commands::Init => {
            let path = config::init_config(&workspace_root, None)?;
            println!("Created config file: {}", path.display());
            return Ok(());
        }
        Commands::Version => {
            println!("parkmeter {}", VERSION);
            return Ok(());
        }
        _ => {}
    }

    let config = config::load_config(&workspace_root, cli_options)?;
    let currency = config.currency_symbol.as_str();
    let service = || build_service(&config);

    match cli.command {
        Commands::Init | Commands::Version => {}
        Commands::Config { action } => match action {
            Some(ConfigAction::Show) | None => {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        },
        Commands::Quote { entry, exit } => {
            let entry = parse_timestamp(&entry)?;
            let exit = exit.as_deref().map(parse_timestamp).transpose()?.unwrap_or_else(Utc::now);
            if exit < entry {
                return Err(ParkingError::validation("exit time is before entry time").into());
            }
            let rate = config.rate()?;
            let minutes = billable_minutes(entry, exit);
            let fee = compute_fee(entry, exit, &rate);
            let duration = compute_live_duration(entry, exit);
            match format {
                OutputFormat::Json => {
                    let quote = serde_json::json!({
                        "entryTime": entry,
                        "exitTime": exit,
                        "billableMinutes": minutes,
                        "duration": duration,
                        "fee": fee,
                        "rate": rate,
                    });
                    println!("{}", serde_json::to_string_pretty(&quote)?);
                }
                OutputFormat::Text => {
                    println!("Duration: {} ({} billable minutes)", duration, minutes);
                    println!("Rate:     {}", rate.describe(currency));
                    println!("Fee:      {}", fee.format_with(currency).bright_green().bold());
                }
            }
        }
        Commands::Enter { plate } => {
            let session = service()?.enter(&plate).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&session)?),
                OutputFormat::Text => println!(
                    "{} {} entered at {}",
                    "✓".green(),
                    session.plate_number().as_str().bright_white().bold(),
                    session.entry_time().format("%Y-%m-%d %H:%M:%S UTC")
                ),
            }
        }
        Commands::Exit { plate } => {
            let receipt = service()?.exit(&plate).await?;
            print_receipt(&receipt, format, currency)?;
        }
        Commands::ExitId { id } => {
            let receipt = service()?.exit_session(&SessionId::from(id)).await?;
            print_receipt(&receipt, format, currency)?;
        }
        Commands::Search { plate } => {
            let parked = service()?.search(&plate).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&parked)?),
                OutputFormat::Text => print_parked(&parked, currency),
            }
        }
        Commands::Status => {
            let dashboard = service()?.dashboard().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dashboard)?),
                OutputFormat::Text => print_dashboard(&dashboard, currency),
            }
        }
        Commands::History { limit } => {
            let sessions = service()?.history(limit).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&sessions)?),
                OutputFormat::Text => {
                    if sessions.is_empty() {
                        println!("{}", "No completed sessions yet".dimmed());
                    }
                    for session in &sessions {
                        print_exit_line(session, currency);
                    }
                }
            }
        }
    }
    Ok(())
}

fn build_service(config: &ResolvedConfig) -> anyhow::Result<ParkingService> {
    let store: Box<dyn SessionStore> = match config.store_backend {
        StoreBackend::Memory => Box::new(MemoryStore::new()),
        StoreBackend::Json => Box::new(JsonFileStore::new(store_path(config)?)),
        StoreBackend::Sqlite => Box::new(SqliteStore::open_at(&store_path(config)?)?),
    };
    Ok(ParkingService::new(store, config.rate()?).with_recent_exits_limit(config.recent_exits_limit))
}

fn store_path(config: &ResolvedConfig) -> anyhow::Result<PathBuf> {
    config
        .resolved_store_path()
        .ok_or_else(|| anyhow!("could not determine a home directory; pass --store <PATH>"))
}

fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| {
            ParkingError::validation(format!("'{}' is not an RFC 3339 timestamp: {}", raw, e))
                .into()
        })
}

fn print_receipt(receipt: &Receipt, format: OutputFormat, currency: &str) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(receipt)?),
        OutputFormat::Text => println!("{}", receipt.render_text(currency)),
    }
    Ok(())
}

fn print_parked(parked: &ParkedVehicle, currency: &str) {
    println!(
        "{:<12} since {}  {:>8}  {}",
        parked.session.plate_number().as_str().bright_white().bold(),
        parked.session.entry_time().format("%Y-%m-%d %H:%M"),
        parked.duration.to_string(),
        parked.estimated_fee.format_with(currency).yellow()
    );
}

fn print_exit_line(session: &ParkingSession, currency: &str) {
    let exit = session
        .exit_time()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let payment = session
        .payment()
        .map(|p| p.format_with(currency))
        .unwrap_or_default();
    println!(
        "{:<12} exited {}  {}",
        session.plate_number().as_str(),
        exit,
        payment.green()
    );
}

fn print_dashboard(dashboard: &Dashboard, currency: &str) {
    println!("{}", "Parking Dashboard".bright_blue().bold());
    println!("Rate:            {}", dashboard.rate.describe(currency));
    println!("Currently parked: {}", dashboard.stats.currently_parked.to_string().bright_white());
    println!("Completed:        {}", dashboard.stats.completed);
    println!(
        "Total revenue:    {}",
        dashboard.stats.total_revenue.format_with(currency).bright_green()
    );

    println!("\n{}", "## Parked vehicles".bright_cyan());
    if dashboard.parked.is_empty() {
        println!("{}", "No vehicles parked".dimmed());
    }
    for parked in &dashboard.parked {
        print_parked(parked, currency);
    }

    println!("\n{}", "## Recent exits".bright_cyan());
    if dashboard.recent_exits.is_empty() {
        println!("{}", "No exits yet".dimmed());
    }
    for session in &dashboard.recent_exits {
        print_exit_line(session, currency);
    }
}

/// Print an error for the operator and pick the exit code.
///
/// 1: the input or lot state was rejected. 2: the store or config is unusable.
fn report_error(err: &anyhow::Error, format: OutputFormat) -> ExitCode {
    let (message, code) = match err.downcast_ref::<ParkingError>() {
        Some(e) if e.is_user_correctable() => (e.to_string(), 1),
        Some(e @ ParkingError::CorruptStore(_)) => (
            format!("{}. The store file was left untouched; repair or move it aside.", e),
            2,
        ),
        Some(e) => (e.to_string(), 2),
        None => match err.downcast_ref::<ConfigError>() {
            Some(e) => (format!("Configuration error: {}", e), 2),
            None => (format!("{:#}", err), 2),
        },
    };

    match format {
        OutputFormat::Json => {
            let response = serde_json::json!({ "success": false, "error": message });
            println!("{}", response);
        }
        OutputFormat::Text => eprintln!("{} {}", "error:".red().bold(), message),
    }
    ExitCode::from(code)
}
