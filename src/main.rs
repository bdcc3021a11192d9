use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use machinewatch::config::{LoggingConfig, MonitorConfig};
use machinewatch::scheduler::Monitor;
use machinewatch::sensor::Signal;

#[derive(Parser)]
#[command(
    name = "machinewatch",
    about = "Simulated machine-health monitor with anomaly injection and failure risk scoring",
    version,
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML). Defaults to $MACHINEWATCH_CONFIG, then
    /// /etc/machinewatch/machinewatch.toml, then built-in defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon (tick scheduler + read-only JSON API)
    Serve {
        /// Bind address (overrides api.bind)
        #[arg(long, env = "MACHINEWATCH_BIND")]
        bind: Option<String>,
    },

    /// Run the pipeline for a fixed number of ticks without a timer
    Simulate {
        /// Number of ticks to run
        #[arg(long, default_value = "10")]
        ticks: u64,

        /// RNG seed (overrides scheduler.seed)
        #[arg(long)]
        seed: Option<u64>,

        /// JSON lines output for machine parsing
        #[arg(long)]
        json: bool,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,

    /// Validate the configuration and exit non-zero on error
    Check,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Run `load` under a stderr subscriber so config fallback diagnostics are
/// visible before the configured subscriber exists.
fn with_bootstrap_logging<T>(load: impl FnOnce() -> T) -> T {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::with_default(subscriber, load)
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    with_bootstrap_logging(|| MonitorConfig::load_validated(path))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => {
            let config = load_config(cli.config.as_deref())?;
            init_tracing(&config.logging);
            let bind = bind.unwrap_or_else(|| config.api.bind.clone());
            tracing::info!(%bind, "Starting machinewatch daemon");
            machinewatch::serve(config, &bind).await?;
        }
        Commands::Simulate { ticks, seed, json } => {
            let mut config = load_config(cli.config.as_deref())?;
            init_tracing(&config.logging);
            if seed.is_some() {
                config.scheduler.seed = seed;
            }
            run_simulation(&config, ticks, json)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config =
                    with_bootstrap_logging(|| MonitorConfig::resolve(cli.config.as_deref()))?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigAction::Check => {
                load_config(cli.config.as_deref())?;
                println!("Configuration OK");
            }
        },
    }

    Ok(())
}

fn run_simulation(config: &MonitorConfig, ticks: u64, json: bool) -> Result<()> {
    let mut monitor = Monitor::from_config(config);
    tracing::info!(ticks, seed = ?config.scheduler.seed, "Running simulation");

    if !json {
        let unit = |signal: Signal| format!("[{}]", signal.unit());
        println!(
            "{:>5} | {:<16} | {:>6} | {:>6} | {:>5} | {:>5} | {:>5} | {:>5} | {:<8} | Alerts",
            "Tick",
            "Regime",
            format!("Air{}", unit(Signal::AirTemperature)),
            format!("Prc{}", unit(Signal::ProcessTemperature)),
            unit(Signal::RotationalSpeed),
            unit(Signal::Torque),
            unit(Signal::ToolWear),
            "Risk",
            "Status"
        );
        println!(
            "{:->5}-|-{:-<16}-|-{:->6}-|-{:->6}-|-{:->5}-|-{:->5}-|-{:->5}-|-{:->5}-|-{:-<8}-|-{:-<20}",
            "", "", "", "", "", "", "", "", "", ""
        );
    }

    for _ in 0..ticks {
        let snap = monitor.tick();
        if json {
            let line = serde_json::json!({
                "sequence": snap.sequence,
                "generated_at": snap.generated_at,
                "regime": snap.regime,
                "reading": snap.reading,
                "risk": snap.risk,
                "notifications": snap.notifications,
            });
            println!("{}", serde_json::to_string(&line)?);
            continue;
        }

        let r = &snap.reading;
        let alerts: Vec<String> = snap
            .notifications
            .iter()
            .map(|n| format!("[{}] {}", n.severity, n.title))
            .collect();
        println!(
            "{:>5} | {:<16} | {:>6.1} | {:>6.1} | {:>5.0} | {:>5.1} | {:>5.1} | {:>5.2} | {:<8} | {}",
            snap.sequence,
            snap.regime.map(|g| g.label()).unwrap_or("-"),
            r.air_temperature,
            r.process_temperature,
            r.rotational_speed,
            r.torque,
            r.tool_wear,
            snap.risk.probability,
            snap.risk.status.as_str(),
            alerts.join("; ")
        );
    }

    Ok(())
}
