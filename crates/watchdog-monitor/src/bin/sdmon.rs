//! sdmon: maintain watchdogs for systemd units.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchdog_client::WatchdogClient;
use watchdog_monitor::engine::ReportEngine;
use watchdog_monitor::systemd::SystemctlSource;
use watchdog_monitor::units::UnitMonitor;

#[derive(Parser, Debug)]
#[command(name = "sdmon")]
#[command(about = "Maintain systemd watchdogs")]
#[command(version)]
struct Cli {
    /// Seconds between scans
    #[arg(long, default_value_t = 120)]
    interval: u64,

    /// Seconds a unit must be continuously active before it counts as healthy
    #[arg(long, default_value_t = 300)]
    holdoff: u64,

    /// Unit to watch, as name[:display]; ".service" is appended when the
    /// name carries no suffix. Repeatable.
    #[arg(long = "unit", value_name = "NAME[:DISPLAY]")]
    units: Vec<String>,

    /// Watchdog name prefix; defaults to the local hostname
    #[arg(long, env = "WD_PREFIX")]
    prefix: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    if cli.units.is_empty() {
        anyhow::bail!("at least one --unit is required");
    }
    let prefix = match cli.prefix {
        Some(prefix) => prefix,
        None => watchdog_monitor::default_prefix()?,
    };

    let interval = Duration::from_secs(cli.interval);
    let monitor = UnitMonitor::new(&prefix, Duration::from_secs(cli.holdoff), &cli.units)?;
    let client = WatchdogClient::from_env()?;
    let mut engine = ReportEngine::new(client, interval);
    let source = SystemctlSource;

    tracing::info!(
        prefix = %prefix,
        interval_secs = cli.interval,
        holdoff_secs = cli.holdoff,
        units = ?monitor.unit_names(),
        "starting unit scan loop"
    );
    loop {
        monitor.scan(&source, &mut engine).await;
        tokio::time::sleep(interval).await;
    }
}
