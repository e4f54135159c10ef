//! wdtop: maintain watchdogs for host resources.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchdog_client::WatchdogClient;
use watchdog_monitor::engine::ReportEngine;
use watchdog_monitor::resources::ResourceMonitor;

#[derive(Parser, Debug)]
#[command(name = "wdtop")]
#[command(about = "Maintain host resource watchdogs")]
#[command(version)]
struct Cli {
    /// Watchdog name prefix
    #[arg(long, env = "WD_PREFIX")]
    prefix: String,

    /// Fault the memory watchdog when available memory drops below this
    #[arg(long, default_value_t = 1000.0, value_name = "MB")]
    min_mem_mb: f64,

    /// Fault the cpu watchdog when aggregate utilization exceeds this
    #[arg(long, default_value_t = 80.0, value_name = "PERCENT")]
    max_cpu_percent: f64,

    /// Filesystem to watch, as dir:name:min_mb. Repeatable.
    #[arg(long = "df", value_name = "DIR:NAME:MIN_MB")]
    disks: Vec<String>,

    /// Process to watch, as exe[:display]. Repeatable.
    #[arg(long = "proc", value_name = "EXE[:DISPLAY]")]
    procs: Vec<String>,

    /// Seconds between scans
    #[arg(long, default_value_t = 120)]
    interval: u64,
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
    let interval = Duration::from_secs(cli.interval);
    let mut monitor = ResourceMonitor::new(
        &cli.prefix,
        cli.min_mem_mb,
        cli.max_cpu_percent,
        &cli.disks,
        &cli.procs,
    )?;
    let client = WatchdogClient::from_env()?;
    let mut engine = ReportEngine::new(client, interval);

    tracing::info!(
        prefix = %cli.prefix,
        interval_secs = cli.interval,
        disks = cli.disks.len(),
        procs = cli.procs.len(),
        "starting resource scan loop"
    );
    loop {
        monitor.scan(&mut engine).await;
        tokio::time::sleep(interval).await;
    }
}
