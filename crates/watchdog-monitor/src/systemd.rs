//! systemd unit state source.
//!
//! The unit boundary is a read-only data source: per unit, a coarse
//! active-state/sub-state pair and optional activation/deactivation
//! timestamps in monotonic microseconds since boot. The production
//! implementation shells out to `systemctl` (`list-units --output=json` for
//! states, `show` for the timestamp properties) and reads `/proc/uptime`
//! for the matching "now"; tests substitute a fake [`UnitSource`].

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;

/// Errors from the unit state source. The scan loop never aborts on these;
/// it faults the watched units instead (the next scan is the retry).
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to run systemctl: {0}")]
    Io(#[from] std::io::Error),

    #[error("systemctl exited with {status}: {stderr}")]
    Command { status: i32, stderr: String },

    #[error("could not parse systemctl output: {0}")]
    Parse(String),
}

/// Observed state of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitState {
    pub name: String,
    pub active_state: String,
    pub sub_state: String,
    /// When the unit last entered the active state, in monotonic
    /// microseconds since boot. Absent if it never has.
    pub active_enter_us: Option<u64>,
    /// When the unit last left the active state. Absent if it never has.
    pub active_exit_us: Option<u64>,
}

/// One query result: the monotonic clock the timestamps are measured
/// against, plus the watched units that were observed.
#[derive(Debug, Clone)]
pub struct UnitSnapshot {
    /// Monotonic microseconds since boot at query time.
    pub now_us: u64,
    pub units: Vec<UnitState>,
}

#[async_trait]
pub trait UnitSource: Send + Sync {
    /// Observe the named units. Units absent from the result were not known
    /// to the init system at query time.
    async fn query(&self, names: &[String]) -> Result<UnitSnapshot, SourceError>;
}

/// `systemctl`-backed unit source.
pub struct SystemctlSource;

#[derive(Debug, Deserialize)]
struct ListedUnit {
    unit: String,
    active: String,
    sub: String,
}

#[async_trait]
impl UnitSource for SystemctlSource {
    async fn query(&self, names: &[String]) -> Result<UnitSnapshot, SourceError> {
        let now_us = uptime_us()?;
        let output = Command::new("systemctl")
            .args(["list-units", "--all", "--no-pager", "--output=json"])
            .args(names)
            .output()
            .await?;
        if !output.status.success() {
            return Err(SourceError::Command {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        let listed: Vec<ListedUnit> = serde_json::from_slice(&output.stdout)
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        let mut units = Vec::with_capacity(listed.len());
        for unit in listed {
            let (enter, exit) = self.query_timestamps(&unit.unit).await?;
            units.push(UnitState {
                name: unit.unit,
                active_state: unit.active,
                sub_state: unit.sub,
                active_enter_us: enter,
                active_exit_us: exit,
            });
        }
        Ok(UnitSnapshot { now_us, units })
    }
}

impl SystemctlSource {
    async fn query_timestamps(
        &self,
        unit: &str,
    ) -> Result<(Option<u64>, Option<u64>), SourceError> {
        let output = Command::new("systemctl")
            .args([
                "show",
                unit,
                "--no-pager",
                "--property=ActiveEnterTimestampMonotonic",
                "--property=ActiveExitTimestampMonotonic",
            ])
            .output()
            .await?;
        if !output.status.success() {
            return Err(SourceError::Command {
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok((
            parse_show_timestamp(&text, "ActiveEnterTimestampMonotonic"),
            parse_show_timestamp(&text, "ActiveExitTimestampMonotonic"),
        ))
    }
}

/// Extract a monotonic timestamp property from `systemctl show` key=value
/// output. systemd reports 0 for "never"; that maps to `None`.
fn parse_show_timestamp(text: &str, property: &str) -> Option<u64> {
    text.lines()
        .find_map(|line| line.strip_prefix(property)?.strip_prefix('='))
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|&us| us != 0)
}

/// Monotonic microseconds since boot, from `/proc/uptime`.
pub fn uptime_us() -> std::io::Result<u64> {
    let text = std::fs::read_to_string("/proc/uptime")?;
    parse_uptime_us(&text).ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, "malformed /proc/uptime")
    })
}

fn parse_uptime_us(text: &str) -> Option<u64> {
    let seconds: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some((seconds * 1_000_000.0) as u64)
}
