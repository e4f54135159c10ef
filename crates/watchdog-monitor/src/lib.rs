//! Monitoring daemons for the steelcode watchdog service.
//!
//! Two scan loops feed the report engine: `sdmon` watches systemd units and
//! `wdtop` watches host resources (memory, CPU, disk mounts, processes).
//! Each scan derives a HEALTHY or FAULTED-with-reason determination per
//! target and hands it to [`engine::ReportEngine`], which deduplicates
//! repeated identical reports so the outbound request rate stays bounded by
//! the report interval regardless of how often scans run.

pub mod engine;
pub mod resources;
pub mod systemd;
pub mod units;

#[cfg(test)]
pub(crate) mod testing;

use watchdog_client::{ensure_valid, Result};

/// Normalize a watchdog name prefix: ensure a trailing `.` and validate the
/// character set. Configuration errors here are fatal at startup.
pub fn normalize_prefix(prefix: &str) -> Result<String> {
    ensure_valid(prefix)?;
    let mut prefix = prefix.to_string();
    if !prefix.ends_with('.') {
        prefix.push('.');
    }
    Ok(prefix)
}

/// Default prefix derived from the local hostname: lowercased, `-` mapped
/// to `_`, trailing `.` ensured.
pub fn default_prefix() -> Result<String> {
    let host = hostname::get()
        .map_err(|e| watchdog_client::WatchdogError::config(format!("cannot read hostname: {e}")))?;
    let host = host.to_string_lossy().to_lowercase().replace('-', "_");
    normalize_prefix(&host)
}
