//! Dedup / report engine.
//!
//! Polling runs frequently for responsiveness; the network-facing report
//! cadence stays coarse. The engine keeps one action record per target (the
//! last transmitted report and when it was sent) and suppresses a new report
//! unless the determination changed or the report interval elapsed. A kick
//! requests a TTL of twice the interval, so one missed cycle does not expire
//! the watchdog server-side but two consecutive missed cycles will.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use watchdog_client::Reporter;

/// Health determination produced by a scan for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Faulted(String),
}

/// The last report transmitted for a target.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Report {
    Kicked,
    Faulted(String),
}

struct Action {
    at: Instant,
    report: Report,
}

/// Per-target report deduplication over a [`Reporter`].
///
/// The action map lives only in memory; a process restart re-reports every
/// target's current state once.
pub struct ReportEngine<R> {
    reporter: R,
    interval: Duration,
    ttl_seconds: u64,
    last: HashMap<String, Action>,
}

impl<R: Reporter> ReportEngine<R> {
    pub fn new(reporter: R, interval: Duration) -> Self {
        ReportEngine {
            reporter,
            interval,
            ttl_seconds: interval.as_secs() * 2,
            last: HashMap::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// TTL requested by kicks, in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Feed one determination for `target`, sending a kick or fault when the
    /// dedup policy calls for it. A failed send is logged and still recorded:
    /// the next elapsed interval is the retry mechanism.
    pub async fn observe(&mut self, target: &str, health: Health) {
        let report = match health {
            Health::Healthy => Report::Kicked,
            Health::Faulted(reason) => Report::Faulted(reason),
        };
        if !self.needs_report(target, &report) {
            return;
        }
        let result = match &report {
            Report::Kicked => self.reporter.kick(target, self.ttl_seconds).await,
            Report::Faulted(reason) => self.reporter.fault(target, reason).await,
        };
        if let Err(e) = result {
            tracing::warn!(watchdog = target, error = %e, "watchdog report failed");
        }
        self.last.insert(
            target.to_string(),
            Action {
                at: Instant::now(),
                report,
            },
        );
    }

    fn needs_report(&self, target: &str, report: &Report) -> bool {
        match self.last.get(target) {
            None => true,
            Some(prev) => prev.report != *report || prev.at.elapsed() > self.interval,
        }
    }
}
