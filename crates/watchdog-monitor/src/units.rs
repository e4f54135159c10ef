//! Unit scan policy.
//!
//! Each watched unit maps to one watchdog target `{prefix}sd.{display}`. A
//! unit counts as healthy only when its sub-state is `running` and it has
//! been continuously active longer than the holdoff; a unit that entered
//! `running` too recently is faulted with its activation time so restart
//! flapping shows up server-side instead of being masked by a kick.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;

use watchdog_client::{ensure_valid, Reporter, Result};

use crate::engine::{Health, ReportEngine};
use crate::normalize_prefix;
use crate::systemd::{UnitSource, UnitState};

/// Fault reason for a unit the init system did not report at all.
pub const REASON_NOT_OBSERVED: &str = "not observed";
/// Fault reason when the unit source itself cannot be queried.
pub const REASON_NO_STATS: &str = "unable to obtain stats";

#[derive(Debug)]
struct UnitWatch {
    unit: String,
    display: String,
}

/// Scan policy over a set of watched systemd units.
#[derive(Debug)]
pub struct UnitMonitor {
    prefix: String,
    holdoff: Duration,
    watches: Vec<UnitWatch>,
}

impl UnitMonitor {
    /// Build a monitor from `name[:display]` unit specs. A unit name with no
    /// dot-suffix gets `.service` appended; the display name defaults to the
    /// spec name. Invalid prefixes or display names are configuration
    /// errors, fatal at startup.
    pub fn new(prefix: &str, holdoff: Duration, specs: &[String]) -> Result<Self> {
        let prefix = normalize_prefix(prefix)?;
        let mut watches = Vec::with_capacity(specs.len());
        for spec in specs {
            let (name, display) = match spec.split_once(':') {
                Some((name, display)) => (name.to_string(), display.to_string()),
                None => (spec.clone(), spec.clone()),
            };
            let unit = if name.contains('.') {
                name
            } else {
                format!("{name}.service")
            };
            ensure_valid(&display)?;
            watches.push(UnitWatch { unit, display });
        }
        Ok(UnitMonitor {
            prefix,
            holdoff,
            watches,
        })
    }

    /// The systemd unit names this monitor queries.
    pub fn unit_names(&self) -> Vec<String> {
        self.watches.iter().map(|w| w.unit.clone()).collect()
    }

    fn target(&self, watch: &UnitWatch) -> String {
        format!("{}sd.{}", self.prefix, watch.display)
    }

    /// Run one scan: query the unit source and feed a determination for
    /// every watched unit to the engine. Source failure faults all units
    /// rather than aborting the scan.
    pub async fn scan<S: UnitSource, R: Reporter>(
        &self,
        source: &S,
        engine: &mut ReportEngine<R>,
    ) {
        let snapshot = match source.query(&self.unit_names()).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "unit source query failed");
                for watch in &self.watches {
                    engine
                        .observe(&self.target(watch), Health::Faulted(REASON_NO_STATS.to_string()))
                        .await;
                }
                return;
            }
        };

        let observed: HashMap<&str, &UnitState> = snapshot
            .units
            .iter()
            .map(|u| (u.name.as_str(), u))
            .collect();
        for watch in &self.watches {
            let health = match observed.get(watch.unit.as_str()) {
                Some(unit) => determine(unit, snapshot.now_us, self.holdoff),
                None => Health::Faulted(REASON_NOT_OBSERVED.to_string()),
            };
            engine.observe(&self.target(watch), health).await;
        }
    }
}

/// Translate one observed unit state into a health determination.
fn determine(unit: &UnitState, now_us: u64, holdoff: Duration) -> Health {
    if unit.sub_state == "running" {
        match unit.active_enter_us {
            Some(enter_us) => {
                let uptime = Duration::from_micros(now_us.saturating_sub(enter_us));
                if uptime > holdoff {
                    Health::Healthy
                } else {
                    Health::Faulted(format!("only up since {}", wall_time_ago(uptime)))
                }
            }
            None => Health::Faulted("running, but uptime unknown".to_string()),
        }
    } else {
        let state = format!("{}.{}", unit.active_state, unit.sub_state);
        match unit.active_exit_us {
            Some(exit_us) => {
                let age = Duration::from_micros(now_us.saturating_sub(exit_us));
                Health::Faulted(format!("{state} since {}", wall_time_ago(age)))
            }
            None => Health::Faulted(state),
        }
    }
}

/// Wall-clock rendering of an event `age` in the past.
fn wall_time_ago(age: Duration) -> String {
    let when = Utc::now() - chrono::Duration::microseconds(age.as_micros() as i64);
    when.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systemd::{SourceError, UnitSnapshot};
    use crate::testing::{Call, RecordingReporter};
    use async_trait::async_trait;
    use std::sync::Arc;

    const HOLDOFF: Duration = Duration::from_secs(300);
    const NOW_US: u64 = 1_000_000_000; // 1000 s after boot

    struct FakeSource {
        snapshot: std::result::Result<UnitSnapshot, SourceError>,
    }

    #[async_trait]
    impl UnitSource for FakeSource {
        async fn query(&self, _names: &[String]) -> std::result::Result<UnitSnapshot, SourceError> {
            match &self.snapshot {
                Ok(snapshot) => Ok(snapshot.clone()),
                Err(_) => Err(SourceError::Parse("fake failure".to_string())),
            }
        }
    }

    fn running(name: &str, enter_us: Option<u64>) -> UnitState {
        UnitState {
            name: name.to_string(),
            active_state: "active".to_string(),
            sub_state: "running".to_string(),
            active_enter_us: enter_us,
            active_exit_us: None,
        }
    }

    fn monitor(specs: &[&str]) -> UnitMonitor {
        let specs: Vec<String> = specs.iter().map(|s| s.to_string()).collect();
        UnitMonitor::new("myhost", HOLDOFF, &specs).unwrap()
    }

    async fn scan_with(
        monitor: &UnitMonitor,
        units: Vec<UnitState>,
    ) -> Vec<Call> {
        let reporter = Arc::new(RecordingReporter::new());
        let mut engine = ReportEngine::new(Arc::clone(&reporter), Duration::from_secs(120));
        let source = FakeSource {
            snapshot: Ok(UnitSnapshot {
                now_us: NOW_US,
                units,
            }),
        };
        monitor.scan(&source, &mut engine).await;
        reporter.calls()
    }

    #[test]
    fn test_unit_specs() {
        let monitor = monitor(&["etcd", "postgres:db", "watch.timer"]);
        assert_eq!(
            monitor.unit_names(),
            vec!["etcd.service", "postgres.service", "watch.timer"]
        );
    }

    #[test]
    fn test_invalid_display_name_rejected() {
        let err = UnitMonitor::new(
            "myhost",
            HOLDOFF,
            &["etcd:Bad-Display".to_string()],
        )
        .unwrap_err();
        assert!(err.is_config_error());
    }

    #[tokio::test]
    async fn test_long_running_unit_is_kicked() {
        let monitor = monitor(&["etcd"]);
        // Entered active 900 s ago, well past the 300 s holdoff.
        let calls = scan_with(&monitor, vec![running("etcd.service", Some(100_000_000))]).await;
        assert_eq!(
            calls,
            vec![Call::Kick {
                name: "myhost.sd.etcd".to_string(),
                ttl: 240,
            }]
        );
    }

    #[tokio::test]
    async fn test_recently_started_unit_is_faulted_with_uptime() {
        let monitor = monitor(&["etcd"]);
        // Entered active 10 s ago, inside the holdoff.
        let enter = NOW_US - 10_000_000;
        let calls = scan_with(&monitor, vec![running("etcd.service", Some(enter))]).await;
        match &calls[..] {
            [Call::Fault { name, reason }] => {
                assert_eq!(name, "myhost.sd.etcd");
                assert!(reason.starts_with("only up since "), "reason: {reason}");
            }
            other => panic!("expected one fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_running_without_timestamp_is_faulted() {
        let monitor = monitor(&["etcd"]);
        let calls = scan_with(&monitor, vec![running("etcd.service", None)]).await;
        assert_eq!(
            calls,
            vec![Call::Fault {
                name: "myhost.sd.etcd".to_string(),
                reason: "running, but uptime unknown".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_inactive_unit_reason_names_the_state() {
        let monitor = monitor(&["etcd"]);
        let unit = UnitState {
            name: "etcd.service".to_string(),
            active_state: "failed".to_string(),
            sub_state: "failed".to_string(),
            active_enter_us: Some(100_000_000),
            active_exit_us: None,
        };
        let calls = scan_with(&monitor, vec![unit]).await;
        assert_eq!(
            calls,
            vec![Call::Fault {
                name: "myhost.sd.etcd".to_string(),
                reason: "failed.failed".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_inactive_unit_with_exit_timestamp_cites_it() {
        let monitor = monitor(&["etcd"]);
        let unit = UnitState {
            name: "etcd.service".to_string(),
            active_state: "inactive".to_string(),
            sub_state: "dead".to_string(),
            active_enter_us: None,
            active_exit_us: Some(NOW_US - 60_000_000),
        };
        let calls = scan_with(&monitor, vec![unit]).await;
        match &calls[..] {
            [Call::Fault { reason, .. }] => {
                assert!(reason.starts_with("inactive.dead since "), "reason: {reason}");
            }
            other => panic!("expected one fault, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_absent_unit_is_faulted_not_observed() {
        let monitor = monitor(&["etcd", "postgres:db"]);
        let calls = scan_with(&monitor, vec![running("etcd.service", Some(100_000_000))]).await;
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[1],
            Call::Fault {
                name: "myhost.sd.db".to_string(),
                reason: REASON_NOT_OBSERVED.to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_source_failure_faults_every_unit() {
        let monitor = monitor(&["etcd", "postgres:db"]);
        let reporter = Arc::new(RecordingReporter::new());
        let mut engine = ReportEngine::new(Arc::clone(&reporter), Duration::from_secs(120));
        let source = FakeSource {
            snapshot: Err(SourceError::Parse("boom".to_string())),
        };
        monitor.scan(&source, &mut engine).await;
        let calls = reporter.calls();
        assert_eq!(calls.len(), 2);
        for call in calls {
            match call {
                Call::Fault { reason, .. } => assert_eq!(reason, REASON_NO_STATS),
                other => panic!("expected fault, got {other:?}"),
            }
        }
    }
}
