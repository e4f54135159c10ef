//! Shared test fixtures.

use std::sync::Mutex;

use async_trait::async_trait;

use watchdog_client::{Reporter, Result, WatchdogError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Kick { name: String, ttl: u64 },
    Fault { name: String, reason: String },
}

/// Reporter fake that records every call; optionally fails each send.
pub(crate) struct RecordingReporter {
    calls: Mutex<Vec<Call>>,
    fail: bool,
}

impl RecordingReporter {
    pub(crate) fn new() -> Self {
        RecordingReporter {
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        RecordingReporter {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(WatchdogError::NoEndpoints)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn kick(&self, name: &str, ttl_seconds: u64) -> Result<()> {
        self.record(Call::Kick {
            name: name.to_string(),
            ttl: ttl_seconds,
        })
    }

    async fn fault(&self, name: &str, reason: &str) -> Result<()> {
        self.record(Call::Fault {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    }
}
