//! Error types for the watchdog protocol client.

use thiserror::Error;

/// Errors surfaced by watchdog operations.
#[derive(Error, Debug)]
pub enum WatchdogError {
    /// A target name or prefix does not match `[a-z0-9._]+`.
    #[error("invalid watchdog name {name:?}: names must match [a-z0-9._]+")]
    InvalidName { name: String },

    /// Credential or endpoint configuration is missing or malformed.
    /// Fatal at startup, before any network activity.
    #[error("configuration error: {0}")]
    Config(String),

    /// Every configured endpoint failed at the network level.
    #[error("no endpoints reachable")]
    NoEndpoints,

    /// A reachable endpoint answered with a non-success status. The first
    /// replica to answer is authoritative, so this is final for the call.
    #[error("watchdog service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// A reachable endpoint answered 200 but the body did not match the
    /// response contract.
    #[error("malformed service response: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl WatchdogError {
    pub fn invalid_name(name: impl Into<String>) -> Self {
        WatchdogError::InvalidName { name: name.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        WatchdogError::Config(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        WatchdogError::Parse(msg.into())
    }

    /// True for errors that should abort process startup.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            WatchdogError::Config(_) | WatchdogError::InvalidName { .. }
        )
    }
}

/// Result type alias for watchdog operations.
pub type Result<T> = std::result::Result<T, WatchdogError>;
