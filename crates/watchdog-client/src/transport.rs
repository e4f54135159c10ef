//! Endpoint failover transport.
//!
//! The watchdog service runs as a set of interchangeable replicas. A request
//! tries each endpoint in order: network-level failures (timeout, refused
//! connection, DNS) are logged and skipped, but the first replica to answer
//! is authoritative. Its response is returned even when the status is an
//! error, and later replicas are never consulted. Only when every endpoint
//! fails at the network level does the call fail with `NoEndpoints`.

use std::time::Duration;

use crate::error::{Result, WatchdogError};

/// Production replica list, tried in order.
pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "https://wd-a.steelcode.com",
    "https://wd-b.steelcode.com",
    "https://wd-c.steelcode.com",
];

/// Environment variable overriding the endpoint list (comma-separated URLs).
pub const ENDPOINTS_ENV_VAR: &str = "WD_ENDPOINTS";

/// Per-endpoint request timeout.
pub const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// An HTTP response from the first replica that answered.
#[derive(Debug, Clone)]
pub struct ServiceResponse {
    pub status: u16,
    pub body: String,
}

impl ServiceResponse {
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Convert a non-200 response into the error surfaced to callers.
    pub fn into_service_error(self) -> WatchdogError {
        WatchdogError::Service {
            status: self.status,
            message: self.body.trim_end().to_string(),
        }
    }
}

/// An ordered, fixed set of service replicas behind one HTTP client.
#[derive(Debug, Clone)]
pub struct EndpointPool {
    endpoints: Vec<String>,
    client: reqwest::Client,
}

impl EndpointPool {
    /// Build a pool over an explicit endpoint list.
    pub fn new(endpoints: Vec<String>) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(WatchdogError::config("endpoint list is empty"));
        }
        let client = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()?;
        Ok(EndpointPool { endpoints, client })
    }

    /// Build a pool from `WD_ENDPOINTS` if set, else the production replicas.
    pub fn from_env() -> Result<Self> {
        match std::env::var(ENDPOINTS_ENV_VAR) {
            Ok(raw) if !raw.trim().is_empty() => Self::new(
                raw.split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            ),
            _ => Self::new(DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Issue `GET {endpoint}{path}?{query}` against each replica in order,
    /// returning the first response. The query pairs must already include
    /// the computed `hmac` tag; values are URL-escaped here.
    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ServiceResponse> {
        for endpoint in &self.endpoints {
            let url = format!("{endpoint}{path}");
            match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    return Ok(ServiceResponse { status, body });
                }
                Err(e) => {
                    tracing::warn!(endpoint = %endpoint, error = %e, "watchdog endpoint unreachable");
                }
            }
        }
        Err(WatchdogError::NoEndpoints)
    }
}
