//! Watchdog protocol operations.
//!
//! Each operation signs its primary target (a full name for kick/fault, a
//! prefix for the administrative operations) and issues one pass through the
//! endpoint pool. Calls block until a replica answers or the list is
//! exhausted; there are no retries beyond that single pass.

use async_trait::async_trait;

use crate::error::{Result, WatchdogError};
use crate::sign::sign;
use crate::status::{parse_status_body, StatusRow};
use crate::token::SecretToken;
use crate::transport::{EndpointPool, ServiceResponse};

/// Length of the key returned by the auth operation.
const AUTH_KEY_LEN: usize = 64;

/// Default TTL requested by the administrative kick command, in seconds.
pub const DEFAULT_KICK_TTL: u64 = 300;

/// Liveness reporting surface, implemented by [`WatchdogClient`] and by test
/// fakes. The scan engines depend on this trait rather than the concrete
/// client.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Renew liveness of `name`, extending its expiry by `ttl_seconds`.
    async fn kick(&self, name: &str, ttl_seconds: u64) -> Result<()>;

    /// Report `name` as failed with a human-readable reason.
    async fn fault(&self, name: &str, reason: &str) -> Result<()>;
}

/// Client for the remote watchdog service: the resolved shared secret plus
/// the replica pool, passed explicitly rather than held as process globals.
#[derive(Debug)]
pub struct WatchdogClient {
    token: SecretToken,
    pool: EndpointPool,
}

impl WatchdogClient {
    pub fn new(token: SecretToken, pool: EndpointPool) -> Self {
        WatchdogClient { token, pool }
    }

    /// Resolve credentials and endpoints from the environment. Fails fast,
    /// before any network activity, when no token can be found.
    pub fn from_env() -> Result<Self> {
        Ok(WatchdogClient {
            token: SecretToken::resolve()?,
            pool: EndpointPool::from_env()?,
        })
    }

    async fn signed_get(
        &self,
        verb: &str,
        target: &str,
        mut query: Vec<(&'static str, String)>,
    ) -> Result<ServiceResponse> {
        let tag = sign(&self.token, target)?;
        query.push(("hmac", tag));
        self.pool.get(&format!("/{verb}/{target}"), &query).await
    }

    /// Fire-and-check contract shared by kick, fault, retire and clear:
    /// 200 means done, anything else surfaces the body text.
    async fn signed_ack(
        &self,
        verb: &str,
        target: &str,
        query: Vec<(&'static str, String)>,
    ) -> Result<()> {
        let response = self.signed_get(verb, target, query).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(response.into_service_error())
        }
    }

    /// Renew liveness of a full watchdog name.
    pub async fn kick(&self, name: &str, ttl_seconds: u64) -> Result<()> {
        self.signed_ack("kick", name, vec![("timeout", ttl_seconds.to_string())])
            .await
    }

    /// Report a watchdog as failed. The reason is free text; it is
    /// URL-escaped on the way out.
    pub async fn fault(&self, name: &str, reason: &str) -> Result<()> {
        self.signed_ack("fault", name, vec![("reason", reason.to_string())])
            .await
    }

    /// Request a new namespace authentication key for a prefix. The first 64
    /// characters of the response body are the key.
    pub async fn auth(&self, prefix: &str) -> Result<String> {
        let response = self.signed_get("auth", prefix, Vec::new()).await?;
        if !response.is_success() {
            return Err(response.into_service_error());
        }
        match response.body.get(..AUTH_KEY_LEN) {
            Some(key) => Ok(key.to_string()),
            None => Err(WatchdogError::parse(format!(
                "auth response does not start with a {AUTH_KEY_LEN}-character key ({} bytes)",
                response.body.len()
            ))),
        }
    }

    /// List the watchdogs under a prefix.
    pub async fn status(&self, prefix: &str) -> Result<Vec<StatusRow>> {
        let response = self
            .signed_get("status", prefix, vec![("header", "0".to_string())])
            .await?;
        if !response.is_success() {
            return Err(response.into_service_error());
        }
        parse_status_body(&response.body)
    }

    /// Retire every watchdog under a prefix.
    pub async fn retire(&self, prefix: &str) -> Result<()> {
        self.signed_ack("retire", prefix, Vec::new()).await
    }

    /// Clear the cumulative downtime recorded under a prefix.
    pub async fn clear(&self, prefix: &str) -> Result<()> {
        self.signed_ack("clear", prefix, Vec::new()).await
    }
}

#[async_trait]
impl Reporter for WatchdogClient {
    async fn kick(&self, name: &str, ttl_seconds: u64) -> Result<()> {
        WatchdogClient::kick(self, name, ttl_seconds).await
    }

    async fn fault(&self, name: &str, reason: &str) -> Result<()> {
        WatchdogClient::fault(self, name, reason).await
    }
}

#[async_trait]
impl<R: Reporter + ?Sized> Reporter for std::sync::Arc<R> {
    async fn kick(&self, name: &str, ttl_seconds: u64) -> Result<()> {
        (**self).kick(name, ttl_seconds).await
    }

    async fn fault(&self, name: &str, reason: &str) -> Result<()> {
        (**self).fault(name, reason).await
    }
}
