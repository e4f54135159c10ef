//! Credential resolution.
//!
//! The shared secret is provisioned as hex text in one of several ordered
//! sources; the first source that exists wins. The text is trimmed and its
//! first 64 hex characters decode to the 32-byte key used by the signer.
//! A source that exists but holds fewer than 64 usable characters (or
//! non-hex content) is a fatal configuration error rather than a fallthrough:
//! a half-provisioned token is a deployment bug worth surfacing.

use std::fs;
use std::path::PathBuf;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, WatchdogError};

/// Environment variable consulted first.
pub const TOKEN_ENV_VAR: &str = "WD_TOKEN";
/// Token file looked up in the current working directory.
pub const TOKEN_CWD_FILE: &str = ".wd_token";
/// Token file looked up in the user's home directory.
pub const TOKEN_HOME_FILE: &str = ".wd_token";
/// System-wide token file.
pub const TOKEN_SYSTEM_FILE: &str = "/etc/wd/token";

/// Number of hex characters consumed from a token source.
const TOKEN_HEX_LEN: usize = 64;

/// A single place a token may be provisioned.
#[derive(Debug, Clone)]
pub enum TokenSource {
    /// An environment variable holding the hex token.
    Env(String),
    /// A file holding the hex token.
    File(PathBuf),
}

impl TokenSource {
    fn describe(&self) -> String {
        match self {
            TokenSource::Env(var) => format!("environment variable {var}"),
            TokenSource::File(path) => format!("file {}", path.display()),
        }
    }

    /// Raw token text, or `None` if this source is not provisioned.
    fn read(&self) -> Option<String> {
        match self {
            TokenSource::Env(var) => std::env::var(var).ok().filter(|v| !v.is_empty()),
            TokenSource::File(path) => fs::read_to_string(path).ok(),
        }
    }
}

/// The resolved 32-byte shared secret. Used only as key material for the
/// signer; never transmitted. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretToken {
    key: [u8; 32],
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material never appears in logs.
        f.debug_struct("SecretToken").finish_non_exhaustive()
    }
}

impl SecretToken {
    /// Decode a secret from hex text. Accepts anything with at least 64
    /// leading hex characters after trimming; the rest is ignored.
    pub fn from_hex(text: &str) -> Result<Self> {
        let trimmed = text.trim().as_bytes();
        if trimmed.len() < TOKEN_HEX_LEN {
            return Err(WatchdogError::config(format!(
                "token is {} characters, need at least {TOKEN_HEX_LEN} hex characters",
                trimmed.len()
            )));
        }
        let bytes = hex::decode(&trimmed[..TOKEN_HEX_LEN])
            .map_err(|e| WatchdogError::config(format!("token is not valid hex: {e}")))?;
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Ok(SecretToken { key })
    }

    /// Resolve the secret from an explicit ordered source list. The first
    /// source that is provisioned wins; its content must then be valid.
    pub fn from_sources(sources: &[TokenSource]) -> Result<Self> {
        for source in sources {
            if let Some(text) = source.read() {
                return Self::from_hex(&text).map_err(|e| {
                    WatchdogError::config(format!("{}: {e}", source.describe()))
                });
            }
        }
        Err(WatchdogError::config(
            "could not find a watchdog authentication token",
        ))
    }

    /// Resolve the secret from the standard source order: `WD_TOKEN`, then
    /// `./.wd_token`, then `~/.wd_token`, then `/etc/wd/token`.
    pub fn resolve() -> Result<Self> {
        Self::from_sources(&Self::default_sources())
    }

    /// The standard ordered source list.
    pub fn default_sources() -> Vec<TokenSource> {
        let mut sources = vec![
            TokenSource::Env(TOKEN_ENV_VAR.to_string()),
            TokenSource::File(PathBuf::from(TOKEN_CWD_FILE)),
        ];
        if let Some(home) = dirs::home_dir() {
            sources.push(TokenSource::File(home.join(TOKEN_HOME_FILE)));
        }
        sources.push(TokenSource::File(PathBuf::from(TOKEN_SYSTEM_FILE)));
        sources
    }

    /// The raw 32-byte key.
    pub fn key(&self) -> &[u8; 32] {
        &self.key
    }
}
