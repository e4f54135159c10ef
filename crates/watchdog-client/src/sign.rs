//! Request authentication tags.
//!
//! A tag is SHA-256 over the raw 32-byte secret concatenated with the UTF-8
//! bytes of the target, rendered as 64 lowercase hex characters. Tags are
//! deterministic by design: the protocol relies on TLS and target-name
//! validation, not on freshness.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::name::ensure_valid;
use crate::token::SecretToken;

/// Compute the authentication tag for `target`.
///
/// Returns `InvalidName` if the target fails validation; an invalid target
/// is never hashed.
pub fn sign(token: &SecretToken, target: &str) -> Result<String> {
    ensure_valid(target)?;
    let mut hasher = Sha256::new();
    hasher.update(token.key());
    hasher.update(target.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
