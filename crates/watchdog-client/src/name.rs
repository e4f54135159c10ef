//! Target name validation.
//!
//! Every watchdog name or prefix submitted to any operation must match
//! `[a-z0-9._]+`. Validation happens client-side, before signing, so an
//! invalid name is never sent over the wire.

use crate::error::{Result, WatchdogError};

/// Check whether `name` is a valid watchdog name or prefix.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'.' || b == b'_')
}

/// Validate `name`, returning it on success.
pub fn ensure_valid(name: &str) -> Result<&str> {
    if is_valid_name(name) {
        Ok(name)
    } else {
        Err(WatchdogError::invalid_name(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["svc.service", "a", "host_1.sd.etcd", "0_9", "..."] {
            assert!(is_valid_name(name), "{name:?} should be valid");
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "Svc.service", "svc/service", "svc service", "svc-1", "héh"] {
            assert!(!is_valid_name(name), "{name:?} should be invalid");
            assert!(matches!(
                ensure_valid(name),
                Err(WatchdogError::InvalidName { .. })
            ));
        }
    }

    #[test]
    fn test_ensure_valid_passthrough() {
        assert_eq!(ensure_valid("svc.service").unwrap(), "svc.service");
    }
}
