//! Hostname validation.
//!
//! # Design Decisions
//! - A hostname is valid when it parses as the host of an `http` URL
//! - Validation only checks; the caller's spelling is what gets stored

use crate::error::Error;

/// Checks that `hostname` can stand as the host component of a URL.
///
/// Path separators, ports, whitespace and other forbidden host code points
/// are rejected, as is the empty string.
pub fn validate_hostname(hostname: &str) -> Result<(), Error> {
    url::Host::parse(hostname)
        .map(|_| ())
        .map_err(|source| Error::HostnameInvalid {
            hostname: hostname.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hostnames() {
        for hostname in ["service", "my-service", "api.internal", "127.0.0.1", "[::1]", "Service"] {
            assert!(validate_hostname(hostname).is_ok(), "{hostname} should be valid");
        }
    }

    #[test]
    fn test_invalid_hostnames() {
        for hostname in ["", "/service", "ser vice", "service:8080", "a/b", "ser#vice", "user@service"] {
            let err = validate_hostname(hostname).unwrap_err();
            assert!(
                matches!(err, Error::HostnameInvalid { .. }),
                "{hostname} should be rejected, got {err:?}"
            );
        }
    }
}
