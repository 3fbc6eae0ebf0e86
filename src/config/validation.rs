//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Scheme rules: valid syntax, not http/https, distinct
//! - Socket entries: valid hostnames, non-empty paths, no conflicting duplicates
//! - Value ranges (timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RouterConfig → Result<(), Vec<ValidationError>>

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::config::schema::RouterConfig;
use crate::directory::validate_hostname;
use crate::transport::options::validate_scheme;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `sockets[1].hostname`).
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn validate_config(config: &RouterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let http = validate_scheme(&config.schemes.http)
        .map_err(|e| errors.push(ValidationError::new("schemes.http", e.to_string())))
        .ok();
    let https = validate_scheme(&config.schemes.https)
        .map_err(|e| errors.push(ValidationError::new("schemes.https", e.to_string())))
        .ok();
    if let (Some(http), Some(https)) = (http, https) {
        if http == https {
            errors.push(ValidationError::new(
                "schemes",
                format!("http and https schemes are both {http:?}"),
            ));
        }
    }

    if config.client.connect_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "client.connect_timeout_ms",
            "must be greater than zero",
        ));
    }

    if let Some(tls) = &config.tls {
        if tls.ca_path.as_os_str().is_empty() {
            errors.push(ValidationError::new("tls.ca_path", "must not be empty"));
        }
    }

    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for (i, socket) in config.sockets.iter().enumerate() {
        if let Err(e) = validate_hostname(&socket.hostname) {
            errors.push(ValidationError::new(
                format!("sockets[{i}].hostname"),
                e.to_string(),
            ));
        }
        if socket.path.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                format!("sockets[{i}].path"),
                "must not be empty",
            ));
        }
        match seen.get(socket.hostname.as_str()) {
            Some(existing) if *existing != socket.path.as_path() => {
                errors.push(ValidationError::new(
                    format!("sockets[{i}].hostname"),
                    format!(
                        "{:?} is already mapped to {}",
                        socket.hostname,
                        existing.display()
                    ),
                ));
            }
            Some(_) => {}
            None => {
                seen.insert(&socket.hostname, &socket.path);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
