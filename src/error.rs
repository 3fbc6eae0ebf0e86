//! Error taxonomy shared by the directory and the transports.
//!
//! # Design Decisions
//! - One enum for the whole crate; callers match on kinds
//! - Dial failures travel through hyper-util as boxed connector errors and
//!   can be recovered from the source chain with [`Error::find_in`]
//! - Registration never panics; table conflicts become `SchemeNotRegistered`

use std::error::Error as StdError;

/// Boxed error accepted from bodies and connectors.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Hostname does not parse as the host component of a URL.
    #[error("host is invalid: {hostname:?}")]
    HostnameInvalid {
        hostname: String,
        #[source]
        source: url::ParseError,
    },

    /// Hostname is already mapped to a different path.
    #[error("host is already exists: {0}")]
    HostnameAlreadyExists(String),

    /// No path is mapped to the hostname.
    #[error("path not found for host: {0}")]
    PathNotFound(String),

    #[error("resolver is not specified")]
    ResolverEmpty,

    #[error("http transport is not specified")]
    TransportEmpty,

    /// The supplied transport cannot be cloned with a substituted dialer.
    #[error("http transport is not an http transport")]
    TransportInvalid,

    #[error("scheme is not specified")]
    SchemeEmpty,

    #[error("scheme is not valid: {0}")]
    SchemeInvalid(String),

    /// Installing a handler on the upstream protocol table failed.
    #[error("scheme not registered: {scheme}")]
    SchemeNotRegistered {
        scheme: String,
        #[source]
        source: Box<Error>,
    },

    /// The upstream protocol table already has a handler for the scheme.
    #[error("scheme is already registered: {0}")]
    SchemeAlreadyRegistered(String),

    /// The transport has no way to dial this scheme.
    #[error("scheme is not supported: {0}")]
    SchemeUnsupported(String),

    #[error("request uri has no host")]
    MissingHost,

    #[error("tls client config is not specified")]
    TlsNotConfigured,

    #[error("invalid tls server name: {0}")]
    InvalidServerName(String),

    #[error("tls error: {0}")]
    Tls(#[source] rustls::Error),

    #[error("connect timed out")]
    ConnectTimeout,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("request failed: {0}")]
    Request(#[from] hyper_util::client::legacy::Error),
}

impl Error {
    /// Walks the source chain of `err` looking for an error of this crate.
    ///
    /// Useful for request failures, where a resolver miss is wrapped by the
    /// hyper-util client error.
    pub fn find_in<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Error> {
        let mut current = Some(err);
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<Error>() {
                match found {
                    // Keep looking past our own wrapper of the client error.
                    Error::Request(_) => {}
                    _ => return Some(found),
                }
            }
            current = err.source();
        }
        None
    }

    /// Returns true for a lookup miss, directly or inside a request failure.
    pub fn is_path_not_found(&self) -> bool {
        matches!(Error::find_in(self), Some(Error::PathNotFound(_)))
    }
}
