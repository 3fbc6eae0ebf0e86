//! Construction steps for a routing transport.
//!
//! # Design Decisions
//! - Each `Adjuster` validates its own input and fails without touching the
//!   settings
//! - Steps apply in order; construction stops at the first failure
//! - Cross-field rules (distinct schemes, required fields) run after all steps

use std::fmt;
use std::sync::Arc;

use crate::directory::Resolver;
use crate::error::Error;
use crate::transport::{HttpTransport, RoundTrip, HTTPS_SCHEME, HTTP_SCHEME};

/// One configuring step for [`RoutingTransport`](crate::transport::RoutingTransport).
pub enum Adjuster<B> {
    SchemeHttp(String),
    SchemeHttps(String),
    HttpTransport(HttpTransport<B>),
    RoundTripper(Arc<dyn RoundTrip<B>>),
    Resolver(Arc<dyn Resolver>),
}

impl<B: 'static> Adjuster<B> {
    /// URL scheme for HTTP over a Unix socket.
    pub fn with_scheme_http(scheme: impl Into<String>) -> Self {
        Adjuster::SchemeHttp(scheme.into())
    }

    /// URL scheme for HTTPS over a Unix socket.
    pub fn with_scheme_https(scheme: impl Into<String>) -> Self {
        Adjuster::SchemeHttps(scheme.into())
    }

    /// Upstream transport for pass-through traffic, and the template of the
    /// Unix socket client.
    pub fn with_http_transport(transport: HttpTransport<B>) -> Self {
        Adjuster::HttpTransport(transport)
    }

    /// Upstream given as any transport; only an [`HttpTransport`] is accepted.
    pub fn with_round_tripper(transport: Arc<dyn RoundTrip<B>>) -> Self {
        Adjuster::RoundTripper(transport)
    }

    pub fn with_resolver(resolver: Arc<dyn Resolver>) -> Self {
        Adjuster::Resolver(resolver)
    }

    pub(crate) fn adjust(self, settings: &mut Settings<B>) -> Result<(), Error> {
        match self {
            Adjuster::SchemeHttp(scheme) => {
                settings.scheme_http = Some(validate_scheme(&scheme)?);
            }
            Adjuster::SchemeHttps(scheme) => {
                settings.scheme_https = Some(validate_scheme(&scheme)?);
            }
            Adjuster::HttpTransport(transport) => {
                settings.upstream = Some(transport);
            }
            Adjuster::RoundTripper(transport) => {
                let upstream = transport.as_http_transport().ok_or(Error::TransportInvalid)?;
                settings.upstream = Some(upstream.clone());
            }
            Adjuster::Resolver(resolver) => {
                settings.resolver = Some(resolver);
            }
        }
        Ok(())
    }
}

impl<B> fmt::Debug for Adjuster<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Adjuster::SchemeHttp(s) => f.debug_tuple("SchemeHttp").field(s).finish(),
            Adjuster::SchemeHttps(s) => f.debug_tuple("SchemeHttps").field(s).finish(),
            Adjuster::HttpTransport(t) => f.debug_tuple("HttpTransport").field(t).finish(),
            Adjuster::RoundTripper(_) => f.write_str("RoundTripper"),
            Adjuster::Resolver(_) => f.write_str("Resolver"),
        }
    }
}

/// Settings collected by the adjusters.
pub(crate) struct Settings<B> {
    pub(crate) upstream: Option<HttpTransport<B>>,
    pub(crate) resolver: Option<Arc<dyn Resolver>>,
    pub(crate) scheme_http: Option<String>,
    pub(crate) scheme_https: Option<String>,
}

impl<B> Default for Settings<B> {
    fn default() -> Self {
        Self {
            upstream: None,
            resolver: None,
            scheme_http: None,
            scheme_https: None,
        }
    }
}

/// Checks a substitute scheme and returns it lowercased.
///
/// Must be non-empty, follow URI scheme syntax (`ALPHA *( ALPHA / DIGIT /
/// "+" / "-" / "." )`) and differ from `http` and `https`.
pub fn validate_scheme(scheme: &str) -> Result<String, Error> {
    if scheme.is_empty() {
        return Err(Error::SchemeEmpty);
    }

    let lowered = scheme.to_ascii_lowercase();
    if lowered == HTTP_SCHEME || lowered == HTTPS_SCHEME {
        return Err(Error::SchemeInvalid(scheme.to_string()));
    }

    let mut chars = lowered.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_valid = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !starts_alpha || !rest_valid {
        return Err(Error::SchemeInvalid(scheme.to_string()));
    }

    Ok(lowered)
}
