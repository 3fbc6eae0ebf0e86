//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use http_body::Body;
use serde::{Deserialize, Serialize};

use crate::directory::{Directory, Resolver};
use crate::error::{BoxError, Error};
use crate::transport::tls::load_client_config;
use crate::transport::{
    Adjuster, HttpTransport, HttpTransportBuilder, RoutingTransport, DEFAULT_SCHEME_HTTP,
    DEFAULT_SCHEME_HTTPS,
};

/// Root configuration for the router.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Schemes that trigger socket routing.
    pub schemes: SchemeConfig,

    /// Pool and connection settings of the HTTP client.
    pub client: ClientConfig,

    /// Optional TLS client configuration.
    pub tls: Option<TlsConfig>,

    /// Static hostname to socket path mappings.
    pub sockets: Vec<SocketConfig>,

    pub observability: ObservabilityConfig,
}

/// Scheme overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SchemeConfig {
    /// Scheme for HTTP over a socket (default: "http+unix").
    pub http: String,

    /// Scheme for HTTPS over a socket (default: "https+unix").
    pub https: String,
}

impl Default for SchemeConfig {
    fn default() -> Self {
        Self {
            http: DEFAULT_SCHEME_HTTP.to_string(),
            https: DEFAULT_SCHEME_HTTPS.to_string(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on dial plus TLS handshake, in milliseconds.
    pub connect_timeout_ms: u64,

    /// How long an idle pooled connection is kept.
    pub pool_idle_timeout_secs: u64,

    pub pool_max_idle_per_host: usize,

    /// Speak HTTP/2 with prior knowledge.
    pub http2_only: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 32,
            http2_only: false,
        }
    }
}

/// TLS client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// PEM bundle of trusted root certificates.
    pub ca_path: PathBuf,

    /// ALPN protocols offered, in preference order.
    #[serde(default = "default_alpn")]
    pub alpn: Vec<String>,
}

fn default_alpn() -> Vec<String> {
    vec!["h2".to_string(), "http/1.1".to_string()]
}

/// One hostname to socket path mapping.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocketConfig {
    pub hostname: String,
    pub path: PathBuf,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "uds_router=info".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn pool_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_idle_timeout_secs)
    }
}

impl RouterConfig {
    /// Directory pre-filled with the configured sockets.
    pub fn build_directory(&self) -> Result<Directory, Error> {
        let directory = Directory::new();
        for socket in &self.sockets {
            directory.add_path(&socket.hostname, &socket.path)?;
        }
        Ok(directory)
    }

    /// Upstream transport with the configured client and TLS settings.
    pub fn build_transport<B>(&self) -> Result<HttpTransport<B>, Error>
    where
        B: Body + Send + Unpin + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let mut builder = HttpTransportBuilder::new()
            .connect_timeout(self.client.connect_timeout())
            .pool_idle_timeout(self.client.pool_idle_timeout())
            .pool_max_idle_per_host(self.client.pool_max_idle_per_host)
            .http2_only(self.client.http2_only);

        if let Some(tls) = &self.tls {
            builder = builder.tls_config(load_client_config(&tls.ca_path, &tls.alpn)?);
        }

        Ok(builder.build())
    }

    /// Construction steps for the configured schemes.
    pub fn adjusters<B: 'static>(&self) -> Vec<Adjuster<B>> {
        vec![
            Adjuster::with_scheme_http(self.schemes.http.clone()),
            Adjuster::with_scheme_https(self.schemes.https.clone()),
        ]
    }

    /// Routing transport over `upstream`, resolving through `resolver`.
    pub fn build_routing<B>(
        &self,
        resolver: Arc<dyn Resolver>,
        upstream: HttpTransport<B>,
    ) -> Result<RoutingTransport<B>, Error>
    where
        B: Body + Send + Unpin + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        RoutingTransport::new(resolver, upstream, self.adjusters())
    }
}
