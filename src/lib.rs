//! HTTP transport that routes distinguished URL schemes to Unix domain sockets.
//!
//! A request to `http+unix://service/path` is sent as `http://service/path`
//! over the socket the [`Directory`] maps `service` to. Any other request
//! goes to the upstream [`HttpTransport`] untouched.
//!
//! ```no_run
//! # async fn run() -> Result<(), uds_router::Error> {
//! use std::sync::Arc;
//! use bytes::Bytes;
//! use http_body_util::Full;
//! use uds_router::{Directory, HttpTransport, RoutingTransport};
//!
//! let directory = Arc::new(Directory::new());
//! directory.add_path("service", "/run/service.sock")?;
//!
//! let transport = RoutingTransport::new(directory, HttpTransport::new(), [])?;
//! let req = http::Request::get("http+unix://service/health")
//!     .body(Full::new(Bytes::new()))
//!     .map_err(|_| uds_router::Error::MissingHost)?;
//! let resp = transport.round_trip(req).await?;
//! println!("{}", resp.status());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod defaults;
pub mod directory;
pub mod error;
pub mod observability;
pub mod transport;

pub use config::RouterConfig;
pub use defaults::Defaults;
pub use directory::{Collector, Directory, Keeper, Resolver};
pub use error::Error;
pub use transport::{
    Adjuster, HttpTransport, HttpTransportBuilder, RoundTrip, RoutingTransport,
    DEFAULT_SCHEME_HTTP, DEFAULT_SCHEME_HTTPS, NETWORK_NAME,
};
