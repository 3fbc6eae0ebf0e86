//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! Request(http+unix://service/path)
//!     → routing.rs (scheme match, rewrite to http)
//!     → client.rs (pooled hyper-util client)
//!     → dial.rs (UnixDial: resolve "service", connect socket)
//!     → stream.rs (plain or TLS IO for hyper)
//!     → Response<Incoming>
//!
//! Request(https://example.com/)
//!     → routing.rs (no match)
//!     → upstream.rs (protocol table, then TCP client)
//! ```
//!
//! # Design Decisions
//! - `RoundTrip` is the HTTP transport contract; both transports implement it
//! - The upstream transport is the only kind that can be cloned with a
//!   substituted dial step
//! - Requests are taken by value, so rewriting never touches the caller's copy

use futures_util::future::BoxFuture;
use http::{Request, Response};
use hyper::body::Incoming;

use crate::error::Error;

pub mod client;
pub mod dial;
pub mod options;
pub mod routing;
pub mod stream;
pub mod tls;
pub mod upstream;

pub use dial::{Connector, Dial, TcpDial, UnixDial};
pub use options::Adjuster;
pub use routing::RoutingTransport;
pub use upstream::{HttpTransport, HttpTransportBuilder};

/// Default URL scheme for HTTP over a Unix domain socket.
pub const DEFAULT_SCHEME_HTTP: &str = "http+unix";

/// Default URL scheme for HTTPS over a Unix domain socket.
pub const DEFAULT_SCHEME_HTTPS: &str = "https+unix";

/// Network family name of Unix domain sockets.
pub const NETWORK_NAME: &str = "unix";

pub(crate) const HTTP_SCHEME: &str = "http";
pub(crate) const HTTPS_SCHEME: &str = "https";

/// Future returned by [`RoundTrip::round_trip`].
pub type ResponseFuture = BoxFuture<'static, Result<Response<Incoming>, Error>>;

/// Executes a single HTTP request.
pub trait RoundTrip<B>: Send + Sync + 'static {
    fn round_trip(&self, req: Request<B>) -> ResponseFuture;

    /// Close connections sitting idle in any pool owned by this transport.
    fn close_idle_connections(&self) {}

    /// The concrete upstream transport, if this is one.
    fn as_http_transport(&self) -> Option<&HttpTransport<B>> {
        None
    }
}
