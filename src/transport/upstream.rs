//! The upstream HTTP transport.
//!
//! # Responsibilities
//! - Dispatch ordinary `http`/`https` requests over TCP
//! - Own a protocol table so other transports can claim URL schemes
//! - Hand out independent clients that share its settings but dial
//!   differently
//!
//! # Design Decisions
//! - Clones share one instance (pool, protocol table); identity is the `Arc`
//! - A scheme has at most one handler; a second claim is rejected
//! - Handlers are looked up before the TCP client, so a claimed scheme never
//!   reaches the TCP connector

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::{Request, Response, Uri};
use http_body::Body;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::client::legacy::{Builder, Client};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower::Service;

use crate::error::{BoxError, Error};
use crate::transport::client::Dispatcher;
use crate::transport::dial::{Connector, Dial, TcpDial};
use crate::transport::tls::default_client_config;
use crate::transport::{ResponseFuture, RoundTrip};

type Handler<B> = Arc<dyn RoundTrip<B>>;

/// Settings for an [`HttpTransport`].
pub struct HttpTransportBuilder {
    client: Builder,
    tls: Option<Arc<rustls::ClientConfig>>,
    connect_timeout: Option<Duration>,
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        let mut client = Client::builder(TokioExecutor::new());
        client.pool_timer(TokioTimer::new());
        Self {
            client,
            tls: None,
            connect_timeout: None,
        }
    }

    /// The hyper-util builder, for pool and protocol settings not exposed here.
    pub fn client_builder(&mut self) -> &mut Builder {
        &mut self.client
    }

    /// TLS settings used for every `https` connection. Without one, the
    /// Mozilla root set is trusted and `h2`/`http/1.1` are offered.
    pub fn tls_config(mut self, config: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(config);
        self
    }

    /// Upper bound for dial plus TLS handshake.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.client.pool_idle_timeout(timeout);
        self
    }

    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.client.pool_max_idle_per_host(max);
        self
    }

    /// Speak HTTP/2 only, with prior knowledge on cleartext connections.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.client.http2_only(enabled);
        self
    }

    pub fn build<B>(self) -> HttpTransport<B>
    where
        B: Body + Send + Unpin + 'static,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        let tls = self.tls.or_else(|| match default_client_config() {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!(error = %err, "Default TLS config unavailable, https disabled");
                None
            }
        });
        let connector = Connector::new(Arc::new(TcpDial), tls.clone(), self.connect_timeout);
        let dispatcher = Dispatcher::new(self.client.clone(), connector);

        HttpTransport {
            inner: Arc::new(Inner {
                builder: self.client,
                tls,
                connect_timeout: self.connect_timeout,
                dispatcher,
                protocols: DashMap::new(),
            }),
        }
    }
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Inner<B> {
    builder: Builder,
    tls: Option<Arc<rustls::ClientConfig>>,
    connect_timeout: Option<Duration>,
    dispatcher: Dispatcher<B>,
    protocols: DashMap<String, Handler<B>>,
}

/// HTTP transport over TCP with a pluggable protocol table.
pub struct HttpTransport<B = Full<Bytes>> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for HttpTransport<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B> fmt::Debug for HttpTransport<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes: Vec<String> = self.inner.protocols.iter().map(|e| e.key().clone()).collect();
        f.debug_struct("HttpTransport")
            .field("tls", &self.inner.tls.is_some())
            .field("connect_timeout", &self.inner.connect_timeout)
            .field("protocols", &schemes)
            .finish()
    }
}

impl<B> HttpTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    /// Transport with default pool settings and the default TLS config.
    pub fn new() -> Self {
        HttpTransportBuilder::new().build()
    }

    /// Send `req`, through a registered handler when its scheme is claimed.
    pub fn round_trip(&self, req: Request<B>) -> ResponseFuture {
        if let Some(handler) = self.handler_for(req.uri()) {
            return handler.round_trip(req);
        }
        self.inner.dispatcher.request(req)
    }

    fn handler_for(&self, uri: &Uri) -> Option<Handler<B>> {
        let scheme = uri.scheme_str()?.to_ascii_lowercase();
        self.inner
            .protocols
            .get(&scheme)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Claim `scheme` for `handler`.
    ///
    /// Fails with [`Error::SchemeAlreadyRegistered`] when another handler
    /// already owns the scheme on this transport.
    pub fn register_protocol(&self, scheme: &str, handler: Handler<B>) -> Result<(), Error> {
        match self.inner.protocols.entry(scheme.to_ascii_lowercase()) {
            Entry::Occupied(_) => Err(Error::SchemeAlreadyRegistered(scheme.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(handler);
                tracing::debug!(scheme = %scheme, "Protocol handler registered");
                Ok(())
            }
        }
    }

    /// Release `scheme` if it is still owned by `handler`.
    pub fn deregister_protocol(&self, scheme: &str, handler: &Handler<B>) -> bool {
        let removed = self
            .inner
            .protocols
            .remove_if(&scheme.to_ascii_lowercase(), |_, current| same_handler(current, handler))
            .is_some();
        if removed {
            tracing::debug!(scheme = %scheme, "Protocol handler deregistered");
        }
        removed
    }

    pub fn is_registered(&self, scheme: &str) -> bool {
        self.inner.protocols.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Build an independent dispatcher with this transport's pool, protocol
    /// and TLS settings, dialing through `dial` instead of TCP.
    pub fn clone_with_dialer(&self, dial: Arc<dyn Dial>) -> Dispatcher<B> {
        let connector = Connector::new(dial, self.inner.tls.clone(), self.inner.connect_timeout);
        Dispatcher::new(self.inner.builder.clone(), connector)
    }

    pub fn close_idle_connections(&self) {
        self.inner.dispatcher.close_idle_connections();
    }

    /// True when both handles point at the same transport instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<B> Default for HttpTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn default() -> Self {
        Self::new()
    }
}

fn same_handler<B>(a: &Handler<B>, b: &Handler<B>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl<B> RoundTrip<B> for HttpTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn round_trip(&self, req: Request<B>) -> ResponseFuture {
        HttpTransport::round_trip(self, req)
    }

    fn close_idle_connections(&self) {
        HttpTransport::close_idle_connections(self)
    }

    fn as_http_transport(&self) -> Option<&HttpTransport<B>> {
        Some(self)
    }
}

impl<B> Service<Request<B>> for HttpTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Response = Response<Incoming>;
    type Error = Error;
    type Future = ResponseFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        self.round_trip(req)
    }
}
