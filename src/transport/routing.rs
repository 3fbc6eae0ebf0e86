//! Routing of distinguished schemes to Unix domain sockets.
//!
//! # Responsibilities
//! - Match requests against the two configured schemes
//! - Rewrite matched requests to `http`/`https`
//! - Send them through a client whose dial step resolves the host to a
//!   socket path
//! - Pass everything else to the upstream transport untouched
//! - Optionally claim both schemes on the upstream protocol table

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future::{self, FutureExt};
use http::uri::{PathAndQuery, Scheme};
use http::{Request, Response, Uri};
use http_body::Body;
use hyper::body::Incoming;
use tower::Service;

use crate::directory::Resolver;
use crate::error::{BoxError, Error};
use crate::transport::client::Dispatcher;
use crate::transport::dial::UnixDial;
use crate::transport::options::{Adjuster, Settings};
use crate::transport::{
    HttpTransport, ResponseFuture, RoundTrip, DEFAULT_SCHEME_HTTP, DEFAULT_SCHEME_HTTPS,
};

/// The pair of schemes that trigger socket routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schemes {
    http: String,
    https: String,
}

impl Schemes {
    fn new(http: String, https: String) -> Result<Self, Error> {
        if http == https {
            return Err(Error::SchemeInvalid(https));
        }
        Ok(Self { http, https })
    }

    pub fn http(&self) -> &str {
        &self.http
    }

    pub fn https(&self) -> &str {
        &self.https
    }

    /// The real scheme a request URI should be dispatched under, if its
    /// scheme is one of ours.
    fn target(&self, uri: &Uri) -> Option<Scheme> {
        let scheme = uri.scheme_str()?;
        if scheme.eq_ignore_ascii_case(&self.http) {
            Some(Scheme::HTTP)
        } else if scheme.eq_ignore_ascii_case(&self.https) {
            Some(Scheme::HTTPS)
        } else {
            None
        }
    }
}

impl Default for Schemes {
    fn default() -> Self {
        Self {
            http: DEFAULT_SCHEME_HTTP.to_string(),
            https: DEFAULT_SCHEME_HTTPS.to_string(),
        }
    }
}

/// Replace the scheme of `req` with `scheme`, keeping everything else.
fn rewrite_scheme<B>(req: Request<B>, scheme: Scheme) -> Result<Request<B>, Error> {
    let (mut parts, body) = req.into_parts();

    let mut uri = parts.uri.into_parts();
    uri.scheme = Some(scheme);
    uri.path_and_query
        .get_or_insert_with(|| PathAndQuery::from_static("/"));
    parts.uri = Uri::from_parts(uri).map_err(|_| Error::MissingHost)?;

    Ok(Request::from_parts(parts, body))
}

/// Sends requests under our schemes through the socket-dialing client.
///
/// This is what gets installed on the upstream protocol table. It holds no
/// reference to the upstream, so registration creates no ownership cycle.
struct Redirect<B> {
    schemes: Schemes,
    dispatcher: Dispatcher<B>,
}

impl<B> Redirect<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn dispatch(&self, req: Request<B>, scheme: Scheme) -> ResponseFuture {
        match rewrite_scheme(req, scheme) {
            Ok(req) => self.dispatcher.request(req),
            Err(err) => future::ready(Err(err)).boxed(),
        }
    }
}

impl<B> RoundTrip<B> for Redirect<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn round_trip(&self, req: Request<B>) -> ResponseFuture {
        match self.schemes.target(req.uri()) {
            Some(scheme) => self.dispatch(req, scheme),
            None => {
                let scheme = req.uri().scheme_str().unwrap_or_default().to_string();
                future::ready(Err(Error::SchemeUnsupported(scheme))).boxed()
            }
        }
    }

    fn close_idle_connections(&self) {
        self.dispatcher.close_idle_connections();
    }
}

/// HTTP transport that routes two distinguished URL schemes to Unix sockets.
///
/// Requests under [`DEFAULT_SCHEME_HTTP`] / [`DEFAULT_SCHEME_HTTPS`] (or the
/// configured overrides) are sent as `http`/`https` over the socket the
/// resolver maps the URL host to. The port, if any, is ignored. All other
/// requests go to the upstream transport as they are.
pub struct RoutingTransport<B> {
    upstream: HttpTransport<B>,
    redirect: Arc<Redirect<B>>,
}

impl<B> Clone for RoutingTransport<B> {
    fn clone(&self) -> Self {
        Self {
            upstream: self.upstream.clone(),
            redirect: Arc::clone(&self.redirect),
        }
    }
}

impl<B> fmt::Debug for RoutingTransport<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingTransport")
            .field("schemes", &self.redirect.schemes)
            .field("upstream", &self.upstream)
            .finish()
    }
}

impl<B> RoutingTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    /// Routing transport over `upstream`, resolving hosts with `resolver`.
    pub fn new(
        resolver: Arc<dyn Resolver>,
        upstream: HttpTransport<B>,
        adjusters: impl IntoIterator<Item = Adjuster<B>>,
    ) -> Result<Self, Error> {
        let leading = [
            Adjuster::with_resolver(resolver),
            Adjuster::with_http_transport(upstream),
        ];
        Self::from_adjusters(leading.into_iter().chain(adjusters))
    }

    /// Build purely from adjusters, applied in order.
    ///
    /// Fails with [`Error::ResolverEmpty`] or [`Error::TransportEmpty`] when
    /// no step supplied a resolver or an upstream transport.
    pub fn from_adjusters(adjusters: impl IntoIterator<Item = Adjuster<B>>) -> Result<Self, Error> {
        let mut settings = Settings::default();
        for adjuster in adjusters {
            adjuster.adjust(&mut settings)?;
        }

        let resolver = settings.resolver.ok_or(Error::ResolverEmpty)?;
        let upstream = settings.upstream.ok_or(Error::TransportEmpty)?;
        let defaults = Schemes::default();
        let schemes = Schemes::new(
            settings.scheme_http.unwrap_or(defaults.http),
            settings.scheme_https.unwrap_or(defaults.https),
        )?;

        let dispatcher = upstream.clone_with_dialer(Arc::new(UnixDial::new(resolver)));

        tracing::debug!(
            scheme_http = %schemes.http,
            scheme_https = %schemes.https,
            "Routing transport created"
        );

        Ok(Self {
            upstream,
            redirect: Arc::new(Redirect {
                schemes,
                dispatcher,
            }),
        })
    }

    /// Build from adjusters and install on the upstream at once.
    pub fn register_with(adjusters: impl IntoIterator<Item = Adjuster<B>>) -> Result<Self, Error> {
        let transport = Self::from_adjusters(adjusters)?;
        transport.register()?;
        Ok(transport)
    }

    /// Claim both schemes on the upstream transport's protocol table, so
    /// clients of the upstream are routed too.
    ///
    /// Either both schemes are claimed or neither: if the second claim fails
    /// the first is released before the error is returned.
    pub fn register(&self) -> Result<(), Error> {
        let handler: Arc<dyn RoundTrip<B>> = self.redirect.clone();
        let schemes = &self.redirect.schemes;

        self.upstream
            .register_protocol(&schemes.http, Arc::clone(&handler))
            .map_err(|err| not_registered(&schemes.http, err))?;

        if let Err(err) = self.upstream.register_protocol(&schemes.https, Arc::clone(&handler)) {
            self.upstream.deregister_protocol(&schemes.http, &handler);
            return Err(not_registered(&schemes.https, err));
        }

        tracing::info!(
            scheme_http = %schemes.http,
            scheme_https = %schemes.https,
            "Routing transport registered on upstream"
        );
        Ok(())
    }

    /// Send `req`, over a Unix socket when its scheme is one of ours.
    pub fn round_trip(&self, req: Request<B>) -> ResponseFuture {
        match self.redirect.schemes.target(req.uri()) {
            Some(scheme) => self.redirect.dispatch(req, scheme),
            None => self.upstream.round_trip(req),
        }
    }

    /// Close idle connections of both the socket client and the upstream.
    pub fn close_idle_connections(&self) {
        self.redirect.close_idle_connections();
        self.upstream.close_idle_connections();
    }

    pub fn schemes(&self) -> &Schemes {
        &self.redirect.schemes
    }

    pub fn upstream(&self) -> &HttpTransport<B> {
        &self.upstream
    }
}

fn not_registered(scheme: &str, source: Error) -> Error {
    tracing::warn!(scheme = %scheme, error = %source, "Scheme registration failed");
    Error::SchemeNotRegistered {
        scheme: scheme.to_string(),
        source: Box::new(source),
    }
}

impl<B> RoundTrip<B> for RoutingTransport<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn round_trip(&self, req: Request<B>) -> ResponseFuture {
        RoutingTransport::round_trip(self, req)
    }

    fn close_idle_connections(&self) {
        RoutingTransport::close_idle_connections(self)
    }
}

impl<B> Service<Request<B>> for RoutingTransport<B>
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
