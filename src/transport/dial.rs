//! Connection establishment.
//!
//! # Responsibilities
//! - `TcpDial`: dial `host:port` for pass-through traffic
//! - `UnixDial`: resolve the host to a socket path and dial it
//! - `Connector`: run a dial step, then TLS for `https` targets
//!
//! # Design Decisions
//! - The dial step is a trait object so one connector type serves both paths
//! - Local-socket dialing ignores the port; the host alone picks the socket
//! - Dropping the connect future aborts the dial; an optional timeout bounds
//!   dial plus handshake

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use http::Uri;
use rustls::pki_types::ServerName;
use tokio::net::{TcpStream, UnixStream};
use tokio_rustls::TlsConnector;
use tower::Service;

use crate::directory::Resolver;
use crate::error::Error;
use crate::transport::stream::{Conn, RawStream};
use crate::transport::NETWORK_NAME;

/// Opens the raw socket for a dial target.
pub trait Dial: fmt::Debug + Send + Sync + 'static {
    fn dial(&self, dst: &Uri) -> BoxFuture<'static, Result<RawStream, Error>>;
}

/// Host portion of a URI without IPv6 brackets.
fn bare_host(dst: &Uri) -> Result<&str, Error> {
    dst.host()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']'))
        .filter(|host| !host.is_empty())
        .ok_or(Error::MissingHost)
}

/// Dials TCP endpoints; the default for pass-through requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpDial;

impl Dial for TcpDial {
    fn dial(&self, dst: &Uri) -> BoxFuture<'static, Result<RawStream, Error>> {
        let default_port = if dst.scheme_str() == Some("https") { 443 } else { 80 };
        let port = dst.port_u16().unwrap_or(default_port);
        let host = bare_host(dst).map(str::to_string);

        async move {
            let host = host?;
            let stream = TcpStream::connect((host.as_str(), port)).await?;
            stream.set_nodelay(true)?;
            tracing::trace!(host = %host, port, "TCP connection established");
            Ok(RawStream::from(stream))
        }
        .boxed()
    }
}

/// Dials the Unix socket a resolver maps the target host to.
#[derive(Clone)]
pub struct UnixDial {
    resolver: Arc<dyn Resolver>,
}

impl UnixDial {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// The host is looked up exactly as written in the URI, so IPv6
    /// literals keep their brackets, matching what the directory accepts.
    fn resolve(&self, dst: &Uri) -> Result<(String, PathBuf), Error> {
        let hostname = dst
            .host()
            .filter(|host| !host.is_empty())
            .ok_or(Error::MissingHost)?;
        let path = self.resolver.lookup_path(hostname)?;
        Ok((hostname.to_string(), path))
    }
}

impl fmt::Debug for UnixDial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnixDial").finish_non_exhaustive()
    }
}

impl Dial for UnixDial {
    fn dial(&self, dst: &Uri) -> BoxFuture<'static, Result<RawStream, Error>> {
        let resolved = self.resolve(dst);

        async move {
            let (hostname, path) = match resolved {
                Ok(resolved) => resolved,
                Err(err) => {
                    tracing::debug!(error = %err, "Socket path resolution failed");
                    return Err(err);
                }
            };

            let stream = UnixStream::connect(&path).await?;
            tracing::trace!(
                network = NETWORK_NAME,
                hostname = %hostname,
                path = %path.display(),
                "Local socket connection established"
            );
            Ok(RawStream::from(stream))
        }
        .boxed()
    }
}

/// `tower::Service<Uri>` plugged into the hyper-util client.
#[derive(Clone)]
pub struct Connector {
    dial: Arc<dyn Dial>,
    tls: Option<TlsConnector>,
    connect_timeout: Option<Duration>,
}

impl Connector {
    pub fn new(
        dial: Arc<dyn Dial>,
        tls: Option<Arc<rustls::ClientConfig>>,
        connect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            dial,
            tls: tls.map(TlsConnector::from),
            connect_timeout,
        }
    }

    async fn connect(self, dst: Uri) -> Result<Conn, Error> {
        let use_tls = match dst.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            other => return Err(Error::SchemeUnsupported(other.unwrap_or_default().to_string())),
        };

        let stream = self.dial.dial(&dst).await?;
        if !use_tls {
            return Ok(Conn::plain(stream));
        }

        let tls = self.tls.as_ref().ok_or(Error::TlsNotConfigured)?;
        let host = bare_host(&dst)?;
        let server_name = ServerName::try_from(host)
            .map(|name| name.to_owned())
            .map_err(|_| Error::InvalidServerName(host.to_string()))?;

        let stream = tls.connect(server_name, stream).await?;
        Ok(Conn::tls(stream))
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("dial", &self.dial)
            .field("tls", &self.tls.is_some())
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl Service<Uri> for Connector {
    type Response = Conn;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Conn, Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let timeout = self.connect_timeout;
        let connecting = self.clone().connect(dst);

        Box::pin(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, connecting)
                    .await
                    .map_err(|_| Error::ConnectTimeout)?,
                None => connecting.await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::Directory;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_unix_dial_unknown_host() {
        let dial = UnixDial::new(Arc::new(Directory::new()));

        let err = dial.dial(&uri("http://service/path")).await.unwrap_err();
        assert!(matches!(err, Error::PathNotFound(ref h) if h == "service"));
    }

    #[tokio::test]
    async fn test_unix_dial_ignores_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let directory = Directory::new();
        directory.add_path("service", &path).unwrap();
        let dial = UnixDial::new(Arc::new(directory));

        let stream = dial.dial(&uri("http://service:8080/path")).await.unwrap();
        assert!(matches!(stream, RawStream::Unix(_)));
        listener.accept().await.unwrap();
    }

    #[tokio::test]
    async fn test_connector_rejects_foreign_scheme() {
        let mut connector = Connector::new(Arc::new(TcpDial), None, None);

        let err = connector.call(uri("ftp://service/")).await.unwrap_err();
        assert!(matches!(err, Error::SchemeUnsupported(ref s) if s == "ftp"));
    }

    #[tokio::test]
    async fn test_connector_https_without_tls_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let _listener = tokio::net::UnixListener::bind(&path).unwrap();

        let directory = Directory::new();
        directory.add_path("service", &path).unwrap();
        let mut connector = Connector::new(Arc::new(UnixDial::new(Arc::new(directory))), None, None);

        let err = connector.call(uri("https://service/")).await.unwrap_err();
        assert!(matches!(err, Error::TlsNotConfigured));
    }

    #[tokio::test]
    async fn test_unix_dial_keeps_ipv6_brackets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.sock");
        let listener = tokio::net::UnixListener::bind(&path).unwrap();

        let directory = Directory::new();
        directory.add_path("[::1]", &path).unwrap();
        let dial = UnixDial::new(Arc::new(directory));

        let stream = dial.dial(&uri("http://[::1]:8080/path")).await.unwrap();
        assert!(matches!(stream, RawStream::Unix(_)));
        listener.accept().await.unwrap();

        let err = dial.dial(&uri("http://[::2]/path")).await.unwrap_err();
        assert!(matches!(err, Error::PathNotFound(ref h) if h == "[::2]"));
    }

    #[test]
    fn test_bare_host_strips_brackets() {
        assert_eq!(bare_host(&uri("http://[::1]:80/")).unwrap(), "::1");
        assert_eq!(bare_host(&uri("http://service/")).unwrap(), "service");
        assert!(matches!(bare_host(&uri("/path")), Err(Error::MissingHost)));
    }
}
