//! Process-level default directory and upstream transport.
//!
//! # Design Decisions
//! - An explicit value owned by the application's composition root; nothing in
//!   the crate reaches for it implicitly
//! - `register` fills in whatever the caller left out with these defaults

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::Full;

use crate::directory::{Directory, Resolver};
use crate::error::{BoxError, Error};
use crate::transport::{Adjuster, HttpTransport, RoutingTransport};

/// Default directory plus default upstream transport.
pub struct Defaults<B = Full<Bytes>> {
    directory: Arc<Directory>,
    transport: HttpTransport<B>,
}

impl<B> Clone for Defaults<B> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            transport: self.transport.clone(),
        }
    }
}

impl<B> std::fmt::Debug for Defaults<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("directory", &self.directory)
            .field("transport", &self.transport)
            .finish()
    }
}

impl<B> Defaults<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    /// Empty directory and a transport with default settings.
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }

    /// Empty directory over an existing upstream transport.
    pub fn with_transport(transport: HttpTransport<B>) -> Self {
        Self {
            directory: Arc::new(Directory::new()),
            transport,
        }
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub fn transport(&self) -> &HttpTransport<B> {
        &self.transport
    }

    /// Map `hostname` to `path` in the default directory.
    pub fn add_path(&self, hostname: &str, path: impl AsRef<Path>) -> Result<(), Error> {
        self.directory.add_path(hostname, path)
    }

    /// Look `hostname` up in the default directory.
    pub fn lookup_path(&self, hostname: &str) -> Result<PathBuf, Error> {
        self.directory.lookup_path(hostname)
    }

    /// Build a routing transport and claim its schemes on the upstream.
    ///
    /// The default directory and transport apply unless one of `adjusters`
    /// supplies a resolver or an upstream of its own.
    pub fn register(
        &self,
        adjusters: impl IntoIterator<Item = Adjuster<B>>,
    ) -> Result<RoutingTransport<B>, Error> {
        let resolver: Arc<dyn Resolver> = self.directory.clone();
        let leading = [
            Adjuster::with_resolver(resolver),
            Adjuster::with_http_transport(self.transport.clone()),
        ];
        RoutingTransport::register_with(leading.into_iter().chain(adjusters))
    }
}

impl<B> Default for Defaults<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    fn default() -> Self {
        Self::new()
    }
}
