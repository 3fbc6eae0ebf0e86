//! Pooled hyper-util client with a replaceable pool.

use std::sync::Arc;

use arc_swap::ArcSwap;
use futures_util::future::{FutureExt, TryFutureExt};
use http::Request;
use http_body::Body;
use hyper_util::client::legacy::{Builder, Client};

use crate::error::{BoxError, Error};
use crate::transport::dial::Connector;
use crate::transport::ResponseFuture;

/// Sends requests over connections made by one [`Connector`].
///
/// The pool sits behind an `ArcSwap` so idle connections can be dropped by
/// swapping in a fresh client; requests already in flight keep the old one.
pub struct Dispatcher<B> {
    builder: Builder,
    connector: Connector,
    client: ArcSwap<Client<Connector, B>>,
}

impl<B> Dispatcher<B>
where
    B: Body + Send + Unpin + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    pub fn new(builder: Builder, connector: Connector) -> Self {
        let client = builder.build(connector.clone());
        Self {
            builder,
            connector,
            client: ArcSwap::from_pointee(client),
        }
    }

    pub fn request(&self, req: Request<B>) -> ResponseFuture {
        let client = self.client.load();
        client.request(req).map_err(Error::from).boxed()
    }

    /// Drop every idle pooled connection.
    pub fn close_idle_connections(&self) {
        let fresh = self.builder.build(self.connector.clone());
        self.client.store(Arc::new(fresh));
    }

    pub fn connector(&self) -> &Connector {
        &self.connector
    }
}
