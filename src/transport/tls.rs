//! TLS client configuration loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::crypto::ring;
use rustls::{ClientConfig, RootCertStore};

use crate::error::Error;

/// Build a rustls client config trusting the PEM certificates in `ca_path`.
///
/// `alpn` lists protocols to offer, e.g. `["h2", "http/1.1"]`.
pub fn load_client_config(ca_path: &Path, alpn: &[String]) -> Result<Arc<ClientConfig>, Error> {
    if !ca_path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CA certificate file not found: {:?}", ca_path),
        )));
    }

    let mut reader = BufReader::new(File::open(ca_path)?);
    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut reader) {
        roots.add(cert?).map_err(Error::Tls)?;
    }

    if roots.is_empty() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("no certificates in {:?}", ca_path),
        )));
    }

    let mut config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(Error::Tls)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = alpn.iter().map(|p| p.as_bytes().to_vec()).collect();

    tracing::debug!(ca_path = ?ca_path, alpn = ?alpn, "TLS client config loaded");
    Ok(Arc::new(config))
}

/// Client config trusting the Mozilla root set, offering `h2` and
/// `http/1.1`. Used for `https` when no config is supplied.
pub fn default_client_config() -> Result<Arc<ClientConfig>, Error> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let mut config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map_err(Error::Tls)?
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = DEFAULT_ALPN.iter().map(|p| p.to_vec()).collect();

    Ok(Arc::new(config))
}

const DEFAULT_ALPN: [&[u8]; 2] = [b"h2", b"http/1.1"];
