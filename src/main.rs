//! uds-router: send one HTTP request, routing `http+unix` / `https+unix`
//! URLs to Unix domain sockets.
//!
//! ```text
//! uds-router --map service=/run/service.sock http+unix://service/health
//! uds-router --config router.toml https+unix://api/v1/items
//! ```
//!
//! The status line goes to stderr and the response body to stdout.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bytes::Bytes;
use clap::Parser;
use http::{HeaderName, HeaderValue, Method, Request};
use http_body_util::{BodyExt, Full};
use tokio::io::AsyncWriteExt;

use uds_router::config::{load_config, validate_config, RouterConfig, SocketConfig, TlsConfig};
use uds_router::observability::logging;
use uds_router::{Error, HttpTransport, Resolver};

#[derive(Debug, Parser)]
#[command(name = "uds-router", version, about = "HTTP client for services on Unix domain sockets")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra hostname to socket mapping, as `host=path`.
    #[arg(short, long = "map", value_parser = parse_mapping)]
    maps: Vec<SocketConfig>,

    /// PEM bundle of trusted root certificates for https targets.
    #[arg(long)]
    ca: Option<PathBuf>,

    /// Speak HTTP/2 with prior knowledge.
    #[arg(long)]
    http2: bool,

    #[arg(short = 'X', long, default_value = "GET")]
    method: Method,

    /// Request header, as `name:value`.
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    headers: Vec<(HeaderName, HeaderValue)>,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    url: http::Uri,
}

fn parse_mapping(arg: &str) -> Result<SocketConfig, String> {
    let (hostname, path) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected host=path, got {arg:?}"))?;
    Ok(SocketConfig {
        hostname: hostname.to_string(),
        path: PathBuf::from(path),
    })
}

fn parse_header(arg: &str) -> Result<(HeaderName, HeaderValue), String> {
    let (name, value) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected name:value, got {arg:?}"))?;
    let name = HeaderName::try_from(name.trim()).map_err(|e| e.to_string())?;
    let value = HeaderValue::try_from(value.trim()).map_err(|e| e.to_string())?;
    Ok((name, value))
}

impl Cli {
    /// File config (or defaults) with command-line overrides applied.
    fn router_config(&self) -> Result<RouterConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => RouterConfig::default(),
        };

        config.sockets.extend(self.maps.iter().cloned());
        if let Some(ca_path) = &self.ca {
            let alpn = config.tls.take().map(|tls| tls.alpn).unwrap_or_else(|| {
                vec!["h2".to_string(), "http/1.1".to_string()]
            });
            config.tls = Some(TlsConfig {
                ca_path: ca_path.clone(),
                alpn,
            });
        }
        if self.http2 {
            config.client.http2_only = true;
        }

        validate_config(&config).map_err(uds_router::config::ConfigError::Validation)?;
        Ok(config)
    }

    fn request(&self) -> Result<Request<Full<Bytes>>, http::Error> {
        let body = self.data.clone().map(Bytes::from).unwrap_or_default();
        let mut builder = Request::builder().method(self.method.clone()).uri(self.url.clone());
        for (name, value) in &self.headers {
            builder = builder.header(name, value);
        }
        builder.body(Full::new(body))
    }
}

async fn run(cli: Cli, config: RouterConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        scheme_http = %config.schemes.http,
        scheme_https = %config.schemes.https,
        sockets = config.sockets.len(),
        tls = config.tls.is_some(),
        "Configuration loaded"
    );

    let directory: Arc<dyn Resolver> = Arc::new(config.build_directory()?);
    let upstream: HttpTransport = config.build_transport()?;
    let transport = config.build_routing(directory, upstream)?;

    let resp = transport.round_trip(cli.request()?).await?;

    eprintln!("{:?} {}", resp.version(), resp.status());
    let body = resp.into_body().collect().await?.to_bytes();

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&body).await?;
    stdout.flush().await?;

    transport.close_idle_connections();
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.router_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("uds-router: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.observability.log_level) {
        eprintln!("failed to initialize logging: {e}");
    }

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>().and_then(|e| Error::find_in(e)) {
                Some(Error::PathNotFound(hostname)) => {
                    tracing::error!(hostname = %hostname, "No socket mapped for host");
                }
                _ => tracing::error!(error = %e, "Request failed"),
            }
            eprintln!("uds-router: {e}");
            ExitCode::FAILURE
        }
    }
}
