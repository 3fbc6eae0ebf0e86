//! Claiming routing schemes on an upstream transport.

mod common;

use std::sync::Arc;

use bytes::Bytes;
use http::Request;
use http_body_util::{BodyExt, Full};
use uds_router::{
    Adjuster, Defaults, Directory, Error, HttpTransport, Resolver, RoutingTransport,
    DEFAULT_SCHEME_HTTP, DEFAULT_SCHEME_HTTPS,
};

type Body = Full<Bytes>;

fn resolver() -> Arc<dyn Resolver> {
    Arc::new(Directory::new())
}

#[tokio::test]
async fn test_register_claims_both_schemes() {
    let upstream: HttpTransport = HttpTransport::new();
    let transport = RoutingTransport::new(resolver(), upstream.clone(), []).unwrap();

    transport.register().unwrap();

    assert!(upstream.is_registered(DEFAULT_SCHEME_HTTP));
    assert!(upstream.is_registered(DEFAULT_SCHEME_HTTPS));
}

#[tokio::test]
async fn test_duplicate_registration_fails() {
    let upstream: HttpTransport = HttpTransport::new();
    RoutingTransport::register_with([
        Adjuster::with_resolver(resolver()),
        Adjuster::with_http_transport(upstream.clone()),
    ])
    .unwrap();

    let err = RoutingTransport::register_with([
        Adjuster::with_resolver(resolver()),
        Adjuster::with_http_transport(upstream.clone()),
    ])
    .unwrap_err();

    match err {
        Error::SchemeNotRegistered { scheme, source } => {
            assert_eq!(scheme, DEFAULT_SCHEME_HTTP);
            assert!(matches!(*source, Error::SchemeAlreadyRegistered(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_registration_is_per_upstream() {
    let first: HttpTransport = HttpTransport::new();
    let second: HttpTransport = HttpTransport::new();

    RoutingTransport::new(resolver(), first.clone(), []).unwrap().register().unwrap();
    RoutingTransport::new(resolver(), second.clone(), []).unwrap().register().unwrap();

    assert!(first.is_registered(DEFAULT_SCHEME_HTTP));
    assert!(second.is_registered(DEFAULT_SCHEME_HTTP));
}

#[tokio::test]
async fn test_failed_registration_rolls_back() {
    let upstream: HttpTransport = HttpTransport::new();
    RoutingTransport::new(
        resolver(),
        upstream.clone(),
        [Adjuster::with_scheme_http("first"), Adjuster::with_scheme_https("taken")],
    )
    .unwrap()
    .register()
    .unwrap();

    let err = RoutingTransport::new(
        resolver(),
        upstream.clone(),
        [Adjuster::with_scheme_http("second"), Adjuster::with_scheme_https("taken")],
    )
    .unwrap()
    .register()
    .unwrap_err();

    assert!(matches!(err, Error::SchemeNotRegistered { ref scheme, .. } if scheme == "taken"));
    assert!(!upstream.is_registered("second"));
    assert!(upstream.is_registered("first"));
    assert!(upstream.is_registered("taken"));

    // The freed scheme can be claimed again.
    RoutingTransport::new(
        resolver(),
        upstream.clone(),
        [Adjuster::with_scheme_http("second"), Adjuster::with_scheme_https("other")],
    )
    .unwrap()
    .register()
    .unwrap();
}

#[tokio::test]
async fn test_construction_errors() {
    let upstream: HttpTransport = HttpTransport::new();

    let err = RoutingTransport::<Body>::from_adjusters([Adjuster::with_http_transport(
        upstream.clone(),
    )])
    .unwrap_err();
    assert!(matches!(err, Error::ResolverEmpty));

    let err = RoutingTransport::<Body>::from_adjusters([Adjuster::with_resolver(resolver())])
        .unwrap_err();
    assert!(matches!(err, Error::TransportEmpty));

    let err = RoutingTransport::new(
        resolver(),
        upstream.clone(),
        [Adjuster::with_scheme_https("HTTP")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::SchemeInvalid(_)));

    let err = RoutingTransport::new(
        resolver(),
        upstream.clone(),
        [Adjuster::with_scheme_http("same"), Adjuster::with_scheme_https("same")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::SchemeInvalid(_)));
}

#[tokio::test]
async fn test_defaults_register_routes_default_directory() {
    let server = common::start_unix_server(None);
    let defaults: Defaults = Defaults::new();
    defaults.add_path("service", &server.path).unwrap();

    defaults.register([]).unwrap();

    let req = Request::get("http+unix://service/defaults")
        .body(Body::default())
        .unwrap();
    let resp = defaults.transport().round_trip(req).await.unwrap();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"GET /defaults HTTP/1.1 0");

    let err = defaults.register([]).unwrap_err();
    assert!(matches!(err, Error::SchemeNotRegistered { .. }));
}

#[tokio::test]
async fn test_concurrent_registration_single_winner() {
    let upstream: HttpTransport = HttpTransport::new();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let upstream = upstream.clone();
            tokio::spawn(async move {
                RoutingTransport::new(resolver(), upstream, [])
                    .and_then(|transport| transport.register())
            })
        })
        .collect();

    let mut winners = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => winners += 1,
            Err(err) => assert!(matches!(err, Error::SchemeNotRegistered { .. })),
        }
    }
    assert_eq!(winners, 1);
    assert!(upstream.is_registered(DEFAULT_SCHEME_HTTP));
    assert!(upstream.is_registered(DEFAULT_SCHEME_HTTPS));
}
