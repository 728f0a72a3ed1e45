// domain-expiry-lib/tests/resolver.rs

//! End-to-end resolution against a local stub of the IANA registries and
//! the RDAP servers they point to.

mod common;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use common::{StubResponse, StubServer};
use domain_expiry_lib::{ExpirationResolver, ExpiryError, ResolverConfig};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

const BOOTSTRAP: &str = "/rdap/dns.json";
const REGISTRAR_IDS: &str = "/registrar-ids.csv";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2029, 12, 1, 0, 0, 0).unwrap()
}

fn expiring(date: &str) -> serde_json::Value {
    json!({
        "objectClassName": "domain",
        "events": [
            {"eventAction": "registration", "eventDate": "2001-05-04T10:00:00Z"},
            {"eventAction": "expiration", "eventDate": date}
        ]
    })
}

fn referring(registrar: &str) -> serde_json::Value {
    json!({
        "objectClassName": "domain",
        "events": [{"eventAction": "registration", "eventDate": "2001-05-04T10:00:00Z"}],
        "entities": [{
            "objectClassName": "entity",
            "roles": ["registrar"],
            "vcardArray": ["vcard", [
                ["version", {}, "text", "4.0"],
                ["fn", {}, "text", registrar],
                ["email", {}, "text", "abuse@registrar.test"]
            ]]
        }]
    })
}

/// A stub with a bootstrap registry mapping `test` to `/registry/` and
/// `down` to a port nobody listens on.
async fn stub() -> StubServer {
    let server = StubServer::start().await;
    server.route(
        BOOTSTRAP,
        StubResponse::json(
            200,
            json!({
                "version": "1.0",
                "services": [
                    [["test"], [server.url("/registry/")]],
                    [["down"], ["http://127.0.0.1:1/"]]
                ]
            }),
        )
        .header("Cache-Control", "max-age=3600"),
    );
    server.route(
        REGISTRAR_IDS,
        StubResponse::text(
            200,
            format!(
                "ID,Registrar Name,Status,RDAP Base URL\n\
                 1,Reserved,Reserved,\n\
                 9999,\"EXAMPLE REGISTRAR, INC.\",Accredited,{}\n",
                server.url("/registrar/")
            ),
        ),
    );
    server
}

fn resolver(server: &StubServer, cache: &TempDir) -> ExpirationResolver {
    resolver_with(server, cache, false)
}

fn resolver_with(server: &StubServer, cache: &TempDir, debug: bool) -> ExpirationResolver {
    let config = ResolverConfig::default()
        .with_cache_dir(cache.path())
        .with_bootstrap_url(server.url(BOOTSTRAP))
        .with_registrar_ids_url(server.url(REGISTRAR_IDS))
        .with_timeout(Duration::from_secs(5))
        .with_debug(debug);
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(config.timeout)
        .build()
        .unwrap();
    ExpirationResolver::with_http_client(config, client)
}

#[tokio::test]
async fn test_expiration_from_registry() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();

    assert_eq!(report.days, 31);
    assert_eq!(
        report.expiration_date,
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap()
    );
    assert_eq!(report.rdap_server, server.url("/registry/"));
    assert_eq!(report.registrar, None);
    assert_eq!(server.hits(REGISTRAR_IDS), 0);
}

#[tokio::test]
async fn test_day_count_floors_partial_days() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();
    let morning = Utc.with_ymd_and_hms(2029, 12, 1, 9, 0, 0).unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("example.test", morning)
        .await
        .unwrap();
    assert_eq!(report.days, 30);
}

#[tokio::test]
async fn test_already_expired_is_negative() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, expiring("2029-11-21T12:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();
    assert_eq!(report.days, -10);
}

#[tokio::test]
async fn test_unknown_tld_issues_no_rdap_query() {
    let server = stub().await;
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.nowhere", now())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExpiryError::NoRdapServerForTld {
            tld: "nowhere".to_string()
        }
    );
    assert_eq!(server.hits(BOOTSTRAP), 1);
    assert_eq!(server.total_hits(), 1);
}

#[tokio::test]
async fn test_invalid_domain_touches_nothing() {
    let server = stub().await;
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("bad..name.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "invalid_domain_format");
    assert_eq!(server.total_hits(), 0);
}

#[tokio::test]
async fn test_uppercase_tld_is_lowercased_for_bootstrap() {
    let server = stub().await;
    server.route(
        "/registry/domain/Example.TEST",
        StubResponse::json(200, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("Example.TEST", now())
        .await
        .unwrap();
    assert_eq!(report.days, 31);
}

#[tokio::test]
async fn test_idn_is_queried_in_punycode() {
    let server = stub().await;
    server.route(
        "/registry/domain/xn--bcher-kva.test",
        StubResponse::json(200, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("bücher.test", now())
        .await
        .unwrap();

    assert_eq!(report.domain, "bücher.test");
    assert_eq!(report.ascii_domain, "xn--bcher-kva.test");
    assert_eq!(server.hits("/registry/domain/xn--bcher-kva.test"), 1);
}

#[tokio::test]
async fn test_registrar_fallback_issues_one_more_query() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(
        "/registrar/domain/example.test",
        StubResponse::json(200, expiring("2030-06-30T23:59:59Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();

    assert_eq!(report.days, 211);
    assert_eq!(report.registrar.as_deref(), Some("Example Registrar, Inc."));
    assert_eq!(report.rdap_server, server.url("/registrar/"));
    assert_eq!(server.hits("/registry/domain/example.test"), 1);
    assert_eq!(server.hits("/registrar/domain/example.test"), 1);
    assert_eq!(server.hits(REGISTRAR_IDS), 1);
}

#[tokio::test]
async fn test_second_referral_does_not_recurse() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(
        "/registrar/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "no_expiration_after_fallback");
    assert_eq!(err.raw_body(), None);
    assert_eq!(server.hits("/registrar/domain/example.test"), 1);
    assert_eq!(server.hits("/registry/domain/example.test"), 1);

    let err = resolver_with(&server, &cache, true)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();
    let body = err.raw_body().unwrap();
    assert!(body.contains("Example Registrar, Inc."));
    assert_eq!(server.hits("/registrar/domain/example.test"), 2);
}

#[tokio::test]
async fn test_registrar_failures_end_the_fallback() {
    let cases = [
        StubResponse::json(503, expiring("2030-01-01T00:00:00Z")),
        StubResponse::json(403, expiring("2030-01-01T00:00:00Z")),
        StubResponse::json(409, expiring("2030-01-01T00:00:00Z")),
    ];

    for response in cases {
        let status = response.status;
        let server = stub().await;
        server.route(
            "/registry/domain/example.test",
            StubResponse::json(200, referring("Example Registrar, Inc.")),
        );
        server.route("/registrar/domain/example.test", response);
        let cache = TempDir::new().unwrap();

        let err = resolver(&server, &cache)
            .resolve_at("example.test", now())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "no_expiration_after_fallback", "HTTP {}", status);
        assert!(
            err.to_string().contains(&format!("Got {}", status)),
            "{}",
            err
        );
    }
}

#[tokio::test]
async fn test_malformed_registrar_reply_keeps_body() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(
        "/registrar/domain/example.test",
        StubResponse::text(200, "<html>registrar portal</html>"),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver_with(&server, &cache, true)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "no_expiration_after_fallback");
    assert_eq!(err.raw_body(), Some("<html>registrar portal</html>"));
}

#[tokio::test]
async fn test_registrar_directory_is_cached_across_resolvers() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(
        "/registrar/domain/example.test",
        StubResponse::json(200, expiring("2030-06-30T23:59:59Z")),
    );
    let cache = TempDir::new().unwrap();

    for _ in 0..2 {
        let report = resolver(&server, &cache)
            .resolve_at("example.test", now())
            .await
            .unwrap();
        assert_eq!(report.registrar.as_deref(), Some("Example Registrar, Inc."));
    }

    assert_eq!(server.hits(REGISTRAR_IDS), 1);
    assert_eq!(server.hits(BOOTSTRAP), 1);
    assert_eq!(server.hits("/registrar/domain/example.test"), 2);
}

#[tokio::test]
async fn test_registrar_record_without_anything() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(
        "/registrar/domain/example.test",
        StubResponse::json(200, json!({"objectClassName": "domain"})),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver_with(&server, &cache, true)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "no_expiration_after_fallback");
    assert_eq!(err.raw_body(), Some(r#"{"objectClassName":"domain"}"#));
}

#[tokio::test]
async fn test_unknown_registrar() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Nobody Registrar LLC")),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExpiryError::RegistrarNotFound { ref registrar, .. } if registrar == "Nobody Registrar LLC"
    ));
    assert_eq!(server.hits(REGISTRAR_IDS), 1);
}

#[tokio::test]
async fn test_registrar_directory_unavailable() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    server.route(REGISTRAR_IDS, StubResponse::text(500, "oops"));
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "registrar_not_found");
    assert!(err.to_string().contains("HTTP 500"));
}

#[tokio::test]
async fn test_two_expiration_events_stop_resolution() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(
            200,
            json!({
                "events": [
                    {"eventAction": "expiration", "eventDate": "2030-01-01T00:00:00Z"},
                    {"eventAction": "expiration", "eventDate": "2031-01-01T00:00:00Z"}
                ],
                "entities": [{"roles": ["registrar"], "vcardArray": ["vcard", [["fn", {}, "text", "Example Registrar, Inc."]]]}]
            }),
        ),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExpiryError::AmbiguousExpirationData { count: 2, .. }
    ));
    assert_eq!(server.hits(REGISTRAR_IDS), 0);
    assert_eq!(server.hits("/registrar/domain/example.test"), 0);
}

#[tokio::test]
async fn test_404_short_circuits_without_parsing() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::text(404, "this is not json"),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ExpiryError::DomainNotFound {
            domain: "example.test".to_string(),
            server: server.url("/registry/"),
        }
    );
}

#[tokio::test]
async fn test_404_from_registrar_is_domain_not_found() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, referring("Example Registrar, Inc.")),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "domain_not_found");
    assert_eq!(server.hits("/registrar/domain/example.test"), 1);
}

#[tokio::test]
async fn test_classified_status_codes() {
    let cases = [
        (403, "rdap_server_refused"),
        (409, "rdap_rate_limited"),
        (503, "rdap_server_broken"),
    ];

    for (status, kind) in cases {
        let server = stub().await;
        server.route(
            "/registry/domain/example.test",
            StubResponse::json(status, expiring("2030-01-01T00:00:00Z")),
        );
        let cache = TempDir::new().unwrap();

        let err = resolver(&server, &cache)
            .resolve_at("example.test", now())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "HTTP {}", status);
    }
}

#[tokio::test]
async fn test_unrecognized_status_still_parses_body() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(500, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    let report = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();
    assert_eq!(report.days, 31);
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::text(200, "<html>maintenance</html>"),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver_with(&server, &cache, true)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "rdap_malformed");
    assert_eq!(err.raw_body(), Some("<html>maintenance</html>"));
}

#[tokio::test]
async fn test_raw_body_only_captured_in_debug_mode() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, json!({"events": []})),
    );
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "no_expiration_and_no_registrar");
    assert_eq!(err.raw_body(), None);

    let err = resolver_with(&server, &cache, true)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();
    assert_eq!(err.raw_body(), Some(r#"{"events":[]}"#));
}

#[tokio::test]
async fn test_unreachable_rdap_server() {
    let server = stub().await;
    let cache = TempDir::new().unwrap();

    let err = resolver(&server, &cache)
        .resolve_at("example.down", now())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ExpiryError::RdapConnectionFailed { ref server, .. } if server == "http://127.0.0.1:1/"
    ));
}

#[tokio::test]
async fn test_bootstrap_failures() {
    let server = StubServer::start().await;
    let cache = TempDir::new().unwrap();

    server.route(BOOTSTRAP, StubResponse::text(500, "down for maintenance"));
    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bootstrap_unavailable");

    server.route(BOOTSTRAP, StubResponse::text(200, "{\"services\": "));
    let err = resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "bootstrap_malformed");
}

#[tokio::test]
async fn test_bootstrap_is_cached_across_resolvers() {
    let server = stub().await;
    server.route(
        "/registry/domain/example.test",
        StubResponse::json(200, expiring("2030-01-01T00:00:00Z")),
    );
    let cache = TempDir::new().unwrap();

    // Two resolvers sharing a cache directory stand in for two invocations
    resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();
    resolver(&server, &cache)
        .resolve_at("example.test", now())
        .await
        .unwrap();

    assert_eq!(server.hits(BOOTSTRAP), 1);
    // RDAP answers themselves are never cached
    assert_eq!(server.hits("/registry/domain/example.test"), 2);
}
