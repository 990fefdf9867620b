#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` token handling using wiremock.

use std::sync::Arc;

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bmsdash_api::store::keys;
use bmsdash_api::{
    ApiClient, CredentialStore, Domain, Error, LogQuery, MemoryStore, Session, SessionEvent,
    TokenPair, TrendQuery,
};

// ── Helpers ─────────────────────────────────────────────────────────

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    client: ApiClient,
}

async fn setup() -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let session = Arc::new(Session::new(store.clone()));
    let client = ApiClient::with_client(
        &format!("{}/api", server.uri()),
        reqwest::Client::new(),
        session,
    )
    .unwrap();
    Harness {
        server,
        store,
        client,
    }
}

async fn setup_with_tokens(pair: TokenPair) -> Harness {
    let harness = setup().await;
    harness.client.tokens().set_tokens(pair).unwrap();
    harness
}

fn listing_body() -> serde_json::Value {
    json!({ "success": true, "message": "ok", "data": { "items": [] } })
}

async fn mount_refresh(server: &MockServer, new_access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "accessToken": new_access, "refreshToken": "refresh-2" }
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ── Token validity ──────────────────────────────────────────────────

#[tokio::test]
async fn test_valid_token_skips_refresh() {
    let h = setup_with_tokens(
        TokenPair::new("access-1", "refresh-1").with_expiry(Utc::now() + Duration::hours(1)),
    )
    .await;
    mount_refresh(&h.server, "unused", 0).await;

    let token = h.client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "access-1");
}

#[tokio::test]
async fn test_expired_token_refreshes_once() {
    let h = setup_with_tokens(
        TokenPair::new("access-1", "refresh-1").with_expiry(Utc::now() - Duration::minutes(1)),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": "access-2",
            "refreshToken": "refresh-2",
            "expiresIn": 3600
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let token = h.client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "access-2");

    // Second call reuses the fresh token.
    let token = h.client.tokens().get_valid_access_token().await.unwrap();
    assert_eq!(token.expose_secret(), "access-2");
    assert_eq!(
        h.store.get(keys::REFRESH_TOKEN).unwrap().as_deref(),
        Some("refresh-2")
    );
}

#[tokio::test]
async fn test_no_token_fails_before_network() {
    let h = setup().await;

    let result = h.client.list_machines(Domain::Electrical).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(h.server.received_requests().await.unwrap().is_empty());
}

// ── 401 handling ────────────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_refreshes_and_retries_once() {
    let h = setup_with_tokens(TokenPair::new("stale", "refresh-1")).await;
    mount_refresh(&h.server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/electrical/machines"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/electrical/machines"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body()))
        .expect(1)
        .mount(&h.server)
        .await;

    let body = h.client.list_machines(Domain::Electrical).await.unwrap();
    assert_eq!(body, listing_body());
}

#[tokio::test]
async fn test_second_unauthorized_is_not_retried() {
    let h = setup_with_tokens(TokenPair::new("stale", "refresh-1")).await;
    mount_refresh(&h.server, "also-rejected", 1).await;

    Mock::given(method("GET"))
        .and(path("/api/electrical/devices"))
        .respond_with(ResponseTemplate::new(401).set_body_string("denied"))
        .expect(2)
        .mount(&h.server)
        .await;

    let result = h.client.list_identities(Domain::Electrical).await;

    match result {
        Err(Error::Server {
            status,
            ref status_text,
            ref body,
        }) => {
            assert_eq!(status, 401);
            assert_eq!(status_text, "Unauthorized");
            assert_eq!(body, "denied");
        }
        other => panic!("expected Server error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_unauthorized_share_one_refresh() {
    let h = setup_with_tokens(TokenPair::new("stale", "refresh-1")).await;
    mount_refresh(&h.server, "fresh", 1).await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing_body()))
        .mount(&h.server)
        .await;

    let (a, b) = tokio::join!(
        h.client.list_machines(Domain::Electrical),
        h.client.list_identities(Domain::Electrical),
    );
    a.unwrap();
    b.unwrap();
}

// ── Refresh failure ─────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_failure_clears_store_and_signals_once() {
    let h = setup_with_tokens(TokenPair::new("stale", "revoked")).await;
    h.client.session().set_active_application("energy").unwrap();
    let mut events = h.client.session().subscribe();

    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let (a, b) = tokio::join!(
        h.client.list_machines(Domain::Temperature),
        h.client.list_identities(Domain::Temperature),
    );

    let errors = [a.unwrap_err(), b.unwrap_err()];
    assert!(errors.iter().all(Error::is_auth_expired), "{errors:?}");
    assert!(
        errors.iter().any(|e| matches!(e, Error::Refresh { .. })),
        "{errors:?}"
    );

    assert!(h.store.is_empty());
    assert!(h.client.tokens().current().is_none());

    assert!(matches!(
        events.recv().await.unwrap(),
        SessionEvent::Invalidated { .. }
    ));
    assert!(events.try_recv().is_err());
}

// ── Login / logout ──────────────────────────────────────────────────

#[tokio::test]
async fn test_login_stores_tokens_and_profile() {
    let h = setup().await;
    let mut events = h.client.session().subscribe();

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "ops", "password": "hunter2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "accessToken": "access-1",
                "refreshToken": "refresh-1",
                "user": { "id": 12, "name": "Ops" }
            }
        })))
        .mount(&h.server)
        .await;

    let secret: SecretString = "hunter2".to_string().into();
    let outcome = h.client.login("ops", &secret).await.unwrap();

    assert_eq!(outcome.profile, Some(json!({ "id": 12, "name": "Ops" })));
    assert!(h.client.session().is_logged_in());
    assert_eq!(
        h.store.get(keys::ACCESS_TOKEN).unwrap().as_deref(),
        Some("access-1")
    );
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn);
}

#[tokio::test]
async fn test_login_rejected() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&h.server)
        .await;

    let secret: SecretString = "wrong".to_string().into();
    let result = h.client.login("ops", &secret).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
    assert!(!h.client.session().is_logged_in());
}

#[tokio::test]
async fn test_login_with_unreadable_body_is_deserialization_error() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&h.server)
        .await;

    let secret: SecretString = "hunter2".to_string().into();
    let err = h.client.login("ops", &secret).await.unwrap_err();

    assert!(matches!(err, Error::Deserialization { .. }), "got: {err:?}");
    assert_eq!(err.user_message(), "The server rejected the request.");
    assert!(!h.client.session().is_logged_in());
}

#[tokio::test]
async fn test_logout_clears_even_if_backend_fails() {
    let h = setup_with_tokens(TokenPair::new("access-1", "refresh-1")).await;
    h.client.session().set_active_application("energy").unwrap();
    let mut events = h.client.session().subscribe();

    Mock::given(method("POST"))
        .and(path("/api/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&h.server)
        .await;

    h.client.logout().await.unwrap();

    assert!(h.store.is_empty());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut);
}

// ── Error classification ────────────────────────────────────────────

#[tokio::test]
async fn test_server_error_classified() {
    let h = setup_with_tokens(TokenPair::new("access-1", "refresh-1")).await;

    Mock::given(method("GET"))
        .and(path("/api/electrical/machines"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&h.server)
        .await;

    let err = h.client.list_machines(Domain::Electrical).await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "The server rejected the request.");
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let session = Arc::new(Session::in_memory());
    let client =
        ApiClient::with_client("http://127.0.0.1:1/api", reqwest::Client::new(), session)
            .unwrap();
    client
        .tokens()
        .set_tokens(TokenPair::new("access-1", "refresh-1"))
        .unwrap();

    let result = client.list_machines(Domain::Electrical).await;
    assert!(
        matches!(result, Err(Error::Network(_))),
        "expected Network error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_refresh_without_tokens_makes_no_call() {
    let h = setup().await;
    let mut events = h.client.session().subscribe();
    mount_refresh(&h.server, "unused", 0).await;

    let err = h.client.tokens().refresh_access_token().await.unwrap_err();

    assert!(matches!(err, Error::Authentication { .. }), "got: {err:?}");
    assert!(events.try_recv().is_err());
}

// ── Series endpoints ────────────────────────────────────────────────

#[tokio::test]
async fn test_machine_id_stays_one_path_segment() {
    let h = setup_with_tokens(TokenPair::new("access-1", "refresh-1")).await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&h.server)
        .await;

    h.client
        .trend(Domain::Electrical, "../../auth/x?y=1#", &TrendQuery::new("voltage"))
        .await
        .unwrap();
    h.client
        .logs(Domain::Temperature, "bay/3", &LogQuery::default())
        .await
        .unwrap();

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(
        requests[0].url.path(),
        "/api/electrical/machines/..%2F..%2Fauth%2Fx%3Fy=1%23/trend"
    );
    assert!(
        requests[0].url.query_pairs().all(|(key, _)| key != "y"),
        "{}",
        requests[0].url
    );
    assert_eq!(requests[1].url.path(), "/api/temperature/machines/bay%2F3/logs");
}

#[tokio::test]
async fn test_trend_passes_parameter_and_window() {
    let h = setup_with_tokens(TokenPair::new("access-1", "refresh-1")).await;

    Mock::given(method("GET"))
        .and(path("/api/temperature/machines/42/trend"))
        .and(query_param("parameter", "humidity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "points": [[1, 40.5], [2, 41.0]] },
            "meta": { "unit": "%" }
        })))
        .mount(&h.server)
        .await;

    let env = h
        .client
        .trend(Domain::Temperature, "42", &TrendQuery::new("humidity"))
        .await
        .unwrap();

    assert!(env.success);
    assert_eq!(env.meta, json!({ "unit": "%" }));

    let requests = h.server.received_requests().await.unwrap();
    let query = requests[0].url.query().unwrap_or_default().to_owned();
    assert!(query.contains("start="), "missing start in {query}");
    assert!(query.contains("end="), "missing end in {query}");
}

#[tokio::test]
async fn test_logs_paging() {
    let h = setup_with_tokens(TokenPair::new("access-1", "refresh-1")).await;

    Mock::given(method("GET"))
        .and(path("/api/electrical/machines/7/logs"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "items": [{ "voltage": 229.1 }, { "voltage": 230.4 }] }
        })))
        .mount(&h.server)
        .await;

    let query = LogQuery {
        limit: Some(2),
        offset: Some(4),
        ..LogQuery::default()
    };
    let env = h.client.logs(Domain::Electrical, "7", &query).await.unwrap();

    assert_eq!(env.data["items"].as_array().map(Vec::len), Some(2));
}
