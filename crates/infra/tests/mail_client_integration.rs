//! Mail client against a mock API, with tokens coming from the real
//! `AuthService` and a temp-dir token store.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use mailauth_common::auth::{CredentialResolver, TokenStore};
use mailauth_common::testing::{
    token_record, MockKeychainProvider, MockTokenExchanger, RedirectBehavior, ScriptedBrowser,
    TempRoots,
};
use mailauth_common::AuthService;
use mailauth_domain::{AuthSettings, TokenScope};
use mailauth_infra::http::{HttpClient, RetryPolicy};
use mailauth_infra::mail::{MailClient, MailError, StaticToken};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_http() -> HttpClient {
    let policy = RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(50),
    };
    HttpClient::new(Duration::from_secs(5), policy).expect("http client")
}

fn auth_service(roots: &TempRoots) -> AuthService {
    let storage = roots.storage_settings();
    let keychain = MockKeychainProvider::with_credentials("client-123", "secret-456");
    let credentials = CredentialResolver::new(&storage, Arc::new(keychain)).expect("resolver");

    AuthService::new(
        AuthSettings::default(),
        credentials,
        TokenStore::new(storage),
        Arc::new(MockTokenExchanger::new()),
        Arc::new(ScriptedBrowser::new(RedirectBehavior::Ignore)),
    )
}

#[tokio::test]
async fn lists_messages_with_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1.0/me/messages"))
        .and(header("authorization", "Bearer stored-access"))
        .and(query_param("$top", "2"))
        .and(query_param("$orderby", "receivedDateTime desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "value": [
                {
                    "id": "m1",
                    "subject": "Welcome",
                    "from": {"emailAddress": {"name": "Ops", "address": "ops@example.com"}},
                    "receivedDateTime": "2026-05-01T08:00:00Z",
                    "isRead": true,
                    "hasAttachments": false
                },
                {"id": "m2", "subject": null}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let roots = TempRoots::new().unwrap();
    let service = auth_service(&roots);
    TokenStore::new(roots.storage_settings())
        .write(&token_record("stored-access", "r1", ChronoDuration::hours(1)), TokenScope::Project)
        .unwrap();

    let client = MailClient::with_http_client(
        fast_http(),
        &format!("{}/v1.0/", server.uri()),
        Arc::new(service),
    );
    let messages = client.list_messages(2).await.unwrap();

    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender(), Some("ops@example.com"));
    assert_eq!(messages[1].subject, None);
}

#[tokio::test]
async fn missing_token_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

    let roots = TempRoots::new().unwrap();
    let client =
        MailClient::with_http_client(fast_http(), &server.uri(), Arc::new(auth_service(&roots)));

    let err = client.list_messages(10).await.unwrap_err();
    assert!(err.requires_login(), "unexpected error: {err:?}");
}

#[tokio::test]
async fn rejected_token_maps_to_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": "InvalidAuthenticationToken", "message": "Access token has expired."}
        })))
        .mount(&server)
        .await;

    let client = MailClient::with_http_client(
        fast_http(),
        &server.uri(),
        Arc::new(StaticToken("stale".to_string())),
    );

    match client.list_messages(5).await {
        Err(MailError::Auth(message)) => assert!(message.contains("InvalidAuthenticationToken")),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn downloads_raw_message_to_file() {
    let server = MockServer::start().await;
    let mime = "From: ops@example.com\r\nSubject: Welcome\r\n\r\nHello\r\n";
    Mock::given(method("GET"))
        .and(path("/me/messages/AAMk%2Fabc%3D/$value"))
        .and(header("authorization", "Bearer t0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(mime))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("welcome.eml");
    let client =
        MailClient::with_http_client(fast_http(), &server.uri(), Arc::new(StaticToken("t0".into())));

    let written = client.download_message("AAMk/abc=", &destination).await.unwrap();

    assert_eq!(written, mime.len() as u64);
    assert_eq!(std::fs::read_to_string(&destination).unwrap(), mime);
}

#[tokio::test]
async fn failed_download_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "error": {"code": "ErrorItemNotFound", "message": "The specified object was not found."}
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("missing.eml");
    let client =
        MailClient::with_http_client(fast_http(), &server.uri(), Arc::new(StaticToken("t0".into())));

    let err = client.download_message("nope", &destination).await.unwrap_err();

    assert!(matches!(err, MailError::Client { status: 404, .. }));
    assert!(!destination.exists());
}

#[tokio::test]
async fn throttled_listing_succeeds_after_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/messages"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": [{"id": "m1"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client =
        MailClient::with_http_client(fast_http(), &server.uri(), Arc::new(StaticToken("t0".into())));

    let messages = client.list_messages(1).await.unwrap();
    assert_eq!(messages[0].id, "m1");
}

#[tokio::test]
async fn persistent_server_errors_surface_after_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client =
        MailClient::with_http_client(fast_http(), &server.uri(), Arc::new(StaticToken("t0".into())));

    let err = client.list_messages(1).await.unwrap_err();
    assert!(matches!(err, MailError::Server { status: 503, .. }));
}
