//! Integration tests for the auth module
//!
//! Drives `AuthService` with the real HTTP token client against a wiremock
//! token endpoint, a scripted browser against the real callback listener,
//! and token files under temporary roots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use mailauth_common::auth::{
    generate_code_challenge, AuthService, CredentialResolver, OAuthClient, TokenStore,
};
use mailauth_common::testing::{
    free_port, token_record, MockKeychainProvider, ScriptedBrowser, TempRoots,
};
use mailauth_domain::{AuthError, AuthSettings, TokenScope};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Setup {
    roots: TempRoots,
    server: MockServer,
    browser: ScriptedBrowser,
    service: AuthService,
}

async fn setup(browser: ScriptedBrowser) -> Setup {
    let server = MockServer::start().await;
    let roots = TempRoots::new().unwrap();
    let storage = roots.storage_settings();

    let settings = AuthSettings {
        authorize_url: format!("{}/oauth2/v2.0/authorize", server.uri()),
        token_url: format!("{}/oauth2/v2.0/token", server.uri()),
        redirect_host: "127.0.0.1".to_string(),
        redirect_port: free_port().unwrap(),
        callback_timeout_secs: 5,
        ..AuthSettings::default()
    };

    let keychain = MockKeychainProvider::with_credentials("client-abc", "s3cret");
    let service = AuthService::new(
        settings.clone(),
        CredentialResolver::new(&storage, Arc::new(keychain)).unwrap(),
        TokenStore::new(storage),
        Arc::new(OAuthClient::new(settings).unwrap()),
        Arc::new(browser.clone()),
    );

    Setup { roots, server, browser, service }
}

async fn token_requests(server: &MockServer) -> Vec<HashMap<String, String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| url::form_urlencoded::parse(&request.body).into_owned().collect())
        .collect()
}

fn query(url: &str) -> HashMap<String, String> {
    url::Url::parse(url).unwrap().query_pairs().into_owned().collect()
}

/// Credentials present, browser approves with `code=ABC` and the matching
/// state: the code is exchanged exactly once with the original verifier and
/// the record lands in the project scope with an absolute expiry.
#[tokio::test]
async fn test_end_to_end_login() {
    let s = setup(ScriptedBrowser::approving("ABC")).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "graph-access",
            "refresh_token": "graph-refresh",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&s.server)
        .await;

    let before = Utc::now();
    let written = s.service.authenticate(TokenScope::Project, None, |_| {}).await.unwrap();
    let after = Utc::now();

    let opened = s.browser.opened();
    let authorize = query(&opened[0].0);
    assert_eq!(authorize["client_id"], "client-abc");
    assert_eq!(authorize["response_type"], "code");
    assert_eq!(authorize["response_mode"], "query");
    assert_eq!(authorize["code_challenge_method"], "S256");

    let requests = token_requests(&s.server).await;
    assert_eq!(requests.len(), 1);
    let form = &requests[0];
    assert_eq!(form["code"], "ABC");
    assert_eq!(form["client_id"], "client-abc");
    assert_eq!(form["client_secret"], "s3cret");
    assert_eq!(form["redirect_uri"], authorize["redirect_uri"]);
    assert_eq!(generate_code_challenge(&form["code_verifier"]), authorize["code_challenge"]);

    assert_eq!(written, s.roots.project.path().join(".mailauth/token.json"));
    let (record, scope) = s.service.store().read(None).unwrap();
    assert_eq!(scope, TokenScope::Project);
    assert_eq!(record.access_token, "graph-access");
    assert_eq!(record.refresh_token, "graph-refresh");

    let expires_ms = record.expires_at.timestamp_millis();
    assert!(expires_ms >= before.timestamp_millis() + 3_600_000 - 1);
    assert!(expires_ms <= after.timestamp_millis() + 3_600_000);

    let gitignore = std::fs::read_to_string(s.roots.project.path().join(".gitignore")).unwrap();
    assert!(gitignore.lines().any(|line| line == ".mailauth/"));
}

/// A provider error reported in-band with HTTP 200 fails the login and
/// writes nothing.
#[tokio::test]
async fn test_in_band_exchange_error_persists_nothing() {
    let s = setup(ScriptedBrowser::approving("ABC")).await;

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "AADSTS70008: The provided authorization code has expired."
        })))
        .mount(&s.server)
        .await;

    let result = s.service.authenticate(TokenScope::Global, None, |_| {}).await;

    match result {
        Err(AuthError::TokenExchangeFailed { error, .. }) => assert_eq!(error, "invalid_grant"),
        other => panic!("expected TokenExchangeFailed, got {other:?}"),
    }
    assert!(matches!(s.service.store().read(None), Err(AuthError::TokenNotFound)));
}

/// Ten minutes of validity left: no token request at all.
#[tokio::test]
async fn test_fresh_token_makes_no_requests() {
    let s = setup(ScriptedBrowser::approving("unused")).await;
    let stored = token_record("cached", "r1", Duration::minutes(10));
    s.service.store().write(&stored, TokenScope::Global).unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&s.server)
        .await;

    assert_eq!(s.service.get_valid_access_token().await.unwrap(), "cached");
    assert!(s.browser.opened().is_empty());
}

/// Four minutes left: exactly one refresh, written back to the scope it was
/// read from, keeping the refresh token the provider did not rotate.
#[tokio::test]
async fn test_expiring_token_refreshes_once() {
    let s = setup(ScriptedBrowser::approving("unused")).await;
    s.service
        .store()
        .write(&token_record("stale", "r1", Duration::minutes(4)), TokenScope::Global)
        .unwrap();

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "renewed",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&s.server)
        .await;

    assert_eq!(s.service.get_valid_access_token().await.unwrap(), "renewed");

    let requests = token_requests(&s.server).await;
    assert_eq!(requests[0]["refresh_token"], "r1");
    assert!(requests[0].contains_key("scope"));

    let (record, scope) = s.service.store().read(None).unwrap();
    assert_eq!(scope, TokenScope::Global);
    assert_eq!(record.access_token, "renewed");
    assert_eq!(record.refresh_token, "r1");
    assert_eq!(record.token_type, "Bearer");
    assert!(!s.roots.project.path().join(".mailauth").exists());
}

/// A rejected refresh token surfaces as `TokenExchangeFailed` and the old
/// record stays on disk.
#[tokio::test]
async fn test_rejected_refresh_keeps_old_record() {
    let s = setup(ScriptedBrowser::approving("unused")).await;
    let stored = token_record("stale", "revoked", Duration::minutes(-1));
    s.service.store().write(&stored, TokenScope::Project).unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token revoked"
        })))
        .mount(&s.server)
        .await;

    let err = s.service.get_valid_access_token().await.unwrap_err();
    assert!(err.requires_login());
    assert_eq!(s.service.store().read(None).unwrap().0, stored);
}

/// A token endpoint outage is a transport failure, not a provider denial.
#[tokio::test]
async fn test_token_endpoint_outage_is_transport() {
    let s = setup(ScriptedBrowser::approving("unused")).await;
    s.service
        .store()
        .write(&token_record("stale", "r1", Duration::minutes(1)), TokenScope::Global)
        .unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&s.server)
        .await;

    assert!(matches!(s.service.get_valid_access_token().await, Err(AuthError::Transport(_))));
}

/// Project beats global; removing the project record falls back to global.
#[tokio::test]
async fn test_scope_resolution_through_service() {
    let s = setup(ScriptedBrowser::approving("unused")).await;
    s.service
        .store()
        .write(&token_record("global-token", "g", Duration::hours(1)), TokenScope::Global)
        .unwrap();
    s.service
        .store()
        .write(&token_record("project-token", "p", Duration::hours(1)), TokenScope::Project)
        .unwrap();

    assert_eq!(s.service.get_valid_access_token().await.unwrap(), "project-token");

    assert!(s.service.logout(TokenScope::Project).unwrap());
    assert_eq!(s.service.get_valid_access_token().await.unwrap(), "global-token");

    let status = s.service.status().unwrap();
    assert_eq!(status.scope, Some(TokenScope::Global));
    assert!(status.credentials_configured);
}
