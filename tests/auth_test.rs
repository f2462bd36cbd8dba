//! Session bootstrap and login against a mock backend

mod common;

use common::{api, mock_client, signed_in_client, user_json};
use hakwonplus::auth::{AuthService, BootstrapOutcome, TenantRole};
use hakwonplus::storage::SessionTokens;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_bootstrap_signed_in() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/core/me/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("teacher")))
        .expect(1)
        .mount(&server)
        .await;

    let auth = AuthService::new(client);
    match auth.bootstrap().await {
        BootstrapOutcome::SignedIn(user) => {
            assert_eq!(user.username, "teacher01");
            assert_eq!(user.tenant_role, Some(TenantRole::Teacher));
        }
        other => panic!("expected signed in, got {other:?}"),
    }
    assert!(auth.current_user().is_some());
}

/// Without a token no request is made
#[tokio::test]
async fn test_bootstrap_without_token() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    let auth = AuthService::new(client);
    assert!(matches!(auth.bootstrap().await, BootstrapOutcome::SignedOut));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

/// A rejected token is cleared and the user is signed out
#[tokio::test]
async fn test_bootstrap_rejected_token_clears_storage() {
    let server = MockServer::start().await;
    let (client, store) = signed_in_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/core/me/")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let auth = AuthService::new(client);
    assert!(matches!(auth.bootstrap().await, BootstrapOutcome::SignedOut));
    assert!(SessionTokens::access(store.as_ref()).is_none());
    assert!(SessionTokens::refresh(store.as_ref()).is_none());
}

/// Server errors keep the tokens and surface as a failed check
#[tokio::test]
async fn test_bootstrap_server_error_keeps_tokens() {
    let server = MockServer::start().await;
    let (client, store) = signed_in_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/core/me/")))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let auth = AuthService::new(client);
    assert!(matches!(auth.bootstrap().await, BootstrapOutcome::Failed(_)));
    assert_eq!(SessionTokens::access(store.as_ref()).as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_login_stores_tokens_and_loads_user() {
    let server = MockServer::start().await;
    let (client, store) = mock_client(&server);

    Mock::given(method("POST"))
        .and(path(api("/token/")))
        .and(body_json(json!({"username": "student01", "password": "pw"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"access": "a1", "refresh": "r1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/core/me/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json("student")))
        .mount(&server)
        .await;

    let auth = AuthService::new(client);
    let user = auth.login("student01", "pw").await.unwrap();
    assert_eq!(user.tenant_role, Some(TenantRole::Student));
    assert_eq!(SessionTokens::access(store.as_ref()).as_deref(), Some("a1"));

    auth.logout();
    assert!(auth.current_user().is_none());
    assert!(SessionTokens::access(store.as_ref()).is_none());
}

#[tokio::test]
async fn test_bad_credentials() {
    let server = MockServer::start().await;
    let (client, store) = mock_client(&server);

    Mock::given(method("POST"))
        .and(path(api("/token/")))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "No active account found with the given credentials"
        })))
        .mount(&server)
        .await;

    let auth = AuthService::new(client);
    let err = auth.login("x", "y").await.unwrap_err();
    assert!(err.is_auth_failure());
    assert!(SessionTokens::access(store.as_ref()).is_none());
}
