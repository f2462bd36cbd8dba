//! Common test utilities

use hakwonplus::http::ApiClient;
use hakwonplus::storage::{MemoryStore, SessionTokens, SharedStore};
use serde_json::{json, Value};
use wiremock::MockServer;

/// Client against a mock server with an empty in-memory store
#[allow(dead_code)]
pub fn mock_client(server: &MockServer) -> (ApiClient, SharedStore) {
    let store = MemoryStore::shared();
    let client = ApiClient::with_base_url(&server.uri(), store.clone()).unwrap();
    (client, store)
}

/// Client whose store already holds an access and refresh token
#[allow(dead_code)]
pub fn signed_in_client(server: &MockServer) -> (ApiClient, SharedStore) {
    let (client, store) = mock_client(server);
    SessionTokens::store(store.as_ref(), "access-1", Some("refresh-1")).unwrap();
    (client, store)
}

/// Full path of an API route on the mock server
#[allow(dead_code)]
pub fn api(path: &str) -> String {
    format!("/api/v1{path}")
}

#[allow(dead_code)]
pub fn user_json(role: &str) -> Value {
    json!({
        "id": 7,
        "username": "teacher01",
        "email": "t@example.com",
        "is_staff": false,
        "tenant_role": role
    })
}

#[allow(dead_code)]
pub fn program_json() -> Value {
    json!({
        "tenant_code": "2_limglish",
        "display_name": "림글리시",
        "ui_config": {
            "login_title": "림글리시 로그인",
            "primary_color": "#123456",
            "window_title": "림글리시"
        },
        "feature_flags": {"omr": true},
        "is_active": true
    })
}
