//! Integration tests for the shared API client using wiremock

mod common;

use common::{api, mock_client, signed_in_client};
use hakwonplus::error::Error;
use hakwonplus::http::{ApiError, TENANT_HEADER};
use hakwonplus::storage::{SessionTokens, TENANT_CODE_KEY};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Tenant override and bearer token travel on every request
#[tokio::test]
async fn test_tenant_and_auth_headers() {
    let server = MockServer::start().await;
    let (client, store) = signed_in_client(&server);
    store.set(TENANT_CODE_KEY, "tchul").unwrap();

    Mock::given(method("GET"))
        .and(path(api("/exams/")))
        .and(header(TENANT_HEADER, "tchul"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let exams = client.exams().list(None).await.unwrap();
    assert!(exams.is_empty());
}

/// A 401 triggers exactly one refresh and a replay with the new token
#[tokio::test]
async fn test_refresh_on_unauthorized() {
    let server = MockServer::start().await;
    let (client, store) = signed_in_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/exams/3/")))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "expired"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(api("/token/refresh/")))
        .and(body_json(json!({"refresh": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/exams/3/")))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 3, "title": "단원평가", "exam_type": "regular"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let exam = client.exams().get(3).await.unwrap();
    assert_eq!(exam.id, 3);
    assert_eq!(SessionTokens::access(store.as_ref()).as_deref(), Some("access-2"));
    assert_eq!(SessionTokens::refresh(store.as_ref()).as_deref(), Some("refresh-1"));
}

/// The current-user endpoint never refreshes
#[tokio::test]
async fn test_no_refresh_for_current_user() {
    let server = MockServer::start().await;
    let (client, _store) = signed_in_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/core/me/")))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(api("/token/refresh/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.get::<Value>("/core/me/").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
}

/// The backend's `detail` becomes the error message
#[tokio::test]
async fn test_error_detail_is_surfaced() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/exams/9/")))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"detail": "시험이 마감되었습니다."})),
        )
        .mount(&server)
        .await;

    match client.exams().get(9).await {
        Err(Error::Api(ApiError::Http { status, message })) => {
            assert_eq!(status, 400);
            assert_eq!(message, "시험이 마감되었습니다.");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

/// Paginated and enveloped lists decode; other shapes are reported
#[tokio::test]
async fn test_list_shapes() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/media/videos/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1, "next": null, "previous": null,
            "results": [{"id": 5, "session": 2, "title": "1강", "status": "READY"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(api("/lectures/lectures/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;

    let videos = client.videos().list(2).await.unwrap();
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].title, "1강");

    let err = client.sessions().lectures(&Default::default()).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err:?}");
}

/// Zero ids are rejected before any request is made
#[tokio::test]
async fn test_invalid_id_sends_nothing() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    let err = client.exams().my_result(0).await.unwrap_err();
    assert!(matches!(err, Error::Api(ApiError::InvalidRequest(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
