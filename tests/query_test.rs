//! Query hooks and polling against a mock backend

mod common;

use common::{api, mock_client};
use hakwonplus::api::attendance::{AttendanceStatus, AttendanceUpdate};
use hakwonplus::api::submissions::SubmissionStatus;
use hakwonplus::cache::{EntryStatus, QueryKey};
use hakwonplus::query::{QueryClient, QueryState};
use hakwonplus::ui::ExamResultView;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A fresh cached result is served without a second request
#[tokio::test]
async fn test_exam_result_is_cached() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/results/me/exams/11/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "target_type": "exam", "target_id": 11,
            "total_score": 42.0, "max_score": 50.0,
            "items": [], "can_retake": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    let first = queries.use_my_exam_result(11).await.unwrap();
    let second = queries.use_my_exam_result(11).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.total_score, 42.0);

    let stats = queries.cache().stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

/// Exam 42: one request, scores and the retake flag reach the view untouched
#[tokio::test]
async fn test_exam_result_passes_fields_through() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/results/me/exams/42/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "target_type": "exam", "target_id": 42, "enrollment_id": 5,
            "total_score": 73.5, "max_score": 80.0,
            "items": [], "can_retake": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    let state = QueryState::from_result(queries.use_my_exam_result(42).await);
    let result = state.data().unwrap();
    assert_eq!(result.total_score, 73.5);
    assert_eq!(result.max_score, 80.0);
    assert_eq!(result.can_retake, Some(true));

    let view = ExamResultView::from(result);
    assert_eq!(view.total_score, 73.5);
    assert_eq!(view.max_score, 80.0);
    assert!(view.can_retake);
}

/// A missing result sets the error state after a single request
#[tokio::test]
async fn test_exam_result_404_is_not_retried() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/results/me/exams/42/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "없음"})))
        .expect(1)
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    let state = QueryState::from_result(queries.use_my_exam_result(42).await);
    let err = state.error().unwrap();
    assert_eq!(err.status(), Some(404));
    assert!(state.data().is_none());
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// Errors are not cached, the next call hits the network again
#[tokio::test]
async fn test_failed_query_is_retried_next_time() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/media/videos/")))
        .and(query_param("session", "4"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/media/videos/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    assert!(queries.use_session_videos(4).await.is_err());
    assert!(queries.use_session_videos(4).await.unwrap().is_empty());
}

/// Updating a record drops the cached list of its session
#[tokio::test]
async fn test_attendance_update_invalidates() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);

    Mock::given(method("GET"))
        .and(path(api("/lectures/attendance/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "session": 3, "name": "김학생", "status": "ABSENT"}
        ])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(api("/lectures/attendance/1/")))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"id": 1, "session": 3, "name": "김학생", "status": "PRESENT"}),
        ))
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    queries
        .cache()
        .set(&QueryKey::new("attendance-matrix").with(9), &json!({}))
        .unwrap();

    let records = queries.use_attendance(3).await.unwrap();
    assert_eq!(records[0].status, AttendanceStatus::Absent);

    let update = AttendanceUpdate {
        status: Some(AttendanceStatus::Present),
        memo: None,
    };
    let updated = queries.update_attendance(3, 1, &update).await.unwrap();
    assert_eq!(updated.status, AttendanceStatus::Present);
    assert!(queries
        .cache()
        .get(&QueryKey::new("attendance-matrix").with(9))
        .map_or(true, |entry| entry.status == EntryStatus::Invalidated));

    // Invalidated, so this refetches
    queries.use_attendance(3).await.unwrap();
}

/// Polling stops by itself at a terminal submission status
#[tokio::test]
async fn test_submission_polling_stops_when_done() {
    let server = MockServer::start().await;
    let (client, _store) = mock_client(&server);
    let route = api("/submissions/submissions/21/");

    for status in ["submitted", "grading"] {
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 21, "status": status})),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path(route.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 21, "status": "done"})))
        .mount(&server)
        .await;

    let queries = QueryClient::new(client);
    let handle = queries.watch_query(
        QueryKey::new("submission-status").with(21),
        Duration::from_millis(10),
        |client| async move { client.submissions().status(21).await },
        SubmissionStatus::is_terminal,
    );

    match handle.settled().await {
        QueryState::Success(status) => assert_eq!(status, SubmissionStatus::Done),
        other => panic!("unexpected state: {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
    assert_eq!(
        queries
            .cache()
            .get_data::<SubmissionStatus>(&QueryKey::new("submission-status").with(21)),
        Some(SubmissionStatus::Done)
    );
}
