use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use monitoring_cell::{monitoring_routes, ConnectivityMonitor};
use shared_utils::test_utils::TestConfig;

fn monitor_for(mock_server: &MockServer) -> Arc<ConnectivityMonitor> {
    let state = TestConfig::with_supabase_url(&mock_server.uri()).to_state();
    Arc::new(ConnectivityMonitor::new(state.supabase.clone()))
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_probe_success_keeps_banner_hidden() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles_psico"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "p1" }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let monitor = monitor_for(&mock_server);
    let status = monitor.probe().await;

    assert!(status.online);
    assert!(status.banner.is_none());
    assert!(status.last_checked.is_some());
    assert!(!monitor.is_offline().await);
}

#[tokio::test]
async fn test_outage_flips_offline_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles_psico"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
        .expect(3)
        .mount(&mock_server)
        .await;

    let monitor = monitor_for(&mock_server);
    let status = monitor.probe().await;

    assert!(!status.online);
    assert!(status.banner.as_deref().unwrap().contains("CONEXÃO INSTÁVEL"));
    assert_eq!(status.consecutive_failures, 1);
    assert!(monitor.is_offline().await);
}

#[tokio::test]
async fn test_recovery_clears_failures() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles_psico"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Invalid API key" })))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/profiles_psico"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let monitor = monitor_for(&mock_server);
    assert!(!monitor.probe().await.online);

    let recovered = monitor.probe().await;
    assert!(recovered.online);
    assert_eq!(recovered.consecutive_failures, 0);
    assert!(recovered.last_error.is_none());
}

#[tokio::test]
async fn test_status_route_reports_last_probe_without_calling_backend() {
    let mock_server = MockServer::start().await;
    let monitor = monitor_for(&mock_server);

    let request = Request::builder().uri("/status").body(Body::empty()).unwrap();
    let response = monitoring_routes(monitor).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["online"], true);
    assert!(body["banner"].is_null());
    assert!(body["last_checked"].is_null());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health_route() {
    let mock_server = MockServer::start().await;

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = monitoring_routes(monitor_for(&mock_server)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["status"], "ok");
}
