use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use clinical_cell::clinical_routes;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn create_test_app(mock_server: &MockServer) -> Router {
    clinical_routes(TestConfig::with_supabase_url(&mock_server.uri()).to_state())
}

fn bearer(user: &TestUser) -> String {
    let token = JwtTestUtils::create_test_token(user, &TestConfig::default().jwt_secret, Some(1));
    format!("Bearer {}", token)
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn evolution_row(patient_id: &str, objective: &str) -> Value {
    json!({
        "id": Uuid::new_v4(),
        "patient_id": patient_id,
        "psychologist_id": null,
        "content": "Sessão com jogo simbólico",
        "tags": ["Regulação Emocional"],
        "session_date": "2024-06-03T14:00:00Z",
        "metrics": { "objective": objective, "mood_pre": 2, "mood_post": 4, "techniques": [] },
        "created_at": "2024-06-03T15:00:00Z"
    })
}

#[tokio::test]
async fn test_create_evolution_uses_route_patient() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("POST"))
        .and(path("/rest/v1/evolutions_psico"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([evolution_row(&patient_id, "Foco")])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{}/evolutions", patient_id))
        .header("authorization", bearer(&user))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "metrics": { "objective": "Foco", "mood_pre": 2, "mood_post": 4 } }).to_string(),
        ))
        .unwrap();

    let response = create_test_app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let requests = mock_server.received_requests().await.unwrap();
    let rows: Value = requests[0].body_json().unwrap();
    assert_eq!(rows[0]["patient_id"], patient_id);
    assert_eq!(rows[0]["psychologist_id"], user.id);
    assert_eq!(rows[0]["metrics"]["objective"], "Foco");
    assert!(rows[0]["session_date"].is_string());
}

#[tokio::test]
async fn test_empty_evolution_is_rejected_locally() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{}/evolutions", Uuid::new_v4()))
        .header("authorization", bearer(&user))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "content": "  " }).to_string()))
        .unwrap();

    let response = create_test_app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_objective_comes_from_newest_session() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/evolutions_psico"))
        .and(query_param("order", "session_date.desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            evolution_row(&patient_id, "Autonomia"),
            evolution_row(&patient_id, "Vínculo"),
        ])))
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .uri(format!("/patients/{}/evolutions/latest-objective", patient_id))
        .header("authorization", bearer(&user))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["objective"], "Autonomia");
}

#[tokio::test]
async fn test_parents_only_diagnostics_filter() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let patient_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/diagnostics_psico"))
        .and(query_param("share_with_parents", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "patient_id": patient_id,
            "title": "Devolutiva",
            "content": "Boa evolução",
            "diagnostic_type": "observacao",
            "share_with_parents": true
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = Request::builder()
        .uri(format!("/patients/{}/diagnostics?parents_only=true", patient_id))
        .header("authorization", bearer(&user))
        .body(Body::empty())
        .unwrap();

    let response = create_test_app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json(response).await["total"], 1);
}

#[tokio::test]
async fn test_diagnostic_title_is_required() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");

    let request = Request::builder()
        .method("POST")
        .uri(format!("/patients/{}/diagnostics", Uuid::new_v4()))
        .header("authorization", bearer(&user))
        .header("content-type", "application/json")
        .body(Body::from(json!({ "title": "" }).to_string()))
        .unwrap();

    let response = create_test_app(&mock_server).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
