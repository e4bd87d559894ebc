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

use appointment_cell::router::appointment_routes;
use shared_utils::test_utils::{JwtTestUtils, MockSupabaseResponses, TestConfig, TestUser};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments_psico";

fn create_test_app(mock_server: &MockServer) -> Router {
    appointment_routes(TestConfig::with_supabase_url(&mock_server.uri()).to_state())
}

fn bearer(user: &TestUser) -> String {
    let config = TestConfig::default();
    format!("Bearer {}", JwtTestUtils::create_test_token(user, &config.jwt_secret, Some(1)))
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn booking_body(psychologist_id: &str, slot: &str, phone: &str) -> Body {
    Body::from(
        json!({
            "psychologist_id": psychologist_id,
            "date": "2024-06-05",
            "slot": slot,
            "name": "Ana Souza",
            "phone": phone,
        })
        .to_string(),
    )
}

#[tokio::test]
async fn test_availability_excludes_booked_slots() {
    let mock_server = MockServer::start().await;
    let psychologist_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("date", "eq.2024-06-05"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &psychologist_id,
                "2024-06-05",
                "13:00:00",
                "14:00:00"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .uri("/availability?date=2024-06-05")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["weekday"], 3);
    assert_eq!(body["available"], true);
    assert_eq!(
        body["slots"],
        json!(["14:00", "15:00", "16:00", "17:00", "18:00", "19:00", "20:00", "21:00"])
    );
    assert!(body["fallback_contact_url"].is_null());
}

#[tokio::test]
async fn test_closed_day_offers_chat_without_backend_call() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let request = Request::builder()
        .uri("/availability?date=2024-06-02")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["available"], false);
    assert_eq!(body["slots"], json!([]));
    assert!(body["fallback_contact_url"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/5554999999999?text="));

    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_availability_fetch_failure_is_not_an_empty_day() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "cold start" })))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .uri("/availability?date=2024-06-03")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    // one attempt plus two retries from the fast test policy
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_public_booking_writes_confirmed_walk_in() {
    let mock_server = MockServer::start().await;
    let psychologist_id = Uuid::new_v4().to_string();
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let mut created = MockSupabaseResponses::appointment_response(
        &appointment_id,
        &psychologist_id,
        "2024-06-05",
        "14:00:00",
        "15:00:00",
    );
    created["status"] = json!("confirmado");

    Mock::given(method("POST"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([created])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("POST")
        .uri("/book")
        .header("content-type", "application/json")
        .body(booking_body(&psychologist_id, "14:00", "(54) 99999-0000"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json(response).await;
    assert_eq!(body["appointment"]["id"], appointment_id);
    assert!(body["whatsapp_url"].as_str().unwrap().starts_with("https://wa.me/5554999999999?text="));

    let requests = mock_server.received_requests().await.unwrap();
    let insert = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("insert request");
    let rows: Value = insert.body_json().unwrap();
    let row = &rows[0];

    assert_eq!(row["status"], "confirmado");
    assert_eq!(row["start_time"], "14:00");
    assert_eq!(row["end_time"], "15:00");
    assert_eq!(row["patient_name_manual"], "Ana Souza");
    assert_eq!(row["phone_manual"], "54999990000");
    assert_eq!(row["session_type"], "individual");
    assert_eq!(row["notes"], "Agendado via site. WhatsApp: (54) 99999-0000");
    assert!(row.get("patient_id").is_none());
}

#[tokio::test]
async fn test_public_booking_rejects_taken_slot() {
    let mock_server = MockServer::start().await;
    let psychologist_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &psychologist_id,
                "2024-06-05",
                "14:00:00",
                "15:00:00"
            )
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("POST")
        .uri("/book")
        .header("content-type", "application/json")
        .body(booking_body(&psychologist_id, "14:00", "54999990000"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let body = read_json(response).await;
    let fallback = body["fallback_contact_url"].as_str().unwrap();
    assert!(fallback.starts_with("https://wa.me/5554999999999?text="));
}

#[tokio::test]
async fn test_public_booking_validates_before_any_backend_call() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let request = Request::builder()
        .method("POST")
        .uri("/book")
        .header("content-type", "application/json")
        .body(booking_body(&Uuid::new_v4().to_string(), "14:00", "1234"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_agenda_requires_authentication() {
    let mock_server = MockServer::start().await;
    let app = create_test_app(&mock_server);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_agenda_list_is_ordered_by_date_and_time() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("order", "date.asc,start_time.asc"))
        .and(query_param("date", "gte.2024-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &Uuid::new_v4().to_string(),
                &user.id,
                "2024-06-03",
                "13:00:00",
                "14:00:00"
            )
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .uri("/?from=2024-06-01")
        .header("authorization", bearer(&user))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_completed_appointment_cannot_be_canceled() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    let mut row = MockSupabaseResponses::appointment_response(
        &appointment_id,
        &user.id,
        "2024-06-03",
        "13:00:00",
        "14:00:00",
    );
    row["status"] = json!("realizado");

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(APPOINTMENTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("POST")
        .uri(format!("/{}/cancel", appointment_id))
        .header("authorization", bearer(&user))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_reschedule_returns_appointment_to_scheduled() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    let mut current = MockSupabaseResponses::appointment_response(
        &appointment_id,
        &user.id,
        "2024-06-03",
        "13:00:00",
        "14:00:00",
    );
    current["status"] = json!("confirmado");

    let updated = MockSupabaseResponses::appointment_response(
        &appointment_id,
        &user.id,
        "2024-06-10",
        "15:00:00",
        "16:00:00",
    );

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([current])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/{}/reschedule", appointment_id))
        .header("authorization", bearer(&user))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "date": "2024-06-10", "start_time": "15:00", "end_time": "16:00" }).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["date"], "2024-06-10");

    let requests = mock_server.received_requests().await.unwrap();
    let patch = requests.iter().find(|r| r.method.as_str() == "PATCH").unwrap();
    let sent: Value = patch.body_json().unwrap();
    assert_eq!(sent["status"], "agendado");
    assert_eq!(sent["start_time"], "15:00");
}

#[tokio::test]
async fn test_site_booking_whatsapp_link() {
    let mock_server = MockServer::start().await;
    let user = TestUser::psychologist("dra@example.com");
    let appointment_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path(APPOINTMENTS_PATH))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_response(
                &appointment_id,
                &user.id,
                "2024-06-05",
                "14:00:00",
                "15:00:00"
            )
        ])))
        .mount(&mock_server)
        .await;

    let app = create_test_app(&mock_server);
    let request = Request::builder()
        .uri(format!("/{}/whatsapp", appointment_id))
        .header("authorization", bearer(&user))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    let url = body["whatsapp_url"].as_str().unwrap();
    assert!(url.starts_with("https://wa.me/5554999990000?text="));
}
