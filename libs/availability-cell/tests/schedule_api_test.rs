use std::sync::Arc;

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

use availability_cell::router::availability_routes;
use shared_utils::test_utils::{JwtTestUtils, MockStoreResponses, TestConfig, TestUser};

async fn setup() -> (MockServer, Router, TestConfig) {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_store_url(&mock_server.uri());
    let app = availability_routes(config.to_arc());
    (mock_server, app, config)
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn slot_listing_marks_booked_times() {
    let (mock_server, app, config) = setup().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockStoreResponses::availability_response(&doctor_id)
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", "eq.2025-06-02"))
        .and(query_param("status", "in.(pending,scheduled,confirmed)"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{ "time": "10:00" }])),
        )
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let response = app
        .oneshot(get(
            &format!("/{}/slots?date=2025-06-02", doctor_id),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let slots = body["slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);

    let booked = slots.iter().find(|s| s["time"] == "10:00").unwrap();
    assert_eq!(booked["available"], json!(false));
    let free = slots.iter().find(|s| s["time"] == "10:30").unwrap();
    assert_eq!(free["available"], json!(true));
}

#[tokio::test]
async fn slot_listing_is_empty_without_availability_document() {
    let (mock_server, app, config) = setup().await;
    let doctor_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);

    let response = app
        .oneshot(get(
            &format!("/{}/slots?date=2025-06-02", doctor_id),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["slots"], json!([]));
}

#[tokio::test]
async fn weekly_schedule_update_rejects_inverted_hours() {
    let (_mock_server, app, config) = setup().await;
    let doctor = TestUser::doctor("doctor@example.com");
    let token = JwtTestUtils::create_test_token(&doctor, &config.jwt_secret, None);

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/weekly", doctor.id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({
                "weekly_schedule": [{
                    "day": "Monday",
                    "start_time": "17:00",
                    "end_time": "09:00",
                    "is_available": true,
                    "max_appointments": 1
                }]
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn doctors_cannot_edit_each_others_schedules() {
    let (_mock_server, app, config) = setup().await;
    let intruder = TestUser::doctor("other@example.com");
    let token = JwtTestUtils::create_test_token(&intruder, &config.jwt_secret, None);
    let victim_id = Uuid::new_v4();

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/{}/weekly", victim_id))
        .header("Authorization", format!("Bearer {}", token))
        .header("Content-Type", "application/json")
        .body(Body::from(
            json!({ "weekly_schedule": MockStoreResponses::default_weekly_schedule() })
                .to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
    let (_mock_server, app, _config) = setup().await;
    let doctor_id = Uuid::new_v4();

    let request = Request::builder()
        .method("GET")
        .uri(format!("/{}/slots?date=2025-06-02", doctor_id))
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let (_mock_server, app, config) = setup().await;
    let patient = TestUser::patient("patient@example.com");
    let token = JwtTestUtils::create_expired_token(&patient, &config.jwt_secret);
    let doctor_id = Uuid::new_v4();

    let response = app
        .oneshot(get(
            &format!("/{}/slots?date=2025-06-02", doctor_id),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
