// Router-level tests. None of these requests reach the database: they are
// answered by the auth layers or rejected by validation first.

mod common;

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use common::{admin_token, coach_token, json_body, lazy_app, request};

#[tokio::test]
async fn test_health_check_endpoint() {
    let response = lazy_app()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "hoop-academy");
}

#[tokio::test]
async fn test_api_requires_bearer_token() {
    for uri in ["/api/branches", "/api/students", "/api/sessions", "/api/dashboard/stats", "/api/auth/me"] {
        let response = lazy_app()
            .oneshot(request(Method::GET, uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "GET {}", uri);
    }
}

#[tokio::test]
async fn test_invalid_token_rejected() {
    let response = lazy_app()
        .oneshot(request(Method::GET, "/api/coaches", Some("not-a-jwt"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let foreign = hoop_academy::auth::JwtService::new("some-other-secret")
        .create_access_token(Uuid::new_v4(), "admin@academy.ph", hoop_academy::auth::UserRole::Admin, None)
        .unwrap();
    let response = lazy_app()
        .oneshot(request(Method::GET, "/api/coaches", Some(&foreign), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_coach_cannot_reach_admin_routes() {
    let token = coach_token(Uuid::new_v4());
    let some_id = Uuid::new_v4();

    let cases = vec![
        (Method::POST, "/api/branches".to_string(), Some(json!({"name": "Court", "address": "1 St", "city": "Pasig"}))),
        (Method::DELETE, format!("/api/students/{}", some_id), None),
        (Method::POST, format!("/api/students/{}/payments", some_id), Some(json!({"payment_amount": 500.0}))),
        (Method::DELETE, format!("/api/payments/{}", some_id), None),
        (Method::PUT, format!("/api/sessions/{}/participants", some_id), Some(json!({"student_ids": []}))),
        (Method::POST, format!("/api/admin/coaches/{}/account", some_id), None),
    ];

    for (method, uri, body) in cases {
        let response = lazy_app()
            .oneshot(request(method.clone(), &uri, Some(&token), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{} {}", method, uri);
    }
}

#[tokio::test]
async fn test_invalid_branch_rejected_before_database() {
    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            "/api/branches",
            Some(&admin_token()),
            Some(json!({"name": "   ", "address": "1 St", "city": "Pasig"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Branch name cannot be empty");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            "/api/packages",
            Some(&admin_token()),
            Some(json!({"name": "Junior 8", "default_sessions": "eight"})),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_money_rules_rejected_before_database() {
    let student_id = Uuid::new_v4();
    let token = admin_token();

    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            &format!("/api/students/{}/payments", student_id),
            Some(&token),
            Some(json!({"payment_amount": 0.0})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            &format!("/api/students/{}/charges", student_id),
            Some(&token),
            Some(json!({"amount": -20.0, "charge_type": "uniform"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            "/api/students",
            Some(&token),
            Some(json!({
                "name": "Ana Reyes",
                "total_training_fee": 1000.0,
                "downpayment": 1500.0
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_session_times_validated() {
    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            "/api/sessions",
            Some(&admin_token()),
            Some(json!({
                "date": "2024-06-01",
                "start_time": "17:00:00",
                "end_time": "16:00:00",
                "branch_id": Uuid::new_v4()
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = lazy_app()
        .oneshot(request(
            Method::GET,
            "/api/sessions?from=2024-06-10&to=2024-06-01",
            Some(&admin_token()),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_attendance_body_validated_for_coaches() {
    let coach_id = Uuid::new_v4();
    let uri = format!("/api/sessions/{}/attendance/{}", Uuid::new_v4(), Uuid::new_v4());

    let response = lazy_app()
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(&coach_token(coach_id)),
            Some(json!({"status": "present", "session_duration": 30.0})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = lazy_app()
        .oneshot(request(
            Method::PUT,
            &uri,
            Some(&coach_token(coach_id)),
            Some(json!({"status": "late"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_coach_cannot_clock_another_coach() {
    let session_id = Uuid::new_v4();
    let other_coach = Uuid::new_v4();

    let response = lazy_app()
        .oneshot(request(
            Method::PUT,
            &format!("/api/sessions/{}/coach-attendance/{}", session_id, other_coach),
            Some(&coach_token(Uuid::new_v4())),
            Some(json!({"time_in": "2024-06-01T08:00:00Z"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_login_requires_credentials() {
    let response = lazy_app()
        .oneshot(request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({"email": "", "password": ""})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_id_gets_json_error() {
    for (method, uri) in [
        (Method::GET, "/api/students/not-a-uuid"),
        (Method::DELETE, "/api/payments/12345"),
        (Method::GET, "/api/sessions/abc/attendance"),
    ] {
        let response = lazy_app()
            .oneshot(request(method.clone(), uri, Some(&admin_token()), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{} {}", method, uri);
        let body = json_body(response).await;
        assert_eq!(body["error"], "BAD_REQUEST", "{} {}", method, uri);
        assert!(body["message"].is_string());
    }
}
