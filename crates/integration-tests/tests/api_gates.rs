//! Integration tests for the REST API's token and role gates.
//!
//! Every request here is answered before the handler touches the database,
//! so the router runs against a pool that never connects.

#![allow(clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeDelta, Utc};

use cms_core::Role;
use cms_integration_tests::{api_app, body_json, body_text, profile, send, token_for};

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    request.body(Body::empty()).unwrap()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_is_public() {
    let (app, _) = api_app();
    let response = send(app, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_responses_carry_security_headers_and_request_id() {
    let (app, _) = api_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = api_app();
    let response = send(app, get("/contraband", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Bearer Token
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_token() {
    for uri in [
        "/users",
        "/users/me",
        "/categories",
        "/contraband-items",
        "/messages",
        "/audit-logs",
    ] {
        let (app, _) = api_app();
        let response = send(app, get(uri, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");

        let body = body_json(response).await;
        assert_eq!(body["error"], "Missing bearer token", "{uri}");
    }
}

#[tokio::test]
async fn test_garbage_token_is_rejected() {
    let (app, _) = api_app();
    let response = send(app, get("/users", Some("not-a-jwt"))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let (app, state) = api_app();
    let token = token_for(&state, Role::Admin);
    let request = Request::builder()
        .uri("/users")
        .header(header::AUTHORIZATION, format!("Basic {token}"))
        .body(Body::empty())
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_reports_session_expired() {
    let (app, state) = api_app();
    let issued = Utc::now() - TimeDelta::hours(3);
    let token = state.tokens().issue(&profile(Role::Admin), issued).unwrap();

    let response = send(app, get("/audit-logs", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Session expired");
}

#[tokio::test]
async fn test_token_from_another_deployment_is_rejected() {
    let (_, other) = api_app();
    let token = token_for(&other, Role::Admin);

    // Same secret, but a different issuer is configured here.
    let mut config = cms_integration_tests::api_config();
    config.jwt.issuer = "other-cms".to_string();
    let pool = cms_api::db::create_lazy_pool(&config.database_url).unwrap();
    let app = cms_api::app(cms_api::state::AppState::new(config, pool));

    let response = send(app, get("/audit-logs", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Invalid token");
}

// =============================================================================
// Role Gates
// =============================================================================

#[tokio::test]
async fn test_audit_trail_is_forbidden_without_audit_role() {
    for role in [Role::FieldOfficer, Role::Supervisor, Role::WarehouseManager] {
        let (app, state) = api_app();
        let token = token_for(&state, role);
        let response = send(app, get("/audit-logs", Some(&token))).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role:?}");
        assert_eq!(
            body_json(response).await["error"],
            "Your role does not allow you to view the audit trail"
        );
    }
}

#[tokio::test]
async fn test_approvals_are_forbidden_for_field_roles() {
    for role in [Role::FieldOfficer, Role::WarehouseManager] {
        let (app, state) = api_app();
        let token = token_for(&state, role);
        let response = send(app, get("/messages/approvals", Some(&token))).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{role:?}");
    }
}

#[tokio::test]
async fn test_evidence_upload_is_forbidden_for_auditors() {
    let (app, state) = api_app();
    let token = token_for(&state, Role::Auditor);
    let body = "--cms-boundary\r\n\
                Content-Disposition: form-data; name=\"contraband_id\"\r\n\r\n\
                3f1c9a52-7a8e-4f0e-9a53-2d1b8f0c6e11\r\n\
                --cms-boundary--\r\n";
    let request = Request::builder()
        .method("POST")
        .uri("/files/upload")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            "multipart/form-data; boundary=cms-boundary",
        )
        .body(Body::from(body))
        .unwrap();
    let response = send(app, request).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await["error"],
        "Your role does not allow you to change item status"
    );
}
