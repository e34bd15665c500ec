//! Integration tests for the unauthenticated side endpoints and general
//! HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post, secured_config};

#[tokio::test]
async fn health_reports_configuration_flags() {
    let (app, _) = build_test_app(secured_config());

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "rollcall-webhook-receiver");
    assert_eq!(json["authentication"], true);
    assert_eq!(json["hmac_validation"], true);
    assert!(json["port"].is_number());
}

#[tokio::test]
async fn health_requires_no_credentials() {
    let (app, _) = build_test_app(secured_config());

    // No API key, no signature -- still 200.
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_lists_endpoints_and_counts_rejections() {
    let (app, _) = build_test_app(secured_config());

    // One unauthenticated post to bump the rejected counter.
    let rejected = post(
        app.clone(),
        "/webhook",
        &[("content-type", "application/json")],
        "{}",
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);

    let response = get(app, "/metrics").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let endpoints: Vec<_> = json["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert!(endpoints.contains(&"/webhook".to_string()));
    assert!(endpoints.contains(&"/webhook/retry".to_string()));

    assert_eq!(json["counters"]["rejected"], 1);
    assert_eq!(json["counters"]["received"], 0);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let (app, _) = build_test_app(secured_config());

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let (app, _) = build_test_app(secured_config());

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}
