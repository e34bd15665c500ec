use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use rollcall_api::config::ReceiverConfig;
use rollcall_api::listener::{WebhookEvent, WebhookListener};
use rollcall_api::router::build_router;
use rollcall_api::state::AppState;

/// API key used by the secured test configuration.
pub const TEST_API_KEY: &str = "test-key";

/// HMAC secret used by the secured test configuration.
pub const TEST_HMAC_SECRET: &str = "s3cret";

/// Build a `ReceiverConfig` with both auth checks enabled.
pub fn secured_config() -> ReceiverConfig {
    ReceiverConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_key: Some(TEST_API_KEY.to_string()),
        hmac_secret: Some(TEST_HMAC_SECRET.to_string()),
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
    }
}

/// Build a `ReceiverConfig` with both auth checks disabled.
pub fn open_config() -> ReceiverConfig {
    ReceiverConfig {
        api_key: None,
        hmac_secret: None,
        ..secured_config()
    }
}

/// Listener that records every accepted event.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<WebhookEvent>>,
}

impl RecordingListener {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

impl WebhookListener for RecordingListener {
    fn on_event(&self, event: &WebhookEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Build the full application router with all middleware layers.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack that production uses.
pub fn build_test_app(config: ReceiverConfig) -> (Router, Arc<RecordingListener>) {
    let listener = Arc::new(RecordingListener::default());
    let state = AppState::new(config, Arc::clone(&listener) as Arc<dyn WebhookListener>);
    (build_router(state), listener)
}

/// Drive one GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Drive one POST through the router with the given headers and body.
pub async fn post(app: Router, uri: &str, headers: &[(&str, &str)], body: &str) -> Response {
    let mut builder = Request::builder().method("POST").uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    app.oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert a structured error response: status plus machine-readable code.
pub async fn assert_error(response: Response, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}
