mod common;

use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use common::{Failure, FailingStore, fixture};
use ratelimit_service::{AppState, ratelimiter::TokenBucketLimiter, routes};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: axum::Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn check_endpoint_returns_decision() {
    let f = fixture();
    let app = routes::router(AppState::new(f.limiter.clone()));

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/v1/ratelimit/check",
        Some(json!({"key": "user:1", "limit": 1, "window_seconds": 60, "namespace": "web"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);
    assert_eq!(body["resp_data"]["allowed"], true);
    assert_eq!(body["resp_data"]["remaining"], 0);
    assert_eq!(body["resp_data"]["limit"], 1);
    assert!(body["resp_data"].get("retry_after_seconds").is_none());

    let (status, body) = send(
        app,
        Method::POST,
        "/v1/ratelimit/check",
        Some(json!({"key": "user:1", "limit": 1, "window_seconds": 60, "namespace": "web"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["allowed"], false);
    assert_eq!(body["resp_data"]["retry_after_seconds"], 60);
}

#[tokio::test]
async fn invalid_request_is_bad_request() {
    let f = fixture();
    let app = routes::router(AppState::new(f.limiter.clone()));

    let (status, body) = send(
        app,
        Method::POST,
        "/v1/ratelimit/check",
        Some(json!({"key": "k", "limit": 0, "window_seconds": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 1000);
    assert_eq!(f.store.calls(), 0);
}

#[tokio::test]
async fn bucket_snapshot_and_reset() {
    let f = fixture();
    let app = routes::router(AppState::new(f.limiter.clone()));

    send(
        app.clone(),
        Method::POST,
        "/v1/ratelimit/check",
        Some(json!({"key": "u", "limit": 4, "window_seconds": 60})),
    )
    .await;

    let (status, body) = send(app.clone(), Method::GET, "/v1/ratelimit/buckets/u", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"]["tokens"], 3.0);

    let (status, _) = send(app.clone(), Method::DELETE, "/v1/ratelimit/buckets/u", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(app, Method::GET, "/v1/ratelimit/buckets/u", None).await;
    assert_eq!(body["resp_data"]["tokens"], 0.0);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let limiter = TokenBucketLimiter::new(Arc::new(FailingStore(Failure::Unreachable)));
    let app = routes::router(AppState::new(limiter));

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/v1/ratelimit/check",
        Some(json!({"key": "k", "limit": 5, "window_seconds": 60})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], 5000);
    assert!(!body["msg"].as_str().unwrap().contains("refused"));

    let (status, body) = send(app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 5003);
}

#[tokio::test]
async fn health_is_ok_when_store_answers() {
    let f = fixture();
    let app = routes::router(AppState::new(f.limiter.clone()));
    let (status, body) = send(app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resp_data"], "ok");
}
