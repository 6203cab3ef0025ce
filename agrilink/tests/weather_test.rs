//! Weather client tests against a local stub endpoint.

mod common;

use agrilink::{AgriError, WeatherClient};
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use common::spawn_stub;
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_stalled_endpoint_times_out() {
    let addr = spawn_stub(Router::new().route(
        "/forecast",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            axum::Json(json!({}))
        }),
    ))
    .await;
    let client = WeatherClient::new(
        reqwest::Client::new(),
        format!("http://{addr}/forecast"),
        Duration::from_millis(200),
    );

    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(5), client.fetch())
        .await
        .expect("fetch must give up on its own");

    assert!(matches!(result, Err(AgriError::Weather(_))));
    assert!(result.unwrap_err().is_retryable());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_missing_key_is_explained() {
    let addr = spawn_stub(Router::new().route(
        "/forecast",
        get(|| async {
            (
                StatusCode::FORBIDDEN,
                axum::Json(json!({"error": {"code": 2008, "message": "API key has been disabled."}})),
            )
        }),
    ))
    .await;
    let client = WeatherClient::new(
        reqwest::Client::new(),
        format!("http://{addr}/forecast"),
        Duration::from_secs(5),
    );

    match client.fetch().await {
        Err(AgriError::Weather(message)) => assert!(message.contains("key="), "{message}"),
        other => panic!("expected Weather error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_report_with_advisory() {
    let addr = spawn_stub(Router::new().route(
        "/forecast",
        get(|| async {
            axum::Json(json!({
                "location": {"name": "Colombo"},
                "current": {"temp_c": 29.4, "humidity": 79, "condition": {"text": "Patchy rain nearby"}},
                "alerts": {"alert": [{"headline": "", "desc": "Avoid spraying before noon"}]}
            }))
        }),
    ))
    .await;
    let client = WeatherClient::new(
        reqwest::Client::new(),
        format!("http://{addr}/forecast"),
        Duration::from_secs(5),
    );

    let report = client.fetch().await.unwrap();
    assert_eq!(report.location, "Colombo");
    // An empty headline falls back to the description.
    assert_eq!(report.advisory.as_deref(), Some("Avoid spraying before noon"));
}
