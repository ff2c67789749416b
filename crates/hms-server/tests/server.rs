//! End-to-end tests against a real server on an ephemeral port.

use hms_server::{Method, MockServer, ServerConfig, Status};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

async fn start_server() -> MockServer {
    let mut config = ServerConfig::default();
    config.listen.port = 0;
    MockServer::start(&config)
        .await
        .expect("Failed to start mock server")
}

fn client() -> Client {
    Client::builder()
        .no_proxy()
        .timeout(TEST_TIMEOUT)
        .build()
        .unwrap()
}

async fn expect(client: &Client, server: &MockServer, rule: serde_json::Value) {
    let response = client
        .post(server.url("/__expect"))
        .json(&rule)
        .send()
        .await
        .expect("Failed to register expectation");
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Failed to register expectation: {}",
        response.text().await.unwrap_or_default()
    );
}

async fn check(client: &Client, server: &MockServer) -> (StatusCode, String) {
    let response = client.get(server.url("/__check")).send().await.unwrap();
    (response.status(), response.text().await.unwrap())
}

#[tokio::test]
async fn test_round_trip() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/server/1"}, "response": {"status": 200, "body": "hello"}}),
    )
    .await;

    for _ in 0..2 {
        let response = client.get(server.url("/server/1")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/html"
        );
        assert_eq!(response.text().await.unwrap(), "hello");
    }

    let (status, body) = check(&client, &server).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "All expectations met");
}

#[tokio::test]
async fn test_limit_boundary_and_reset() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/server/2", "limit": 1}, "response": {"status": 400}}),
    )
    .await;

    let response = client.get(server.url("/server/2")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = check(&client, &server).await;
    assert_eq!(status, StatusCode::OK);

    // The registry was reset by the check
    let response = client.get(server.url("/server/2")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_limit_overrun_reported() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/once", "limit": 1}, "response": {"status": 200}}),
    )
    .await;
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/twice", "limit": 2}, "response": {"status": 200}}),
    )
    .await;

    assert_eq!(
        client.get(server.url("/once")).send().await.unwrap().status(),
        StatusCode::OK
    );
    let response = client.get(server.url("/once")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.text().await.unwrap(),
        "Request limit for \"/once\" already exceeded"
    );

    let (status, body) = check(&client, &server).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let failures: Vec<String> = serde_json::from_str(&body).unwrap();
    assert_eq!(
        failures,
        vec![
            "Too many requests to \"/once\". Expected 1 but received 2".to_string(),
            "Too few requests to \"/twice\". Expected 2 but received 0".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_regex_uri() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({"request": {"uri": "regexp:/items/[0-9]+"}, "response": {"status": 200, "body": "item"}}),
    )
    .await;

    let response = client.get(server.url("/items/42")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get(server.url("/items/abc")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_headers_subset_and_first_match_wins() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({
            "request": {"uri": "/h", "method": "GET", "headers": {"X-Api-Key": "k1"}},
            "response": {"status": 200, "body": "with key", "headers": {"X-Trace": "t-1"}}
        }),
    )
    .await;
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/h"}, "response": {"status": 202, "body": "fallback"}}),
    )
    .await;

    let response = client
        .get(server.url("/h"))
        .header("x-api-key", "k1")
        .header("accept", "*/*")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-trace").unwrap(), "t-1");
    assert_eq!(response.text().await.unwrap(), "with key");

    let response = client.get(server.url("/h")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.text().await.unwrap(), "fallback");
}

#[tokio::test]
async fn test_unmatched_request_fails_verification() {
    let server = start_server().await;
    let client = client();

    let response = client.delete(server.url("/nothing")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let (status, body) = check(&client, &server).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let failures: Vec<String> = serde_json::from_str(&body).unwrap();
    assert_eq!(
        failures,
        vec!["DELETE request to \"/nothing\" did not match any rule".to_string()]
    );

    let (status, _) = check(&client, &server).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_registration_errors() {
    let server = start_server().await;
    let client = client();

    let response = client.get(server.url("/__expect")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Error: Define a new mock rule using a POST request"
    );

    let response = client
        .post(server.url("/__expect"))
        .json(&json!({"request": {"uri": "/a"}, "response": {"status": 299}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .text()
        .await
        .unwrap()
        .starts_with("Invalid mock rule configuration: "));

    assert!(server.registry().is_empty());
}

#[tokio::test]
async fn test_builder_in_process() {
    let server = start_server().await;
    let client = client();

    server
        .when("/built", Method::Post)
        .with_body("ping")
        .then_return("pong")
        .unwrap()
        .with_mime_type("text/plain")
        .unwrap();
    server
        .when("/empty", Method::Get)
        .then_return_status(Status::NoContent)
        .unwrap();

    let response = client
        .post(server.url("/built"))
        .body("ping")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "text/plain"
    );
    assert_eq!(response.text().await.unwrap(), "pong");

    let response = client.get(server.url("/empty")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_shutdown_over_http() {
    let server = start_server().await;
    let client = client();
    expect(
        &client,
        &server,
        json!({"request": {"uri": "/a"}, "response": {"status": 200}}),
    )
    .await;

    let response = client
        .post(server.url("/__shutdown"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.text().await.unwrap(), "Shutting down...");
    assert!(server.is_shutting_down());

    // Nothing was matched after the acknowledgment
    assert_eq!(server.registry().snapshot()[0].call_count(), 0);

    tokio::time::timeout(TEST_TIMEOUT, server.stopped())
        .await
        .expect("Server did not stop")
        .unwrap();
}
