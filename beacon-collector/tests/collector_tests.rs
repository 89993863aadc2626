//! Collector tests

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use beacon_collector::{CollectorConfig, CollectorServer, FailurePolicy};
use tokio::net::TcpListener;
use tower::ServiceExt;

fn server(failure: FailurePolicy) -> CollectorServer {
    CollectorServer::new(CollectorConfig::builder().port(0).failure(failure).build())
}

async fn post(server: &CollectorServer, body: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .header("x-forwarded-for", "10.1.2.3")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = server.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn test_never_policy_answers_ok() {
    let server = server(FailurePolicy::Never);

    let (status, text) = post(&server, r#"{"events":[]}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "OK");
}

#[tokio::test]
async fn test_always_policy_answers_bad_request() {
    let server = server(FailurePolicy::Always);

    let (status, text) = post(&server, "{}").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(text, "Bad request");
}

#[tokio::test]
async fn test_first_n_policy_recovers() {
    let server = server(FailurePolicy::FirstN(2));

    let mut statuses = Vec::new();
    for _ in 0..4 {
        statuses.push(post(&server, "{}").await.0);
    }

    assert_eq!(
        statuses,
        vec![
            StatusCode::BAD_REQUEST,
            StatusCode::BAD_REQUEST,
            StatusCode::OK,
            StatusCode::OK,
        ]
    );
    assert_eq!(server.request_count(), 4);
}

#[tokio::test]
async fn test_cors_headers_on_every_response() {
    let server = server(FailurePolicy::Always);

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/any/path")
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    let headers = response.headers();

    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, GET, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "access-control-allow-headers, content-type"
    );
}

#[tokio::test]
async fn test_requests_are_recorded() {
    let server = server(FailurePolicy::Never);

    post(&server, r#"{"events":[{"type":"a","data":"b"}]}"#).await;

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/");
    assert_eq!(requests[0].caller, "10.1.2.3");
    assert_eq!(requests[0].body, r#"{"events":[{"type":"a","data":"b"}]}"#);
    assert_eq!(requests[0].status, 200);
}

#[tokio::test]
async fn test_serve_records_peer_address() {
    let server = Arc::new(server(FailurePolicy::Never));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.serve(listener).await });

    let response = reqwest::Client::new()
        .get(format!("http://{}/health", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert!(requests[0].caller.starts_with("127.0.0.1:"));
}
