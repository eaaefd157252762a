//! HTTP surface checks: status codes, headers, and queue side effects.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use std::time::Duration;
use tower::ServiceExt;

use irrigator::adapters::http::router;
use irrigator::app::dispatcher::BUSY_MESSAGE;

use super::mock_rig::{MockRig, tomatoes, wait_until};

async fn send(rig: &MockRig, method: Method, uri: &str) -> axum::response::Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request");
    router(rig.dispatcher.clone())
        .oneshot(request)
        .await
        .expect("response")
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf-8")
}

#[tokio::test]
async fn post_is_accepted_with_empty_body() {
    let rig = MockRig::start();
    let response = send(&rig, Method::POST, "/tomatoes").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(body_text(response).await.is_empty());
    assert!(rig.queue.is_busy());
}

#[tokio::test]
async fn second_post_is_503_with_message() {
    let rig = MockRig::start();
    assert_eq!(
        send(&rig, Method::POST, "/tomatoes").await.status(),
        StatusCode::ACCEPTED
    );

    for path in ["/tomatoes", "/basil"] {
        let response = send(&rig, Method::POST, path).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(response).await, BUSY_MESSAGE);
    }
}

#[tokio::test]
async fn get_on_plant_path_is_405_with_allow() {
    let rig = MockRig::start();
    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let response = send(&rig, method, "/tomatoes").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response
                .headers()
                .get(header::ALLOW)
                .and_then(|v| v.to_str().ok()),
            Some("POST")
        );
    }
    assert!(!rig.queue.is_busy());
    assert!(rig.bench.writes().is_empty());
}

#[tokio::test]
async fn get_is_405_even_while_busy() {
    let rig = MockRig::start();
    send(&rig, Method::POST, "/basil").await;
    let response = send(&rig, Method::GET, "/basil").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let rig = MockRig::start();
    for uri in ["/roses", "/", "/tomatoes/extra"] {
        let response = send(&rig, Method::POST, uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    assert!(!rig.queue.is_busy());
}

#[tokio::test]
async fn query_string_does_not_affect_matching() {
    let rig = MockRig::start();
    let response = send(&rig, Method::POST, "/tomatoes?source=cron").await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn accepted_post_reaches_hardware() {
    let rig = MockRig::start();
    send(&rig, Method::POST, "/tomatoes").await;
    let bench = rig.bench.clone();
    let energized = tokio::task::spawn_blocking(move || {
        wait_until(Duration::from_millis(500), || {
            bench.level(&tomatoes()) == Some(false)
        })
    })
    .await
    .expect("join");
    assert!(energized);
}
