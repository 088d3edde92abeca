mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use common::*;
use roamer::server::{router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(harness: &Harness) -> axum::Router {
    router(AppState::new(harness.planner()))
}

async fn json_body(resp: axum::response::Response) -> Value {
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn ask_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn root_returns_info_message() {
    let resp = app(&Harness::tokyo())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert!(body["message"].as_str().unwrap().contains("POST /ask"));
}

#[tokio::test]
async fn ask_returns_final_answer() {
    let harness = Harness::tokyo();
    let resp = app(&harness)
        .oneshot(ask_request(json!({ "user_question": TOKYO_QUESTION })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    let answer = body["final_answer"].as_str().unwrap();
    assert!(answer.contains("Google, Bing and Reddit"));
    assert_eq!(harness.retrieval.batches().len(), 1);
}

#[tokio::test]
async fn failed_run_returns_500_with_error_body() {
    let harness = Harness::new(
        MockLlm::tokyo().failing(Step::Synthesis),
        MockSerp::default(),
        MockRedditSearch::with_hits(tokyo_hits()),
        MockRetrieval::default(),
    );
    let resp = app(&harness)
        .oneshot(ask_request(json!({ "user_question": TOKYO_QUESTION })))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("synthesize_analyses"));
}

#[tokio::test]
async fn malformed_body_is_rejected_without_running() {
    let harness = Harness::tokyo();
    let resp = app(&harness)
        .oneshot(ask_request(json!({ "question": "wrong field" })))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
    assert!(harness.llm.calls().is_empty());
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let resp = app(&Harness::tokyo())
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        resp.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
