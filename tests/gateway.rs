//! HTTP gateway against an in-process backend

use agromind::config::BackendConfig;
use agromind::conversation::{ConversationController, Sender, SubmitOutcome, FALLBACK_TEXT};
use agromind::gateway::{Gateway, GatewayError, HttpGateway, QueryRequest};
use axum::{
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;

async fn spawn_backend(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn gateway_for(base_url: String) -> HttpGateway {
    HttpGateway::new(&BackendConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

async fn echo(Json(request): Json<QueryRequest>) -> Json<Value> {
    Json(json!({ "answer": format!("You asked: {}", request.query) }))
}

#[tokio::test]
async fn returns_answer_field() {
    let addr = spawn_backend(Router::new().route("/query", post(echo))).await;
    let gateway = gateway_for(format!("http://{addr}"));

    let answer = gateway.ask("How deep should I plant maize?").await.unwrap();
    assert_eq!(answer, "You asked: How deep should I plant maize?");
}

#[tokio::test]
async fn keeps_base_path_prefix() {
    let addr = spawn_backend(Router::new().route("/api/v1/query", post(echo))).await;
    let gateway = gateway_for(format!("http://{addr}/api/v1/"));

    assert_eq!(gateway.ask("hi").await.unwrap(), "You asked: hi");
}

#[tokio::test]
async fn server_error_is_status_error() {
    let app = Router::new().route(
        "/query",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model offline") }),
    );
    let addr = spawn_backend(app).await;

    match gateway_for(format!("http://{addr}")).ask("hi").await {
        Err(GatewayError::Status { status, body }) => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "model offline");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_answer_is_decode_error() {
    let app = Router::new().route(
        "/query",
        post(|| async { Json(json!({ "response": "wrong field" })) }),
    );
    let addr = spawn_backend(app).await;

    let result = gateway_for(format!("http://{addr}")).ask("hi").await;
    assert!(matches!(result, Err(GatewayError::Decode(_))));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = gateway_for(format!("http://{addr}")).ask("hi").await;
    assert!(matches!(result, Err(GatewayError::Transport(_))));
}

#[tokio::test]
async fn controller_over_http_round_trip() {
    let app = Router::new().route(
        "/query",
        post(|| async { Json(json!({ "answer": "**Crop rotation** improves soil health." })) }),
    );
    let addr = spawn_backend(app).await;
    let controller = ConversationController::new(gateway_for(format!("http://{addr}")));

    let outcome = controller.submit("What is crop rotation?").await;
    assert_eq!(outcome, SubmitOutcome::Answered);

    let snapshot = controller.snapshot();
    assert!(!snapshot.pending);
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[1].sender(), Sender::Bot);
    assert_eq!(
        snapshot.messages[1].text(),
        "**Crop rotation** improves soil health."
    );
    assert_eq!(
        snapshot.messages[1].display_text(),
        "Crop rotation improves soil health."
    );
}

#[tokio::test]
async fn controller_falls_back_when_backend_fails() {
    let app = Router::new().route("/query", post(|| async { StatusCode::BAD_GATEWAY }));
    let addr = spawn_backend(app).await;
    let controller = ConversationController::new(gateway_for(format!("http://{addr}")));

    let outcome = controller.submit("Is it going to rain?").await;
    assert_eq!(outcome, SubmitOutcome::Failed);

    let snapshot = controller.snapshot();
    assert!(!snapshot.pending);
    assert_eq!(snapshot.messages[1].text(), FALLBACK_TEXT);
}
