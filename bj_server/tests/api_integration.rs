//! Integration tests for the HTTP update endpoint, on the in-memory store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use bj_server::api::{AppState, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tg_blackjack::{
    ChatManager, GameConfig, StageController,
    db::{GameStore, InMemoryGameStore},
    dispatch::{ChannelDispatcher, OutboundMessage},
    game::{GameStage, ScriptedCards},
};
use tokio::sync::mpsc;
use tower::ServiceExt; // For `oneshot` method

fn create_test_server() -> (axum::Router, Arc<InMemoryGameStore>, mpsc::Receiver<OutboundMessage>) {
    let store = Arc::new(InMemoryGameStore::new());
    let (dispatcher, outbox) = ChannelDispatcher::new(64);
    let controller = StageController::new(
        store.clone(),
        Arc::new(dispatcher),
        Arc::new(ScriptedCards::from_tokens(&["9♠"])),
        GameConfig::default(),
    );
    let state = AppState {
        chats: ChatManager::new(controller),
        store: store.clone(),
    };
    (create_router(state), store, outbox)
}

async fn post_update(app: &axum::Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/updates")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn update(user_id: i64, data: &str) -> Value {
    json!({
        "chat_id": -100,
        "user": { "id": user_id, "first_name": "Alice" },
        "data": data,
    })
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = create_test_server();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn test_start_command_is_applied() {
    let (app, _, mut outbox) = create_test_server();

    let (status, body) = post_update(&app, update(1, "/start@BlackjackBot")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": "applied" }));

    let message = outbox.recv().await.unwrap();
    assert_eq!(message.chat_id, -100);
    assert!(message.has_callback("join_new_game"));
}

#[tokio::test]
async fn test_new_game_creates_waiting_game() {
    let (app, store, _outbox) = create_test_server();

    let (status, _) = post_update(&app, update(1, "join_new_game")).await;
    assert_eq!(status, StatusCode::OK);

    let game = store.get_active_game(-100).await.unwrap().unwrap();
    assert_eq!(game.stage, GameStage::WaitingForPlayersToJoin);
    assert_eq!(game.dealer_cards.len(), 1);
}

#[tokio::test]
async fn test_rejection_is_reported_in_body() {
    let (app, _, _outbox) = create_test_server();

    let (status, body) = post_update(&app, update(1, "take_card")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"], "rejected");
    assert!(body["message"].as_str().unwrap().contains("no game is running"));
}

#[tokio::test]
async fn test_malformed_update_is_client_error() {
    let (app, _, _) = create_test_server();

    let (status, _) = post_update(&app, json!({ "chat_id": -100 })).await;
    assert!(status.is_client_error());
}
