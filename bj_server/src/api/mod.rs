//! HTTP API for the Blackjack server.
//!
//! Updates arrive as JSON, one per request, and are routed to the actor of
//! their chat. Replies to the chat go out through the message dispatcher;
//! the HTTP response only reports whether the update was applied.
//!
//! # Endpoints
//!
//! ```text
//! POST /api/updates   - Apply one chat update
//! GET  /health        - Store health
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! # use bj_server::api::{create_router, AppState};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let state: AppState = unimplemented!();
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tg_blackjack::{
    ChatManager, ChatResponse, InboundUpdate,
    db::GameStore,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub chats: ChatManager,
    pub store: Arc<dyn GameStore>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/updates", post(post_update))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Apply one update.
///
/// Returns `200 OK` with the [`ChatResponse`] whether or not the game
/// accepted the action, since a rejection is a normal part of play. Only a
/// failure to process the update maps to `500`.
async fn post_update(
    State(state): State<AppState>,
    Json(update): Json<InboundUpdate>,
) -> impl IntoResponse {
    let response = state.chats.route(update).await;
    let status = match response {
        ChatResponse::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ChatResponse::Applied | ChatResponse::Rejected(_) => StatusCode::OK,
    };
    (status, Json(response))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` if the store answers, or `503 Service Unavailable`.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.store.health_check().await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("Health check failed: {err}");
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "chats": state.chats.active_chat_count().await,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
