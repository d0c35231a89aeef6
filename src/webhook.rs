//! Webhook ingress: receives Telegram updates over HTTP

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use teloxide::types::Update;
use tracing::{error, info};

use crate::bot::{handle_update, BotContext};
use crate::config::WEBHOOK_PATH;

/// Liveness endpoint handler
async fn root_handler() -> Json<Value> {
    Json(json!({ "status": "running", "bot": "active" }))
}

/// Update endpoint handler; malformed bodies are rejected by the `Json` extractor
async fn webhook_handler(
    State(ctx): State<Arc<BotContext>>,
    Json(update): Json<Update>,
) -> (StatusCode, Json<Value>) {
    match handle_update(update, ctx).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            error!(error = %e, "Failed to process update");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": e.to_string() })),
            )
        }
    }
}

/// Create the webhook router
pub fn create_router(ctx: Arc<BotContext>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route(WEBHOOK_PATH, post(webhook_handler))
        .with_state(ctx)
}

/// Serve the webhook router until the process receives Ctrl+C
pub async fn serve(ctx: Arc<BotContext>, addr: SocketAddr) -> anyhow::Result<()> {
    let app = create_router(ctx);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Webhook server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
