//! Health check

use crate::core::ServerState;
use axum::{Router, routing::get};
use serde_json::{Value, json};
use shared::ApiResponse;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::success(json!({ "status": "ok" }))
}
