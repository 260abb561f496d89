//! HTTP API routes and handlers

pub mod health;
pub mod orders;

use crate::core::ServerState;
use axum::Router;

/// Top-level router
pub fn router() -> Router<ServerState> {
    Router::new().merge(health::router()).merge(orders::router())
}
