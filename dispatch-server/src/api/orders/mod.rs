//! Order API Module

mod handler;

pub use handler::DistributeOrderRequest;

use axum::{Router, routing::post};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/distribute", post(handler::distribute))
}
