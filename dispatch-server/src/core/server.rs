//! HTTP server bootstrap

use crate::api;
use crate::core::{Config, ServerState};
use shared::{AppError, AppResult};
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;

/// HTTP server wrapping the RPC surface
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    /// Serve until ctrl-c
    pub async fn run(self) -> AppResult<()> {
        let app = api::router()
            .layer(TraceLayer::new_for_http())
            .with_state(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::internal(format!("bind {}: {}", addr, e)))?;
        tracing::info!(%addr, "HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| AppError::internal(format!("server error: {}", e)))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install ctrl-c handler");
        return;
    }
    tracing::info!("shutdown signal received");
}
