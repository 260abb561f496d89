use dispatch_server::{Config, Server, ServerState, init_logger};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger(&log_level, log_dir.as_deref());

    tracing::info!("Dispatch server starting...");

    let config = Config::from_env();
    tracing::info!(
        http_port = config.http_port,
        events_collection = %config.events_collection,
        environment = %config.environment,
        "configuration loaded"
    );

    let state = ServerState::initialize(&config);
    state.start_background_tasks();

    let server = Server::with_state(config, state);
    if let Err(e) = server.run().await {
        tracing::error!(error = %e, "HTTP server error");
        std::process::exit(1);
    }
}
