//! Server configuration
//!
//! All settings come from environment variables with sensible defaults:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | HTTP_PORT | 3000 | HTTP API port |
//! | EVENTS_COLLECTION | Events | Root collection name (legacy stores used `PosEvents`) |
//! | TRIGGER_BUFFER | 1024 | Per-reactor trigger channel capacity |
//! | SHUTDOWN_TIMEOUT_MS | 10000 | Graceful shutdown window |
//! | ENVIRONMENT | development | development \| staging \| production |

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API port
    pub http_port: u16,
    /// Root collection name of the tenant namespace
    pub events_collection: String,
    /// Per-reactor trigger channel capacity
    pub trigger_buffer: usize,
    /// Graceful shutdown window (milliseconds)
    pub shutdown_timeout_ms: u64,
    /// development | staging | production
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            events_collection: std::env::var("EVENTS_COLLECTION")
                .unwrap_or_else(|_| "Events".into()),
            trigger_buffer: std::env::var("TRIGGER_BUFFER")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// Whether we run in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
