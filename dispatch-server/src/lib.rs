//! Dispatch Server - order distribution and availability engine
//!
//! # Architecture overview
//!
//! The engine ingests purchases placed against an event, routes each line
//! item to a point of sale that can produce it (least-loaded first), and
//! keeps per-POS availability consistent with the event-level view —
//! migrating or refunding open orders when an item dries up.
//!
//! Control flow is event-driven: the store's change feed fans out to one
//! worker per trigger surface, and the HTTP API offers the synchronous
//! `distributeOrder` entrypoint.
//!
//! # Module structure
//!
//! ```text
//! dispatch-server/src/
//! ├── core/           # config, state, server bootstrap
//! ├── store/          # document-store contract, memory backend, paths, gateway
//! ├── dispatch/       # normalizer, scheduler, purchase orchestrator
//! ├── availability/   # availability reconciler + order migration
//! ├── refunds/        # refund propagator
//! ├── notifications/  # deduplicated notification writes
//! ├── triggers/       # change-feed router and reactor workers
//! ├── api/            # HTTP routes and handlers
//! └── utils/          # logging setup
//! ```

pub mod api;
pub mod availability;
pub mod core;
pub mod dispatch;
pub mod notifications;
pub mod refunds;
pub mod store;
pub mod triggers;
pub mod utils;

// Re-export public types
pub use crate::core::{Config, Server, ServerState};
pub use shared::{ApiResponse, AppError, AppResult, ErrorCode};
pub use utils::init_logger;
