//! Shared types for the order distribution engine
//!
//! This crate holds everything both the dispatch server and its tests agree
//! on:
//!
//! - **Models** (`models`): serde representations of the documents the engine
//!   reads and writes (events, points of sale, purchases, distributed orders,
//!   notifications). Field names follow the store layout, so every struct is
//!   `camelCase` on the wire.
//! - **Errors** (`error`): unified error codes, the [`AppError`] type and the
//!   [`ApiResponse`] envelope used by the HTTP surface.
//! - **Utilities** (`util`): quantity coercion and grouping-key helpers.

pub mod error;
pub mod models;
pub mod util;

// Re-export the error surface at the crate root
pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
