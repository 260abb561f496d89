//! Document store contract
//!
//! The engine never talks to the production document store directly; it
//! consumes the contract below. The contract assumes a Firestore-class
//! feature set: hierarchical collections of documents, per-document
//! versioned updates, atomic batched writes, optimistic transactions,
//! server-assigned timestamps and a change feed.
//!
//! ```text
//!         ┌─────────────────────┐
//!         │  DocumentStore trait │  ◄── pluggable backend
//!         └─────────┬───────────┘
//!                   │
//!              ┌────┴─────┐
//!              ▼          ▼
//!         MemoryStore   (hosted store adapter, out of tree)
//! ```
//!
//! Paths are `/`-joined segments; a document path has an even number of
//! segments, a collection path an odd number.

pub mod gateway;
pub mod memory;
pub mod paths;

pub use gateway::StoreGateway;
pub use memory::MemoryStore;
pub use paths::{DocPath, PathConfig};

use async_trait::async_trait;
use serde_json::Value;
use shared::AppError;
use thiserror::Error;
use tokio::sync::broadcast;

/// A document is a flat JSON object
pub type Document = serde_json::Map<String, Value>;

/// Sentinel string; any field holding it is replaced with a server-assigned
/// RFC 3339 timestamp at commit time
pub const SERVER_TIMESTAMP: &str = "$server_timestamp";

/// Maximum values in a single `in` filter
pub const IN_QUERY_CAP: usize = 10;

/// Store error, categorized per recovery policy
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Transaction conflict: {0}")]
    Conflict(String),

    #[error("Transient store failure: {0}")]
    Transient(String),

    #[error("Permanent store failure: {0}")]
    Permanent(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::not_found(msg),
            StoreError::Conflict(msg) => AppError::conflict(msg),
            StoreError::Transient(msg) => AppError::transient(msg),
            StoreError::Permanent(msg) => AppError::permanent(msg),
        }
    }
}

/// What happened to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// One entry of the change feed
#[derive(Debug, Clone)]
pub struct DocChange {
    pub path: String,
    pub kind: ChangeKind,
    pub before: Option<Document>,
    pub after: Option<Document>,
}

/// Collection query filter
#[derive(Debug, Clone)]
pub enum Filter {
    /// Field equals value
    Eq(String, Value),
    /// Field is one of the values (capped at [`IN_QUERY_CAP`])
    In(String, Vec<Value>),
}

/// Collection query: conjunction of filters plus an optional limit
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(field.into(), value.into()));
        self
    }

    pub fn filter_in(mut self, field: impl Into<String>, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(field.into(), values));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Validate filter shape against store limits
    pub(crate) fn validate(&self) -> StoreResult<()> {
        for filter in &self.filters {
            if let Filter::In(field, values) = filter
                && values.len() > IN_QUERY_CAP
            {
                return Err(StoreError::Permanent(format!(
                    "in filter on '{}' exceeds {} values",
                    field, IN_QUERY_CAP
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|filter| match filter {
            Filter::Eq(field, value) => doc.get(field) == Some(value),
            Filter::In(field, values) => doc
                .get(field)
                .map(|v| values.contains(v))
                .unwrap_or(false),
        })
    }
}

/// One write of a batched commit
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Create or replace the document
    Set { path: String, data: Document },
    /// Create or merge into the document; a `null` field deletes the field
    Merge { path: String, data: Document },
    /// Delete the document (no-op when absent)
    Delete { path: String },
}

impl WriteOp {
    pub fn set(path: impl Into<String>, data: Document) -> Self {
        Self::Set {
            path: path.into(),
            data,
        }
    }

    pub fn merge(path: impl Into<String>, data: Document) -> Self {
        Self::Merge {
            path: path.into(),
            data,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::Delete { path: path.into() }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Set { path, .. } | Self::Merge { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Document store contract
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document
    async fn get(&self, path: &str) -> StoreResult<Option<Document>>;

    /// List documents of a collection, id ascending, filtered
    async fn list(&self, collection: &str, query: &Query)
    -> StoreResult<Vec<(String, Document)>>;

    /// Count documents of a collection matching the query
    async fn count(&self, collection: &str, query: &Query) -> StoreResult<usize>;

    /// Apply a batch of writes atomically
    async fn commit(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// Open an optimistic transaction
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Subscribe to the change feed
    fn watch(&self) -> broadcast::Receiver<DocChange>;
}

/// Read-modify-write under optimistic concurrency.
///
/// Reads record document versions; `commit` fails with
/// [`StoreError::Conflict`] when any read document changed underneath.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, path: &str) -> StoreResult<Option<Document>>;
    fn set(&mut self, path: &str, data: Document);
    fn merge(&mut self, path: &str, data: Document);
    fn delete(&mut self, path: &str);
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

/// Decode a document into a typed model
pub fn decode<T: serde::de::DeserializeOwned>(path: &str, doc: Document) -> StoreResult<T> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|e| StoreError::Permanent(format!("decode {}: {}", path, e)))
}
