//! Embedded in-memory document store
//!
//! Backs local mode and the test suite. Documents live in a `BTreeMap`
//! keyed by full path, so collection enumeration is document-id ascending —
//! which is also the engine's deterministic tie-break order.

use super::{
    ChangeKind, DocChange, Document, DocumentStore, Query, SERVER_TIMESTAMP, StoreError,
    StoreResult, StoreTransaction, WriteOp,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Change feed channel capacity
const CHANGE_CHANNEL_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
struct VersionedDoc {
    data: Document,
    version: u64,
}

/// In-memory document tree with per-document versions and a broadcast
/// change feed
pub struct MemoryStore {
    docs: Arc<RwLock<BTreeMap<String, VersionedDoc>>>,
    changes: broadcast::Sender<DocChange>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            docs: Arc::new(RwLock::new(BTreeMap::new())),
            changes,
        }
    }

    /// A document path has an even, non-zero number of segments
    fn check_doc_path(path: &str) -> StoreResult<()> {
        let segments = path.split('/').count();
        if segments == 0 || segments % 2 != 0 || path.split('/').any(str::is_empty) {
            return Err(StoreError::Permanent(format!(
                "not a document path: {}",
                path
            )));
        }
        Ok(())
    }

    fn check_collection_path(path: &str) -> StoreResult<()> {
        if path.split('/').count() % 2 != 1 || path.split('/').any(str::is_empty) {
            return Err(StoreError::Permanent(format!(
                "not a collection path: {}",
                path
            )));
        }
        Ok(())
    }

    /// Replace server-timestamp sentinels with the commit time
    fn resolve_timestamps(data: &mut Document, now: &str) {
        for value in data.values_mut() {
            if value.as_str() == Some(SERVER_TIMESTAMP) {
                *value = Value::String(now.to_string());
            }
        }
    }

    /// Apply one write under the lock, returning the emitted change
    fn apply_op(
        docs: &mut BTreeMap<String, VersionedDoc>,
        op: WriteOp,
        now: &str,
    ) -> StoreResult<Option<DocChange>> {
        Self::check_doc_path(op.path())?;
        let change = match op {
            WriteOp::Set { path, mut data } => {
                Self::resolve_timestamps(&mut data, now);
                let before = docs.get(&path).cloned();
                let version = before.as_ref().map(|d| d.version + 1).unwrap_or(1);
                docs.insert(
                    path.clone(),
                    VersionedDoc {
                        data: data.clone(),
                        version,
                    },
                );
                Some(DocChange {
                    path,
                    kind: if before.is_some() {
                        ChangeKind::Updated
                    } else {
                        ChangeKind::Created
                    },
                    before: before.map(|d| d.data),
                    after: Some(data),
                })
            }
            WriteOp::Merge { path, mut data } => {
                Self::resolve_timestamps(&mut data, now);
                match docs.get(&path).cloned() {
                    Some(existing) => {
                        let mut merged = existing.data.clone();
                        for (key, value) in data {
                            if value.is_null() {
                                merged.remove(&key);
                            } else {
                                merged.insert(key, value);
                            }
                        }
                        docs.insert(
                            path.clone(),
                            VersionedDoc {
                                data: merged.clone(),
                                version: existing.version + 1,
                            },
                        );
                        Some(DocChange {
                            path,
                            kind: ChangeKind::Updated,
                            before: Some(existing.data),
                            after: Some(merged),
                        })
                    }
                    None => {
                        let data: Document =
                            data.into_iter().filter(|(_, v)| !v.is_null()).collect();
                        docs.insert(
                            path.clone(),
                            VersionedDoc {
                                data: data.clone(),
                                version: 1,
                            },
                        );
                        Some(DocChange {
                            path,
                            kind: ChangeKind::Created,
                            before: None,
                            after: Some(data),
                        })
                    }
                }
            }
            WriteOp::Delete { path } => docs.remove(&path).map(|removed| DocChange {
                path,
                kind: ChangeKind::Deleted,
                before: Some(removed.data),
                after: None,
            }),
        };
        Ok(change)
    }

    fn publish(&self, changes: Vec<DocChange>) {
        for change in changes {
            // No subscribers is fine
            let _ = self.changes.send(change);
        }
    }

    fn scan(
        docs: &BTreeMap<String, VersionedDoc>,
        collection: &str,
        query: &Query,
    ) -> Vec<(String, Document)> {
        let prefix = format!("{}/", collection);
        let mut out = Vec::new();
        for (path, doc) in docs.range(prefix.clone()..) {
            if !path.starts_with(&prefix) {
                break;
            }
            let id = &path[prefix.len()..];
            if id.contains('/') {
                continue; // sub-collection document
            }
            if !query.matches(&doc.data) {
                continue;
            }
            out.push((id.to_string(), doc.data.clone()));
            if query.limit.is_some_and(|limit| out.len() >= limit) {
                break;
            }
        }
        out
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> StoreResult<Option<Document>> {
        Self::check_doc_path(path)?;
        Ok(self.docs.read().get(path).map(|d| d.data.clone()))
    }

    async fn list(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, Document)>> {
        Self::check_collection_path(collection)?;
        query.validate()?;
        Ok(Self::scan(&self.docs.read(), collection, query))
    }

    async fn count(&self, collection: &str, query: &Query) -> StoreResult<usize> {
        Self::check_collection_path(collection)?;
        query.validate()?;
        Ok(Self::scan(&self.docs.read(), collection, query).len())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut emitted = Vec::with_capacity(ops.len());
        {
            let mut docs = self.docs.write();
            for op in ops {
                if let Some(change) = Self::apply_op(&mut docs, op, &now)? {
                    emitted.push(change);
                }
            }
        }
        self.publish(emitted);
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            docs: Arc::clone(&self.docs),
            changes: self.changes.clone(),
            reads: HashMap::new(),
            ops: Vec::new(),
        }))
    }

    fn watch(&self) -> broadcast::Receiver<DocChange> {
        self.changes.subscribe()
    }
}

/// Optimistic transaction over [`MemoryStore`]
struct MemoryTransaction {
    docs: Arc<RwLock<BTreeMap<String, VersionedDoc>>>,
    changes: broadcast::Sender<DocChange>,
    /// path → version observed at read time (0 = absent)
    reads: HashMap<String, u64>,
    ops: Vec<WriteOp>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn get(&mut self, path: &str) -> StoreResult<Option<Document>> {
        MemoryStore::check_doc_path(path)?;
        let docs = self.docs.read();
        let doc = docs.get(path);
        self.reads
            .insert(path.to_string(), doc.map(|d| d.version).unwrap_or(0));
        Ok(doc.map(|d| d.data.clone()))
    }

    fn set(&mut self, path: &str, data: Document) {
        self.ops.push(WriteOp::set(path, data));
    }

    fn merge(&mut self, path: &str, data: Document) {
        self.ops.push(WriteOp::merge(path, data));
    }

    fn delete(&mut self, path: &str) {
        self.ops.push(WriteOp::delete(path));
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut emitted = Vec::with_capacity(self.ops.len());
        {
            let mut docs = self.docs.write();
            for (path, seen) in &self.reads {
                let current = docs.get(path).map(|d| d.version).unwrap_or(0);
                if current != *seen {
                    return Err(StoreError::Conflict(format!(
                        "{} changed underneath the transaction",
                        path
                    )));
                }
            }
            for op in self.ops {
                if let Some(change) = MemoryStore::apply_op(&mut docs, op, &now)? {
                    emitted.push(change);
                }
            }
        }
        for change in emitted {
            let _ = self.changes.send(change);
        }
        Ok(())
    }
}
