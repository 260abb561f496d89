//! Typed store gateway
//!
//! The only component that talks to the document store. Every operation
//! reads or writes one of the well-known collection paths and converts raw
//! documents into the shared models.

use super::{
    DocumentStore, Document, PathConfig, Query, SERVER_TIMESTAMP, StoreError, StoreResult,
    WriteOp, decode,
};
use serde_json::{Value, json};
use shared::models::{
    DistributedItem, DistributedOrder, Event, Item, Notification, PointOfSale, PosItem, Purchase,
    PurchaseItem, ServingPoint,
};
use shared::util::coerce_quantity;
use std::sync::Arc;

/// Attempts before an optimistic transaction gives up
const TXN_MAX_ATTEMPTS: usize = 5;

/// Typed operations over the store
#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<dyn DocumentStore>,
    paths: PathConfig,
}

impl StoreGateway {
    pub fn new(store: Arc<dyn DocumentStore>, paths: PathConfig) -> Self {
        Self { store, paths }
    }

    pub fn paths(&self) -> &PathConfig {
        &self.paths
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // =========================================================================
    // Event scope
    // =========================================================================

    /// Event document; a missing document falls back to defaults
    pub async fn get_event(&self, event_id: &str) -> StoreResult<Event> {
        let path = self.paths.event(event_id);
        match self.store.get(&path).await? {
            Some(doc) => decode(&path, doc),
            None => Ok(Event::default()),
        }
    }

    pub async fn get_serving_point(
        &self,
        event_id: &str,
        id: &str,
    ) -> StoreResult<Option<ServingPoint>> {
        let path = self.paths.serving_point(event_id, id);
        match self.store.get(&path).await? {
            Some(doc) => decode(&path, doc).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_item(&self, event_id: &str, item_id: &str) -> StoreResult<Option<Item>> {
        let path = self.paths.item(event_id, item_id);
        match self.store.get(&path).await? {
            Some(doc) => decode(&path, doc).map(Some),
            None => Ok(None),
        }
    }

    /// Write the canonical (event-level) availability flag
    pub async fn set_item_availability(
        &self,
        event_id: &str,
        item_id: &str,
        available: bool,
    ) -> StoreResult<()> {
        let path = self.paths.item(event_id, item_id);
        self.store
            .commit(vec![WriteOp::merge(
                path,
                doc(json!({ "isAvailable": available })),
            )])
            .await
    }

    // =========================================================================
    // POS scope
    // =========================================================================

    /// All points of sale of an event, id ascending
    pub async fn list_pos(&self, event_id: &str) -> StoreResult<Vec<(String, PointOfSale)>> {
        let collection = self.paths.pos_collection(event_id);
        self.decode_list(&collection, &Query::new()).await
    }

    pub async fn get_pos(&self, event_id: &str, pos_id: &str) -> StoreResult<Option<PointOfSale>> {
        let path = self.paths.pos(event_id, pos_id);
        match self.store.get(&path).await? {
            Some(d) => decode(&path, d).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list_pos_items(
        &self,
        event_id: &str,
        pos_id: &str,
    ) -> StoreResult<Vec<(String, PosItem)>> {
        let collection = self.paths.pos_items(event_id, pos_id);
        self.decode_list(&collection, &Query::new()).await
    }

    pub async fn get_pos_item(
        &self,
        event_id: &str,
        pos_id: &str,
        item_id: &str,
    ) -> StoreResult<Option<PosItem>> {
        let path = self.paths.pos_item(event_id, pos_id, item_id);
        match self.store.get(&path).await? {
            Some(d) => decode(&path, d).map(Some),
            None => Ok(None),
        }
    }

    /// Open-order count for one POS, via a filtered query
    pub async fn count_open_orders(&self, event_id: &str, pos_id: &str) -> StoreResult<usize> {
        let collection = self.paths.pos_orders(event_id, pos_id);
        let query = Query::new().filter_eq("orderStatus", "open");
        self.store.count(&collection, &query).await
    }

    pub async fn list_open_orders(
        &self,
        event_id: &str,
        pos_id: &str,
    ) -> StoreResult<Vec<(String, DistributedOrder)>> {
        let collection = self.paths.pos_orders(event_id, pos_id);
        let query = Query::new().filter_eq("orderStatus", "open");
        self.decode_list(&collection, &query).await
    }

    pub async fn get_pos_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> StoreResult<Option<DistributedOrder>> {
        let path = self.paths.pos_order(event_id, pos_id, order_id);
        match self.store.get(&path).await? {
            Some(d) => decode(&path, d).map(Some),
            None => Ok(None),
        }
    }

    pub async fn list_pos_order_items(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
    ) -> StoreResult<Vec<(String, DistributedItem)>> {
        let collection = self.paths.pos_order_items(event_id, pos_id, order_id);
        self.decode_list(&collection, &Query::new()).await
    }

    /// Materialize one distributed order and its items in a single batched
    /// write. The order document is an upsert keyed by the purchase id.
    pub async fn write_distributed_order(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        order: Document,
        items: Vec<(String, Document)>,
    ) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(items.len() + 1);
        ops.push(WriteOp::merge(
            self.paths.pos_order(event_id, pos_id, order_id),
            order,
        ));
        for (key, item) in items {
            ops.push(WriteOp::set(
                self.paths.pos_order_item(event_id, pos_id, order_id, &key),
                item,
            ));
        }
        self.store.commit(ops).await
    }

    /// Merge one order item into a destination order inside an optimistic
    /// transaction: the destination count is read, the source count added,
    /// the sanitized payload merged and the source document deleted — all
    /// atomically. Retries a bounded number of times on conflict.
    pub async fn transfer_order_item(
        &self,
        src_path: &str,
        dst_path: &str,
        base: Document,
        src_count: i64,
    ) -> StoreResult<i64> {
        for _ in 0..TXN_MAX_ATTEMPTS {
            let mut txn = self.store.begin().await?;
            let existing = txn.get(dst_path).await?;
            let existing_count = existing
                .as_ref()
                .map(|d| coerce_quantity(d.get("quantity").or_else(|| d.get("count"))))
                .unwrap_or(0);
            let new_count = existing_count + src_count;

            let mut payload = base.clone();
            payload.insert("quantity".to_string(), json!(new_count));
            txn.merge(dst_path, payload);
            txn.delete(src_path);

            match txn.commit().await {
                Ok(()) => return Ok(new_count),
                Err(StoreError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Err(StoreError::Conflict(format!(
            "transfer to {} lost {} races",
            dst_path, TXN_MAX_ATTEMPTS
        )))
    }

    // =========================================================================
    // Purchase scope
    // =========================================================================

    pub async fn get_purchase(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> StoreResult<Option<Purchase>> {
        let path = self.paths.purchase(event_id, purchase_id);
        match self.store.get(&path).await? {
            Some(d) => decode(&path, d).map(Some),
            None => Ok(None),
        }
    }

    /// Merge fields onto the purchase document
    pub async fn update_purchase(
        &self,
        event_id: &str,
        purchase_id: &str,
        fields: Document,
    ) -> StoreResult<()> {
        self.store
            .commit(vec![WriteOp::merge(
                self.paths.purchase(event_id, purchase_id),
                fields,
            )])
            .await
    }

    /// Create the main purchase and its line items in one batch
    pub async fn create_purchase(
        &self,
        event_id: &str,
        purchase_id: &str,
        purchase: Document,
        items: Vec<(String, Document)>,
    ) -> StoreResult<()> {
        let mut ops = Vec::with_capacity(items.len() + 1);
        ops.push(WriteOp::set(
            self.paths.purchase(event_id, purchase_id),
            purchase,
        ));
        for (item_id, item) in items {
            ops.push(WriteOp::set(
                self.paths.purchase_item(event_id, purchase_id, &item_id),
                item,
            ));
        }
        self.store.commit(ops).await
    }

    pub async fn list_purchase_items(
        &self,
        event_id: &str,
        purchase_id: &str,
    ) -> StoreResult<Vec<(String, PurchaseItem)>> {
        let collection = self.paths.purchase_items(event_id, purchase_id);
        self.decode_list(&collection, &Query::new()).await
    }

    // =========================================================================
    // Order items (main or POS scope)
    // =========================================================================

    /// Find line-item documents of an items collection whose canonical item
    /// id is in `ids`. Freshly scheduled items carry the id under `id`,
    /// migrated and main-order items under `itemId`, so both fields are
    /// queried and the union returned. `ids` must respect the in-query cap.
    pub async fn find_items_by_ids(
        &self,
        items_collection: &str,
        ids: &[String],
    ) -> StoreResult<Vec<(String, Document)>> {
        let values: Vec<Value> = ids.iter().map(|id| json!(id)).collect();
        let by_item_id = Query::new().filter_in("itemId", values.clone());
        let by_id = Query::new().filter_in("id", values);

        let mut found = self.store.list(items_collection, &by_item_id).await?;
        for (doc_id, data) in self.store.list(items_collection, &by_id).await? {
            if !found.iter().any(|(existing, _)| existing == &doc_id) {
                found.push((doc_id, data));
            }
        }
        Ok(found)
    }

    /// List every line-item document of an items collection
    pub async fn list_order_items(
        &self,
        items_collection: &str,
    ) -> StoreResult<Vec<(String, DistributedItem)>> {
        self.decode_list(items_collection, &Query::new()).await
    }

    /// Merge fields onto arbitrary documents in one batch
    pub async fn merge_all(&self, writes: Vec<(String, Document)>) -> StoreResult<()> {
        let ops = writes
            .into_iter()
            .map(|(path, fields)| WriteOp::merge(path, fields))
            .collect();
        self.store.commit(ops).await
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// The at-most-one non-terminal notification for (orderId, action)
    pub async fn find_open_notification(
        &self,
        event_id: &str,
        order_id: &str,
        action: Option<&str>,
    ) -> StoreResult<Option<(String, Notification)>> {
        let collection = self.paths.notifications(event_id);
        let mut query = Query::new()
            .filter_eq("orderId", order_id)
            .filter_in("status", vec![json!("created"), json!("in_progress")])
            .limit(1);
        if let Some(action) = action {
            query = query.filter_eq("action", action);
        }
        let mut found = self.decode_list(&collection, &query).await?;
        Ok(found.pop())
    }

    pub async fn put_notification(&self, path: &str, data: Document) -> StoreResult<()> {
        self.store.commit(vec![WriteOp::set(path, data)]).await
    }

    pub async fn merge_notification(&self, path: &str, data: Document) -> StoreResult<()> {
        self.store.commit(vec![WriteOp::merge(path, data)]).await
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn decode_list<T: serde::de::DeserializeOwned>(
        &self,
        collection: &str,
        query: &Query,
    ) -> StoreResult<Vec<(String, T)>> {
        let raw = self.store.list(collection, query).await?;
        let mut out = Vec::with_capacity(raw.len());
        for (id, data) in raw {
            let path = format!("{}/{}", collection, id);
            out.push((id, decode(&path, data)?));
        }
        Ok(out)
    }
}

/// Shorthand used across the engine to build write payloads
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

/// A server-timestamp field value
pub fn server_timestamp() -> Value {
    json!(SERVER_TIMESTAMP)
}
