//! Availability reconciler
//!
//! Reacts to POS-local item flag changes and keeps three things consistent:
//! the global (event-level) availability flag, the open orders that carry
//! the item, and the refund notifications for orders that can no longer be
//! produced anywhere.

pub mod migration;

use crate::notifications::NotificationService;
use crate::store::{StoreGateway, StoreResult, gateway};
use serde_json::json;
use shared::AppResult;
use shared::models::{Notification, NotificationStatus, PosItem, Severity};
use std::collections::HashMap;

/// Per-call read-through cache of global item availability.
///
/// The triggering item is forced unavailable so the decision does not
/// depend on write visibility of the flag that caused the trigger. Process
/// local and best-effort only; transactions always re-read.
pub struct AvailabilityCache {
    forced_unavailable: String,
    known: HashMap<String, bool>,
}

impl AvailabilityCache {
    pub fn new(forced_unavailable: impl Into<String>) -> Self {
        Self {
            forced_unavailable: forced_unavailable.into(),
            known: HashMap::new(),
        }
    }

    /// Global availability of an item: true iff any POS carries it with a
    /// POS-local flag other than `false`
    pub async fn is_available(
        &mut self,
        gateway: &StoreGateway,
        event_id: &str,
        item_id: &str,
    ) -> StoreResult<bool> {
        if item_id == self.forced_unavailable {
            return Ok(false);
        }
        if let Some(known) = self.known.get(item_id) {
            return Ok(*known);
        }
        let available = compute_global_availability(gateway, event_id, item_id).await?;
        self.known.insert(item_id.to_string(), available);
        Ok(available)
    }
}

/// Scan every POS of the event for the item
async fn compute_global_availability(
    gateway: &StoreGateway,
    event_id: &str,
    item_id: &str,
) -> StoreResult<bool> {
    for (pos_id, _) in gateway.list_pos(event_id).await? {
        if let Some(item) = gateway.get_pos_item(event_id, &pos_id, item_id).await?
            && item.available()
        {
            return Ok(true);
        }
    }
    Ok(false)
}

/// POS-item trigger reactor
#[derive(Clone)]
pub struct AvailabilityReconciler {
    gateway: StoreGateway,
    notifications: NotificationService,
}

impl AvailabilityReconciler {
    pub fn new(gateway: StoreGateway, notifications: NotificationService) -> Self {
        Self {
            gateway,
            notifications,
        }
    }

    /// Handle one update on `Points-of-Sale/{p}/Items/{i}`
    pub async fn on_pos_item_update(
        &self,
        event_id: &str,
        pos_id: &str,
        item_id: &str,
        before: Option<&PosItem>,
        after: Option<&PosItem>,
    ) -> AppResult<()> {
        // An absent flag counts as available
        let was_available = before.map(PosItem::available).unwrap_or(true);
        let is_available = after.map(PosItem::available).unwrap_or(true);
        if was_available == is_available {
            return Ok(());
        }

        if is_available {
            // Item reactivated at this POS; the global flag can only go up,
            // but the full reconciliation keeps the invariant honest
            self.gateway
                .set_item_availability(event_id, item_id, true)
                .await?;
            self.sync_global_availability(event_id, item_id).await?;
            return Ok(());
        }

        // Item deactivated: find a substitute POS, least-loaded first
        let candidates = self.candidate_stores(event_id, pos_id, item_id).await?;
        match candidates.first() {
            None => self.handle_sold_out(event_id, pos_id, item_id).await?,
            Some(target) => {
                self.migrate_open_orders(event_id, pos_id, target, item_id)
                    .await?;
            }
        }
        self.sync_global_availability(event_id, item_id).await?;
        Ok(())
    }

    /// Recompute and persist the canonical flag: true iff any POS still
    /// offers the item
    pub async fn sync_global_availability(&self, event_id: &str, item_id: &str) -> AppResult<()> {
        let available = compute_global_availability(&self.gateway, event_id, item_id).await?;
        self.gateway
            .set_item_availability(event_id, item_id, available)
            .await?;
        tracing::debug!(event_id, item_id, available, "global availability synced");
        Ok(())
    }

    /// All other POS carrying the item as available, annotated with their
    /// open-order counts and ordered least-loaded first. The sort is stable,
    /// so ties keep enumeration order.
    async fn candidate_stores(
        &self,
        event_id: &str,
        skip_pos: &str,
        item_id: &str,
    ) -> AppResult<Vec<(String, usize)>> {
        let mut candidates = Vec::new();
        for (pos_id, _) in self.gateway.list_pos(event_id).await? {
            if pos_id == skip_pos {
                continue;
            }
            let carries = self
                .gateway
                .get_pos_item(event_id, &pos_id, item_id)
                .await?
                .map(|item| item.available())
                .unwrap_or(false);
            if !carries {
                continue;
            }
            let open = self.gateway.count_open_orders(event_id, &pos_id).await?;
            candidates.push((pos_id, open));
        }
        candidates.sort_by_key(|(_, open)| *open);
        Ok(candidates)
    }

    /// No POS can produce the item anymore: flag it globally unavailable,
    /// notify refunds for affected open orders and mark their line items
    async fn handle_sold_out(&self, event_id: &str, pos_id: &str, item_id: &str) -> AppResult<()> {
        self.gateway
            .set_item_availability(event_id, item_id, false)
            .await?;

        let mut availability = AvailabilityCache::new(item_id);
        let pos_name = self
            .gateway
            .get_pos(event_id, pos_id)
            .await?
            .map(|pos| pos.name)
            .unwrap_or_else(|| pos_id.to_string());
        let open_orders = self.gateway.list_open_orders(event_id, pos_id).await?;

        // First pass: refund notifications, collecting the affected line
        // items per order for the marking pass
        let mut affected: Vec<(String, Vec<String>)> = Vec::new();
        for (order_id, _) in &open_orders {
            match self
                .refund_order(event_id, pos_id, &pos_name, order_id, &mut availability)
                .await
            {
                Ok(doc_ids) => affected.push((order_id.clone(), doc_ids)),
                Err(err) => {
                    tracing::error!(
                        event_id,
                        pos_id,
                        order_id = %order_id,
                        error = %err,
                        "refund notification failed, continuing with remaining orders"
                    );
                }
            }
        }

        // Second pass: mark the collected line items for cancellation
        // (merge-write, quantities untouched)
        let mut writes = Vec::new();
        for (order_id, doc_ids) in affected {
            for doc_id in doc_ids {
                writes.push((
                    self.gateway
                        .paths()
                        .pos_order_item(event_id, pos_id, &order_id, &doc_id),
                    gateway::doc(json!({"status": "marked_for_canceling"})),
                ));
            }
        }
        if !writes.is_empty() {
            self.gateway.merge_all(writes).await?;
        }
        Ok(())
    }

    /// Refund notification for one open order. Returns the document ids of
    /// the line items that are globally unavailable.
    async fn refund_order(
        &self,
        event_id: &str,
        pos_id: &str,
        pos_name: &str,
        order_id: &str,
        availability: &mut AvailabilityCache,
    ) -> AppResult<Vec<String>> {
        let items = self
            .gateway
            .list_pos_order_items(event_id, pos_id, order_id)
            .await?;

        let mut refund_total = 0.0;
        let mut item_ids: Vec<String> = Vec::new();
        let mut matched_docs = Vec::new();
        for (doc_id, item) in items {
            let Some(id) = item.item_id().map(str::to_string) else {
                continue;
            };
            if availability
                .is_available(&self.gateway, event_id, &id)
                .await?
            {
                continue;
            }
            refund_total += item.price.unwrap_or(0.0) * item.units() as f64;
            if !item_ids.contains(&id) {
                item_ids.push(id);
            }
            matched_docs.push(doc_id);
        }

        if item_ids.is_empty() || refund_total <= 0.0 {
            return Ok(matched_docs);
        }

        self.notifications
            .create(
                event_id,
                Notification {
                    title: "Artikel ist/sind ausverkauft".to_string(),
                    message: "Unten stehenden Betrag erstatten und bestätigen".to_string(),
                    point_of_service: Some(pos_name.to_string()),
                    price: Some(refund_total),
                    item_ids,
                    order_id: Some(order_id.to_string()),
                    severity: Severity::Error,
                    action: Some("refund".to_string()),
                    status: NotificationStatus::Created,
                    ..Notification::default()
                },
            )
            .await?;
        Ok(matched_docs)
    }

    /// Move every open order at the drained POS to the substitute.
    /// A failed order never aborts its siblings.
    async fn migrate_open_orders(
        &self,
        event_id: &str,
        from_pos: &str,
        target: &(String, usize),
        item_id: &str,
    ) -> AppResult<()> {
        let (to_pos, open) = target;
        tracing::info!(
            event_id,
            item_id,
            from_pos,
            to_pos = %to_pos,
            target_open_orders = open,
            "migrating open orders to substitute POS"
        );
        let mut availability = AvailabilityCache::new(item_id);
        for (order_id, order) in self.gateway.list_open_orders(event_id, from_pos).await? {
            let result = migration::migrate_order(
                &self.gateway,
                &mut availability,
                event_id,
                from_pos,
                to_pos,
                &order_id,
                &order,
                item_id,
            )
            .await;
            if let Err(err) = result {
                tracing::error!(
                    event_id,
                    order_id = %order_id,
                    error = %err,
                    "order migration failed, continuing with remaining orders"
                );
            }
        }
        Ok(())
    }
}
