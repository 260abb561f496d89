//! Refund propagator
//!
//! Reacts to a notification entering the `refund` status: cancels the
//! matching line items on the main order and every distributed copy, then
//! recomputes the order totals. All steps are repeatable — canceled items
//! stay canceled, totals are a pure recomputation.

use crate::store::{IN_QUERY_CAP, StoreGateway, gateway};
use serde_json::json;
use shared::AppResult;
use shared::models::{Notification, NotificationStatus};

/// Notification-trigger reactor
#[derive(Clone)]
pub struct RefundPropagator {
    gateway: StoreGateway,
}

impl RefundPropagator {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Handle one update on `Notifications/{id}`
    pub async fn on_notification_update(
        &self,
        event_id: &str,
        notification_id: &str,
        before: Option<&Notification>,
        after: Option<&Notification>,
    ) -> AppResult<()> {
        let Some(after) = after else {
            return Ok(());
        };
        // Only the edge into `refund` counts
        if after.status != NotificationStatus::Refund {
            return Ok(());
        }
        if before.is_some_and(|b| b.status == NotificationStatus::Refund) {
            return Ok(());
        }
        let Some(order_id) = after.order_id.as_deref() else {
            tracing::warn!(
                event_id,
                notification_id,
                "refund notification without orderId, skipping"
            );
            return Ok(());
        };
        if after.item_ids.is_empty() {
            tracing::warn!(
                event_id,
                notification_id,
                order_id,
                "refund notification without itemIds, skipping"
            );
            return Ok(());
        }

        // Main order first
        let main_items = self.gateway.paths().purchase_items(event_id, order_id);
        self.cancel_items(&main_items, &after.item_ids).await?;
        let total = self.recompute_total(&main_items).await?;
        self.gateway
            .update_purchase(event_id, order_id, gateway::doc(json!({"totalPrice": total})))
            .await?;

        // Then every POS that holds a distributed copy
        for (pos_id, _) in self.gateway.list_pos(event_id).await? {
            if self
                .gateway
                .get_pos_order(event_id, &pos_id, order_id)
                .await?
                .is_none()
            {
                continue;
            }
            let pos_items = self
                .gateway
                .paths()
                .pos_order_items(event_id, &pos_id, order_id);
            self.cancel_items(&pos_items, &after.item_ids).await?;
            let total = self.recompute_total(&pos_items).await?;
            self.gateway
                .merge_all(vec![(
                    self.gateway.paths().pos_order(event_id, &pos_id, order_id),
                    gateway::doc(json!({"totalPrice": total})),
                )])
                .await?;
        }

        tracing::info!(event_id, order_id, items = after.item_ids.len(), "refund propagated");
        Ok(())
    }

    /// Cancel every line item matching one of the ids, in chunks bounded by
    /// the store's `in`-query cap
    async fn cancel_items(&self, items_collection: &str, item_ids: &[String]) -> AppResult<()> {
        for chunk in item_ids.chunks(IN_QUERY_CAP) {
            let matched = self
                .gateway
                .find_items_by_ids(items_collection, chunk)
                .await?;
            let writes = matched
                .into_iter()
                .map(|(doc_id, _)| {
                    (
                        format!("{}/{}", items_collection, doc_id),
                        gateway::doc(json!({"status": "canceled", "quantity": 0})),
                    )
                })
                .collect::<Vec<_>>();
            if !writes.is_empty() {
                self.gateway.merge_all(writes).await?;
            }
        }
        Ok(())
    }

    /// Sum of `price × quantity` over the non-canceled items
    async fn recompute_total(&self, items_collection: &str) -> AppResult<f64> {
        let items = self.gateway.list_order_items(items_collection).await?;
        let total = items
            .iter()
            .filter(|(_, item)| !item.is_canceled())
            .map(|(_, item)| item.price.unwrap_or(0.0) * item.units() as f64)
            .sum();
        Ok(total)
    }
}
