//! Purchase orchestrator
//!
//! Reacts to writes on the main purchase documents. Distribution runs on
//! the paid transition (`isPaid: false → true`) and exactly once per
//! purchase: the transport delivers at-least-once, the `distributed` marker
//! collapses duplicates to at-most-once.

use super::normalizer::normalize;
use super::scheduler::{DistributionRequest, DistributionScheduler};
use crate::store::{StoreGateway, gateway};
use serde_json::json;
use shared::models::Purchase;
use shared::{AppError, AppResult};

/// Purchase-trigger reactor
#[derive(Clone)]
pub struct PurchaseOrchestrator {
    gateway: StoreGateway,
    scheduler: DistributionScheduler,
}

impl PurchaseOrchestrator {
    pub fn new(gateway: StoreGateway, scheduler: DistributionScheduler) -> Self {
        Self { gateway, scheduler }
    }

    /// Handle one write on `Orders/{purchaseId}`.
    ///
    /// Guard order matters: deletions and non-paid states are silent skips,
    /// a purchase already marked distributed is the idempotency guard, and
    /// missing serving-point data is logged but never retried.
    pub async fn on_purchase_write(
        &self,
        event_id: &str,
        purchase_id: &str,
        before: Option<&Purchase>,
        after: Option<&Purchase>,
    ) -> AppResult<()> {
        let Some(after) = after else {
            return Ok(()); // deleted
        };
        if !after.is_paid {
            return Ok(()); // not yet payable
        }
        if before.is_some_and(|b| b.is_paid) {
            return Ok(()); // already processed on the paid transition
        }
        if after.distributed {
            tracing::debug!(event_id, purchase_id, "purchase already distributed, skipping");
            return Ok(());
        }
        let Some(serving_point_id) = after.serving_point_id.as_deref() else {
            tracing::error!(event_id, purchase_id, "paid purchase without servingPointId");
            return Ok(());
        };
        let Some(serving_point) = self
            .gateway
            .get_serving_point(event_id, serving_point_id)
            .await?
        else {
            tracing::error!(
                event_id,
                purchase_id,
                serving_point_id,
                "serving point not found"
            );
            return Ok(());
        };

        // Canonical line items, enriched from the catalog where possible
        let mut items = Vec::new();
        for (doc_id, raw) in self.gateway.list_purchase_items(event_id, purchase_id).await? {
            for mut canonical in normalize(&doc_id, &raw) {
                if let Some(catalog) = self.gateway.get_item(event_id, &canonical.item_id).await? {
                    canonical.enrich(&catalog);
                }
                items.push(canonical);
            }
        }

        let event = self.gateway.get_event(event_id).await?;
        let request = DistributionRequest {
            event_id: event_id.to_string(),
            purchase_id: purchase_id.to_string(),
            items,
            serving_point,
            mode: event.distribution_mode,
            note: after.note.clone(),
        };

        match self.scheduler.distribute(request).await {
            Ok(outcome) if outcome.success => {
                self.gateway
                    .update_purchase(
                        event_id,
                        purchase_id,
                        gateway::doc(json!({
                            "distributed": true,
                            "distributedAt": gateway::server_timestamp(),
                        })),
                    )
                    .await?;
                tracing::info!(
                    event_id,
                    purchase_id,
                    sub_orders = outcome.distributed_purchases.len(),
                    "purchase distributed"
                );
                Ok(())
            }
            Ok(outcome) => {
                let message = outcome
                    .error
                    .unwrap_or_else(|| "distribution failed".to_string());
                self.record_failure(event_id, purchase_id, &message).await;
                Err(AppError::distribution_failed(message))
            }
            Err(err) => {
                self.record_failure(event_id, purchase_id, &err.message).await;
                Err(err)
            }
        }
    }

    /// Failures are recorded on the purchase document; the write itself is
    /// best-effort because the trigger already failed
    async fn record_failure(&self, event_id: &str, purchase_id: &str, message: &str) {
        let result = self
            .gateway
            .update_purchase(
                event_id,
                purchase_id,
                gateway::doc(json!({
                    "distributionError": message,
                    "distributionFailed": true,
                })),
            )
            .await;
        if let Err(err) = result {
            tracing::error!(
                event_id,
                purchase_id,
                error = %err,
                "failed to record distribution failure"
            );
        }
    }
}
