//! Distribution scheduler
//!
//! Assigns each canonical line item to the least-loaded point of sale that
//! offers it, then materializes one distributed order per receiving POS in a
//! single batched write.
//!
//! Open-order counts are read once per POS and memoized for the duration of
//! one call; they are never cached across calls, so load observations are
//! point-in-time and balance stays best-effort.

use super::normalizer::CanonicalItem;
use crate::store::{Document, StoreGateway, gateway};
use serde::Serialize;
use serde_json::json;
use shared::models::{DistributionMode, ServingPoint};
use shared::util::group_key;
use shared::{AppError, AppResult};
use std::collections::HashMap;

/// One distribution request
#[derive(Debug, Clone)]
pub struct DistributionRequest {
    pub event_id: String,
    pub purchase_id: String,
    pub items: Vec<CanonicalItem>,
    pub serving_point: ServingPoint,
    pub mode: DistributionMode,
    pub note: Option<String>,
}

/// Where one sub-order landed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedTo {
    pub pos_id: String,
    pub pos_name: String,
    pub order_id: String,
    pub items_count: usize,
}

/// Outcome of one distribution call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionOutcome {
    pub success: bool,
    pub purchase_id: String,
    pub distributed_purchases: Vec<DistributedTo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DistributionOutcome {
    fn done(purchase_id: String, distributed_purchases: Vec<DistributedTo>) -> Self {
        Self {
            success: true,
            purchase_id,
            distributed_purchases,
            error: None,
        }
    }

    fn failed(purchase_id: String, error: impl Into<String>) -> Self {
        Self {
            success: false,
            purchase_id,
            distributed_purchases: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A POS candidate with its offered item ids
struct PosCandidate {
    id: String,
    name: String,
    item_ids: Vec<String>,
}

impl PosCandidate {
    fn offers(&self, item_id: &str) -> bool {
        self.item_ids.iter().any(|id| id == item_id)
    }
}

/// One grouped line of a materialized sub-order
struct GroupedLine {
    count: i64,
    item: CanonicalItem,
}

/// Least-loaded distribution scheduler
#[derive(Clone)]
pub struct DistributionScheduler {
    gateway: StoreGateway,
}

impl DistributionScheduler {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Distribute a purchase over the event's points of sale.
    ///
    /// Soft failures (no POS, missing fields) come back as an unsuccessful
    /// outcome; unsupported modes and store failures are hard errors.
    pub async fn distribute(&self, req: DistributionRequest) -> AppResult<DistributionOutcome> {
        if req.mode == DistributionMode::Grouped {
            return Err(AppError::unsupported(
                "grouped distribution mode not yet implemented",
            ));
        }
        if req.event_id.is_empty() || req.purchase_id.is_empty() {
            return Ok(DistributionOutcome::failed(
                req.purchase_id,
                "Missing required fields",
            ));
        }

        // Candidate set: every POS with its offered items, in enumeration
        // order (document id ascending) so tie-breaks stay deterministic
        let pos_list = self.gateway.list_pos(&req.event_id).await?;
        if pos_list.is_empty() {
            return Ok(DistributionOutcome::failed(
                req.purchase_id,
                "No Points of Sale found",
            ));
        }
        let mut candidates = Vec::with_capacity(pos_list.len());
        for (pos_id, pos) in pos_list {
            let items = self.gateway.list_pos_items(&req.event_id, &pos_id).await?;
            candidates.push(PosCandidate {
                id: pos_id,
                name: pos.name,
                item_ids: items.into_iter().map(|(id, _)| id).collect(),
            });
        }

        // Bucket each item onto the least-loaded capable POS
        let mut open_counts: HashMap<String, usize> = HashMap::new();
        let mut buckets: Vec<Vec<CanonicalItem>> = vec![Vec::new(); candidates.len()];
        for item in &req.items {
            let mut best: Option<(usize, usize)> = None; // (candidate index, open count)
            for (idx, pos) in candidates.iter().enumerate() {
                if !pos.offers(&item.item_id) {
                    continue;
                }
                let count = match open_counts.get(&pos.id).copied() {
                    Some(count) => count,
                    None => {
                        let count = self
                            .gateway
                            .count_open_orders(&req.event_id, &pos.id)
                            .await?;
                        open_counts.insert(pos.id.clone(), count);
                        count
                    }
                };
                // Strictly-less keeps the first candidate on ties
                if best.is_none_or(|(_, best_count)| count < best_count) {
                    best = Some((idx, count));
                }
            }
            match best {
                Some((idx, _)) => buckets[idx].push(item.clone()),
                None => {
                    tracing::warn!(
                        event_id = %req.event_id,
                        purchase_id = %req.purchase_id,
                        item_id = %item.item_id,
                        "item not offered at any point of sale, dropping"
                    );
                }
            }
        }

        // Materialize one sub-order per non-empty bucket
        let mut distributed = Vec::new();
        for (idx, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let pos = &candidates[idx];
            let units = bucket.len();
            let order = gateway::doc(json!({
                "id": &req.purchase_id,
                "orderStatus": "open",
                "orderDate": gateway::server_timestamp(),
                "servingPointName": &req.serving_point.name,
                "servingPointLocation": &req.serving_point.location,
                "note": &req.note,
            }));
            let items = group_bucket(bucket)
                .into_iter()
                .map(|(key, line)| (key, line_document(&line)))
                .collect();

            self.gateway
                .write_distributed_order(&req.event_id, &pos.id, &req.purchase_id, order, items)
                .await?;

            tracing::info!(
                event_id = %req.event_id,
                purchase_id = %req.purchase_id,
                pos_id = %pos.id,
                units,
                "sub-order materialized"
            );
            distributed.push(DistributedTo {
                pos_id: pos.id.clone(),
                pos_name: pos.name.clone(),
                order_id: req.purchase_id.clone(),
                items_count: units,
            });
        }

        Ok(DistributionOutcome::done(req.purchase_id, distributed))
    }
}

/// Group a bucket by `(itemId, extras, excluded)`, summing counts and
/// keeping first-seen order
fn group_bucket(bucket: Vec<CanonicalItem>) -> Vec<(String, GroupedLine)> {
    let mut groups: Vec<(String, GroupedLine)> = Vec::new();
    for item in bucket {
        let key = group_key(
            &item.item_id,
            &item.selected_extras,
            &item.excluded_ingredients,
        );
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, line)) => line.count += 1,
            None => groups.push((key, GroupedLine { count: 1, item })),
        }
    }
    groups
}

fn line_document(line: &GroupedLine) -> Document {
    gateway::doc(json!({
        "id": &line.item.item_id,
        "name": &line.item.name,
        "price": line.item.price,
        "count": line.count,
        "category": &line.item.category,
        "categoryName": &line.item.category_name,
        "selectedExtras": &line.item.selected_extras,
        "excludedIngredients": &line.item.excluded_ingredients,
    }))
}
