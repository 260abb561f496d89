//! Order API Handlers
//!
//! `distribute` is the synchronous RPC variant of the purchase flow: it
//! creates the main purchase with a freshly generated id, runs the
//! scheduler, and only then flips the purchase to paid-and-distributed in a
//! single merge — so the purchase trigger observes `distributed = true` and
//! stays idempotent.

use crate::core::ServerState;
use crate::dispatch::{DistributionRequest, normalize};
use crate::store::gateway;
use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use shared::models::{DistributionMode, PurchaseItem};
use shared::{ApiResponse, AppError, AppResult};

use crate::dispatch::DistributionOutcome;

/// `distributeOrder` request body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributeOrderRequest {
    #[serde(default)]
    pub event_id: String,
    #[serde(default)]
    pub items: Vec<PurchaseItem>,
    /// Serving point id within the event
    #[serde(default)]
    pub serving_point: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub distribution_mode: Option<DistributionMode>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// POST /api/orders/distribute
pub async fn distribute(
    State(state): State<ServerState>,
    Json(req): Json<DistributeOrderRequest>,
) -> AppResult<ApiResponse<DistributionOutcome>> {
    if req.event_id.is_empty() || req.serving_point.is_empty() || req.items.is_empty() {
        return Err(AppError::required_fields());
    }

    let serving_point = state
        .gateway
        .get_serving_point(&req.event_id, &req.serving_point)
        .await?
        .ok_or_else(|| AppError::not_found("Serving point"))?;

    // Materialize the main purchase first so the engine state is inspectable
    // even when scheduling fails
    let purchase_id = uuid::Uuid::new_v4().to_string();
    let purchase = gateway::doc(json!({
        "servingPointId": &req.serving_point,
        "userId": &req.user_id,
        "note": &req.note,
        "paymentMethod": &req.payment_method,
        "isPaid": false,
        "orderPlaced": gateway::server_timestamp(),
    }));
    let mut item_docs = Vec::new();
    for item in &req.items {
        let Some(item_id) = item.item_id.clone() else {
            tracing::warn!(event_id = %req.event_id, "request item without itemId, dropping");
            continue;
        };
        let data = match serde_json::to_value(item) {
            Ok(Value::Object(map)) => map,
            _ => continue,
        };
        item_docs.push((item_id, data));
    }
    state
        .gateway
        .create_purchase(&req.event_id, &purchase_id, purchase, item_docs)
        .await?;

    // Canonical line items, enriched from the catalog
    let mut items = Vec::new();
    for (doc_id, raw) in state
        .gateway
        .list_purchase_items(&req.event_id, &purchase_id)
        .await?
    {
        for mut canonical in normalize(&doc_id, &raw) {
            if let Some(catalog) = state
                .gateway
                .get_item(&req.event_id, &canonical.item_id)
                .await?
            {
                canonical.enrich(&catalog);
            }
            items.push(canonical);
        }
    }

    let mode = match req.distribution_mode {
        Some(mode) => mode,
        None => {
            state
                .gateway
                .get_event(&req.event_id)
                .await?
                .distribution_mode
        }
    };

    let outcome = state
        .scheduler
        .distribute(DistributionRequest {
            event_id: req.event_id.clone(),
            purchase_id: purchase_id.clone(),
            items,
            serving_point,
            mode,
            note: req.note.clone(),
        })
        .await;

    match outcome {
        Ok(outcome) if outcome.success => {
            state
                .gateway
                .update_purchase(
                    &req.event_id,
                    &purchase_id,
                    gateway::doc(json!({
                        "isPaid": true,
                        "distributed": true,
                        "distributedAt": gateway::server_timestamp(),
                    })),
                )
                .await?;
            Ok(ApiResponse::success(outcome))
        }
        Ok(outcome) => {
            record_failure(&state, &req.event_id, &purchase_id, outcome.error.as_deref()).await;
            Ok(ApiResponse::success(outcome))
        }
        Err(err) => {
            record_failure(&state, &req.event_id, &purchase_id, Some(&err.message)).await;
            Err(err)
        }
    }
}

async fn record_failure(
    state: &ServerState,
    event_id: &str,
    purchase_id: &str,
    message: Option<&str>,
) {
    let message = message.unwrap_or("distribution failed");
    let result = state
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
