//! Open-order migration between points of sale
//!
//! Moves the transferable items of one open order from a drained POS to a
//! substitute. Destination counts are merged inside a per-item optimistic
//! transaction, with the source deletion in the same transaction, so
//! concurrent writers never lose units.

use super::AvailabilityCache;
use crate::store::{Document, StoreGateway, gateway};
use serde_json::{Value, json};
use shared::AppResult;
use shared::models::{DistributedItem, DistributedOrder, OrderStatus};

/// Migrate one open order from `from_pos` to `to_pos`.
///
/// Transferable items are the triggering item plus every other item the
/// source POS can no longer produce, provided it is still globally
/// available. Items the source still offers stay in place (the order is
/// split), as do globally-unavailable ones (the refund path owns those).
/// When nothing is left at the source afterwards, the source order is
/// closed as `transferred`.
#[allow(clippy::too_many_arguments)]
pub async fn migrate_order(
    gateway: &StoreGateway,
    availability: &mut AvailabilityCache,
    event_id: &str,
    from_pos: &str,
    to_pos: &str,
    order_id: &str,
    order: &DistributedOrder,
    trigger_item: &str,
) -> AppResult<()> {
    let items = gateway
        .list_pos_order_items(event_id, from_pos, order_id)
        .await?;

    let mut transferable = Vec::new();
    for (doc_id, item) in items {
        let Some(id) = item.item_id().map(str::to_string) else {
            continue;
        };
        let moves = if id == trigger_item {
            true
        } else {
            let at_source = gateway
                .get_pos_item(event_id, from_pos, &id)
                .await?
                .map(|local| local.available())
                .unwrap_or(false);
            !at_source && availability.is_available(gateway, event_id, &id).await?
        };
        if moves {
            transferable.push((doc_id, item));
        }
    }
    if transferable.is_empty() {
        return Ok(());
    }

    ensure_destination_order(gateway, event_id, to_pos, order_id, order).await?;

    for (doc_id, item) in &transferable {
        let src = gateway
            .paths()
            .pos_order_item(event_id, from_pos, order_id, doc_id);
        let dst = gateway
            .paths()
            .pos_order_item(event_id, to_pos, order_id, doc_id);
        let new_count = gateway
            .transfer_order_item(&src, &dst, sanitize_item(item), item.units())
            .await?;
        tracing::debug!(
            event_id,
            order_id,
            doc_id = %doc_id,
            new_count,
            "order item transferred"
        );
    }

    // Close out the source order once it has nothing left
    let remaining = gateway
        .list_pos_order_items(event_id, from_pos, order_id)
        .await?;
    if remaining.is_empty() {
        gateway
            .merge_all(vec![(
                gateway.paths().pos_order(event_id, from_pos, order_id),
                gateway::doc(json!({
                    "orderStatus": "transferred",
                    "transferredAt": gateway::server_timestamp(),
                })),
            )])
            .await?;
    }

    tracing::info!(
        event_id,
        order_id,
        from_pos,
        to_pos,
        moved = transferable.len(),
        "open order migrated"
    );
    Ok(())
}

/// Make sure the destination order document exists and is open.
///
/// An existing non-open destination (a previously transferred-away copy) is
/// promoted back to open and loses its `transferredAt` marker; a missing
/// one is created from the source order's denormalized fields.
async fn ensure_destination_order(
    gateway: &StoreGateway,
    event_id: &str,
    to_pos: &str,
    order_id: &str,
    source: &DistributedOrder,
) -> AppResult<()> {
    match gateway.get_pos_order(event_id, to_pos, order_id).await? {
        Some(existing) if existing.order_status != OrderStatus::Open => {
            gateway
                .merge_all(vec![(
                    gateway.paths().pos_order(event_id, to_pos, order_id),
                    gateway::doc(json!({
                        "orderStatus": "open",
                        "transferredAt": Value::Null,
                    })),
                )])
                .await?;
        }
        Some(_) => {}
        None => {
            let mut fields = gateway::doc(json!({
                "id": order_id,
                "orderStatus": "open",
                "orderDate": source
                    .order_date
                    .clone()
                    .map(Value::String)
                    .unwrap_or_else(gateway::server_timestamp),
                "servingPointName": &source.serving_point_name,
                "servingPointLocation": &source.serving_point_location,
                "note": &source.note,
            }));
            if let Some(tablet) = source.tablet_number {
                fields.insert("tabletNumber".to_string(), json!(tablet));
            }
            gateway
                .merge_all(vec![(
                    gateway.paths().pos_order(event_id, to_pos, order_id),
                    fields,
                )])
                .await?;
        }
    }
    Ok(())
}

/// Sanitized destination payload: no `count`, no `categoryName`, no stray
/// `id`; the canonical id moves under `itemId` and the selection arrays are
/// always present. The per-transaction `quantity` is added by the caller.
fn sanitize_item(item: &DistributedItem) -> Document {
    let mut doc = match serde_json::to_value(item) {
        Ok(Value::Object(map)) => map,
        _ => Document::new(),
    };
    let item_id = item.item_id().unwrap_or_default().to_string();
    doc.remove("count");
    doc.remove("categoryName");
    doc.remove("id");
    doc.remove("quantity");
    doc.insert("itemId".to_string(), json!(item_id));
    doc.entry("selectedExtras".to_string())
        .or_insert_with(|| json!([]));
    doc.entry("excludedIngredients".to_string())
        .or_insert_with(|| json!([]));
    doc
}
