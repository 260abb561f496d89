//! End-to-end flows against the embedded store: distribution, availability
//! reconciliation, migration and refund propagation, driven through the
//! real trigger handlers.

use dispatch_server::core::{Config, ServerState};
use dispatch_server::dispatch::{DistributionRequest, DistributionScheduler};
use dispatch_server::store::{MemoryStore, Query, WriteOp};
use serde_json::{Value, json};
use shared::models::{
    DistributionMode, Notification, PosItem, Purchase, ServingPoint,
};
use std::sync::Arc;

fn test_config() -> Config {
    Config {
        http_port: 0,
        events_collection: "Events".to_string(),
        trigger_buffer: 64,
        shutdown_timeout_ms: 1000,
        environment: "test".to_string(),
    }
}

fn test_state() -> ServerState {
    ServerState::with_store(&test_config(), Arc::new(MemoryStore::new()))
}

async fn seed(state: &ServerState, path: &str, value: Value) {
    state
        .store
        .commit(vec![WriteOp::set(path, value.as_object().unwrap().clone())])
        .await
        .unwrap();
}

async fn read(state: &ServerState, path: &str) -> Option<serde_json::Map<String, Value>> {
    state.store.get(path).await.unwrap()
}

fn purchase(value: Value) -> Purchase {
    serde_json::from_value(value).unwrap()
}

fn pos_item(value: Value) -> PosItem {
    serde_json::from_value(value).unwrap()
}

fn notification(value: Value) -> Notification {
    serde_json::from_value(value).unwrap()
}

/// Event e1 with serving point t1 and catalog items x (4.00) and y (3.00)
async fn seed_event_basics(state: &ServerState) {
    seed(state, "Events/e1", json!({"distributionMode": "balanced"})).await;
    seed(
        state,
        "Events/e1/Serving-Points/t1",
        json!({"name": "Table 1", "location": "Main hall"}),
    )
    .await;
    seed(
        state,
        "Events/e1/Items/x",
        json!({"name": "Bratwurst", "price": 4.0, "category": "food", "categoryName": "Grill", "isAvailable": true}),
    )
    .await;
    seed(
        state,
        "Events/e1/Items/y",
        json!({"name": "Limo", "price": 3.0, "category": "drinks", "categoryName": "Bar", "isAvailable": true}),
    )
    .await;
}

async fn seed_pos(state: &ServerState, pos_id: &str, name: &str, items: &[&str]) {
    seed(
        state,
        &format!("Events/e1/Points-of-Sale/{}", pos_id),
        json!({"name": name}),
    )
    .await;
    for item in items {
        seed(
            state,
            &format!("Events/e1/Points-of-Sale/{}/Items/{}", pos_id, item),
            json!({"name": item, "isAvailable": true}),
        )
        .await;
    }
}

async fn seed_open_orders(state: &ServerState, pos_id: &str, count: usize) {
    for i in 0..count {
        seed(
            state,
            &format!("Events/e1/Points-of-Sale/{}/Orders/seed-{}", pos_id, i),
            json!({"id": format!("seed-{}", i), "orderStatus": "open"}),
        )
        .await;
    }
}

// =========================================================================
// Distribution
// =========================================================================

#[tokio::test]
async fn test_balanced_distribution_prefers_least_loaded_pos() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x", "y"]).await;
    seed_pos(&state, "b", "Bar", &["x", "y"]).await;
    seed_open_orders(&state, "a", 2).await;
    seed_open_orders(&state, "b", 1).await;

    seed(
        &state,
        "Events/e1/Orders/p1",
        json!({"servingPointId": "t1", "isPaid": false}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p1/Items/x",
        json!({"itemId": "x", "quantity": 2}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p1/Items/y",
        json!({"itemId": "y", "quantity": 1}),
    )
    .await;

    let before = purchase(json!({"servingPointId": "t1", "isPaid": false}));
    let after = purchase(json!({"servingPointId": "t1", "isPaid": true}));
    state
        .orchestrator
        .on_purchase_write("e1", "p1", Some(&before), Some(&after))
        .await
        .unwrap();

    // Open counts were a:2, b:1 at call start and are not re-read per
    // assignment, so everything lands on b
    assert!(read(&state, "Events/e1/Points-of-Sale/a/Orders/p1").await.is_none());

    let order = read(&state, "Events/e1/Points-of-Sale/b/Orders/p1")
        .await
        .expect("sub-order at b");
    assert_eq!(order["orderStatus"], json!("open"));
    assert_eq!(order["servingPointName"], json!("Table 1"));
    assert_eq!(order["servingPointLocation"], json!("Main hall"));
    assert!(order["orderDate"].as_str().unwrap().starts_with("20"));

    let x_line = read(&state, "Events/e1/Points-of-Sale/b/Orders/p1/Items/x__")
        .await
        .expect("grouped x line");
    assert_eq!(x_line["count"], json!(2));
    assert_eq!(x_line["name"], json!("Bratwurst"));
    assert_eq!(x_line["price"], json!(4.0));

    let y_line = read(&state, "Events/e1/Points-of-Sale/b/Orders/p1/Items/y__")
        .await
        .expect("grouped y line");
    assert_eq!(y_line["count"], json!(1));

    // Purchase carries the distribution marker
    let main = read(&state, "Events/e1/Orders/p1").await.unwrap();
    assert_eq!(main["distributed"], json!(true));
    assert!(main["distributedAt"].as_str().unwrap().starts_with("20"));
}

#[tokio::test]
async fn test_unroutable_items_are_dropped_with_success() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;
    seed_pos(&state, "b", "Bar", &["x"]).await;

    seed(
        &state,
        "Events/e1/Orders/p2",
        json!({"servingPointId": "t1", "isPaid": false}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p2/Items/z",
        json!({"itemId": "z", "quantity": 1}),
    )
    .await;

    let before = purchase(json!({"servingPointId": "t1", "isPaid": false}));
    let after = purchase(json!({"servingPointId": "t1", "isPaid": true}));
    state
        .orchestrator
        .on_purchase_write("e1", "p2", Some(&before), Some(&after))
        .await
        .unwrap();

    // Nothing was materialized, yet the purchase counts as distributed
    assert!(read(&state, "Events/e1/Points-of-Sale/a/Orders/p2").await.is_none());
    assert!(read(&state, "Events/e1/Points-of-Sale/b/Orders/p2").await.is_none());
    let main = read(&state, "Events/e1/Orders/p2").await.unwrap();
    assert_eq!(main["distributed"], json!(true));
}

#[tokio::test]
async fn test_entry_selections_flow_into_grouping() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;

    seed(
        &state,
        "Events/e1/Orders/p3",
        json!({"servingPointId": "t1", "isPaid": false}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p3/Items/x",
        json!({
            "itemId": "x",
            "quantity": 3,
            "entries": [{"quantity": 1, "selectedExtras": ["cheese"]}]
        }),
    )
    .await;

    let before = purchase(json!({"servingPointId": "t1", "isPaid": false}));
    let after = purchase(json!({"servingPointId": "t1", "isPaid": true}));
    state
        .orchestrator
        .on_purchase_write("e1", "p3", Some(&before), Some(&after))
        .await
        .unwrap();

    // One canonical item with cheese, two plain
    let with_cheese = read(&state, "Events/e1/Points-of-Sale/a/Orders/p3/Items/x_cheese_")
        .await
        .expect("cheese line");
    assert_eq!(with_cheese["count"], json!(1));
    assert_eq!(with_cheese["selectedExtras"], json!(["cheese"]));

    let plain = read(&state, "Events/e1/Points-of-Sale/a/Orders/p3/Items/x__")
        .await
        .expect("plain line");
    assert_eq!(plain["count"], json!(2));
}

#[tokio::test]
async fn test_redistribution_is_idempotent() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;
    seed(
        &state,
        "Events/e1/Orders/p4",
        json!({"servingPointId": "t1", "isPaid": false}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p4/Items/x",
        json!({"itemId": "x", "quantity": 1}),
    )
    .await;

    let before = purchase(json!({"servingPointId": "t1", "isPaid": false}));
    let after = purchase(json!({"servingPointId": "t1", "isPaid": true}));
    state
        .orchestrator
        .on_purchase_write("e1", "p4", Some(&before), Some(&after))
        .await
        .unwrap();

    // Redelivery of the same transition, now with the marker set
    let redelivered = purchase(json!({
        "servingPointId": "t1",
        "isPaid": true,
        "distributed": true
    }));
    let mut feed = state.store.watch();
    state
        .orchestrator
        .on_purchase_write("e1", "p4", Some(&before), Some(&redelivered))
        .await
        .unwrap();
    state
        .orchestrator
        .on_purchase_write("e1", "p4", Some(&redelivered), Some(&redelivered))
        .await
        .unwrap();

    // No writes happened
    assert!(feed.try_recv().is_err());
}

#[tokio::test]
async fn test_grouped_mode_records_failure_on_purchase() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed(&state, "Events/e1", json!({"distributionMode": "grouped"})).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;
    seed(
        &state,
        "Events/e1/Orders/p5",
        json!({"servingPointId": "t1", "isPaid": false}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/p5/Items/x",
        json!({"itemId": "x", "quantity": 1}),
    )
    .await;

    let before = purchase(json!({"servingPointId": "t1", "isPaid": false}));
    let after = purchase(json!({"servingPointId": "t1", "isPaid": true}));
    let err = state
        .orchestrator
        .on_purchase_write("e1", "p5", Some(&before), Some(&after))
        .await
        .unwrap_err();
    assert_eq!(err.code, shared::ErrorCode::Unsupported);

    let main = read(&state, "Events/e1/Orders/p5").await.unwrap();
    assert_eq!(main["distributionFailed"], json!(true));
    assert_eq!(
        main["distributionError"],
        json!("grouped distribution mode not yet implemented")
    );
    assert!(!main.contains_key("distributed"));
}

#[tokio::test]
async fn test_scheduler_without_pos_reports_soft_failure() {
    let state = test_state();
    seed_event_basics(&state).await;

    let scheduler = DistributionScheduler::new(state.gateway.clone());
    let outcome = scheduler
        .distribute(DistributionRequest {
            event_id: "e1".to_string(),
            purchase_id: "p9".to_string(),
            items: Vec::new(),
            serving_point: ServingPoint::default(),
            mode: DistributionMode::Balanced,
            note: None,
        })
        .await
        .unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("No Points of Sale found"));
}

// =========================================================================
// Availability reconciliation
// =========================================================================

/// An order at a with x and y; b can take over x, c can take over y.
/// Deactivating x at a migrates only x — y stays because a still offers it.
#[tokio::test]
async fn test_deactivation_migrates_trigger_item_and_splits_order() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x", "y"]).await;
    seed_pos(&state, "b", "Backup-Grill", &["x"]).await;
    seed_pos(&state, "c", "Bar", &["y"]).await;

    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1",
        json!({
            "id": "o1",
            "orderStatus": "open",
            "orderDate": "2026-08-01T10:00:00Z",
            "servingPointName": "Table 1",
            "servingPointLocation": "Main hall"
        }),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__",
        json!({"id": "x", "name": "Bratwurst", "price": 4.0, "count": 2, "categoryName": "Grill"}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/y__",
        json!({"id": "y", "name": "Limo", "price": 3.0, "count": 1}),
    )
    .await;

    // The flag flip that fires the trigger
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Items/x",
        json!({"name": "x", "isAvailable": false}),
    )
    .await;
    let before = pos_item(json!({"isAvailable": true}));
    let after = pos_item(json!({"isAvailable": false}));
    state
        .reconciler
        .on_pos_item_update("e1", "a", "x", Some(&before), Some(&after))
        .await
        .unwrap();

    // Global flag stays true: b still offers x
    let canonical = read(&state, "Events/e1/Items/x").await.unwrap();
    assert_eq!(canonical["isAvailable"], json!(true));

    // x moved to b with a sanitized payload
    assert!(read(&state, "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__").await.is_none());
    let moved = read(&state, "Events/e1/Points-of-Sale/b/Orders/o1/Items/x__")
        .await
        .expect("migrated line at b");
    assert_eq!(moved["itemId"], json!("x"));
    assert_eq!(moved["quantity"], json!(2));
    assert!(!moved.contains_key("count"));
    assert!(!moved.contains_key("categoryName"));
    assert!(!moved.contains_key("id"));

    // y stayed, so the source order is still open
    assert!(read(&state, "Events/e1/Points-of-Sale/a/Orders/o1/Items/y__").await.is_some());
    let source_order = read(&state, "Events/e1/Points-of-Sale/a/Orders/o1").await.unwrap();
    assert_eq!(source_order["orderStatus"], json!("open"));

    // The destination order copied the denormalized fields
    let dest_order = read(&state, "Events/e1/Points-of-Sale/b/Orders/o1").await.unwrap();
    assert_eq!(dest_order["orderStatus"], json!("open"));
    assert_eq!(dest_order["servingPointName"], json!("Table 1"));
}

#[tokio::test]
async fn test_migration_merges_destination_counts_and_empties_source() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;
    seed_pos(&state, "b", "Backup-Grill", &["x"]).await;

    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o2",
        json!({"id": "o2", "orderStatus": "open"}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o2/Items/x__",
        json!({"id": "x", "price": 4.0, "count": 2}),
    )
    .await;
    // b already has a copy of o2 with one unit of x
    seed(
        &state,
        "Events/e1/Points-of-Sale/b/Orders/o2",
        json!({"id": "o2", "orderStatus": "transferred", "transferredAt": "2026-08-01T09:00:00Z"}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/b/Orders/o2/Items/x__",
        json!({"itemId": "x", "price": 4.0, "quantity": 1}),
    )
    .await;

    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Items/x",
        json!({"isAvailable": false}),
    )
    .await;
    state
        .reconciler
        .on_pos_item_update(
            "e1",
            "a",
            "x",
            Some(&pos_item(json!({"isAvailable": true}))),
            Some(&pos_item(json!({"isAvailable": false}))),
        )
        .await
        .unwrap();

    // Counts merged: 1 existing + 2 migrated
    let merged = read(&state, "Events/e1/Points-of-Sale/b/Orders/o2/Items/x__")
        .await
        .unwrap();
    assert_eq!(merged["quantity"], json!(3));

    // The destination order was promoted back to open
    let dest = read(&state, "Events/e1/Points-of-Sale/b/Orders/o2").await.unwrap();
    assert_eq!(dest["orderStatus"], json!("open"));
    assert!(!dest.contains_key("transferredAt"));

    // The source lost its last item and is transferred out
    let source = read(&state, "Events/e1/Points-of-Sale/a/Orders/o2").await.unwrap();
    assert_eq!(source["orderStatus"], json!("transferred"));
    assert!(source["transferredAt"].as_str().unwrap().starts_with("20"));
}

/// No substitute POS: the item goes globally unavailable, open orders get
/// refund notifications and their lines are marked for cancellation.
#[tokio::test]
async fn test_sold_out_emits_refund_and_marks_items() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x", "y"]).await;
    seed_pos(&state, "b", "Bar", &["y"]).await;

    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1",
        json!({"id": "o1", "orderStatus": "open"}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__",
        json!({"id": "x", "name": "Bratwurst", "price": 4.0, "count": 2}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/y__",
        json!({"id": "y", "name": "Limo", "price": 3.0, "count": 1}),
    )
    .await;

    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Items/x",
        json!({"isAvailable": false}),
    )
    .await;
    state
        .reconciler
        .on_pos_item_update(
            "e1",
            "a",
            "x",
            Some(&pos_item(json!({"isAvailable": true}))),
            Some(&pos_item(json!({"isAvailable": false}))),
        )
        .await
        .unwrap();

    // Nobody offers x anymore
    let canonical = read(&state, "Events/e1/Items/x").await.unwrap();
    assert_eq!(canonical["isAvailable"], json!(false));

    // The x line is marked, quantities untouched; y is left alone
    let x_line = read(&state, "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__")
        .await
        .unwrap();
    assert_eq!(x_line["status"], json!("marked_for_canceling"));
    assert_eq!(x_line["count"], json!(2));
    let y_line = read(&state, "Events/e1/Points-of-Sale/a/Orders/o1/Items/y__")
        .await
        .unwrap();
    assert!(!y_line.contains_key("status"));

    // Exactly one refund notification for the order
    let notifications = state
        .store
        .list("Events/e1/Notifications", &Query::new())
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    let (_, body) = &notifications[0];
    assert_eq!(body["action"], json!("refund"));
    assert_eq!(body["status"], json!("created"));
    assert_eq!(body["orderId"], json!("o1"));
    assert_eq!(body["price"], json!(8.0));
    assert_eq!(body["itemIds"], json!(["x"]));
    assert_eq!(body["pointOfService"], json!("Grill"));
    assert_eq!(body["title"], json!("Artikel ist/sind ausverkauft"));
}

/// The canonical flag tracks "any POS still offers it" over any sequence of
/// per-POS flips
#[tokio::test]
async fn test_global_flag_follows_pos_flips() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;
    seed_pos(&state, "b", "Bar", &["x"]).await;

    let on = pos_item(json!({"isAvailable": true}));
    let off = pos_item(json!({"isAvailable": false}));

    // a goes dark, b still offers x
    seed(&state, "Events/e1/Points-of-Sale/a/Items/x", json!({"isAvailable": false})).await;
    state
        .reconciler
        .on_pos_item_update("e1", "a", "x", Some(&on), Some(&off))
        .await
        .unwrap();
    assert_eq!(
        read(&state, "Events/e1/Items/x").await.unwrap()["isAvailable"],
        json!(true)
    );

    // b goes dark too
    seed(&state, "Events/e1/Points-of-Sale/b/Items/x", json!({"isAvailable": false})).await;
    state
        .reconciler
        .on_pos_item_update("e1", "b", "x", Some(&on), Some(&off))
        .await
        .unwrap();
    assert_eq!(
        read(&state, "Events/e1/Items/x").await.unwrap()["isAvailable"],
        json!(false)
    );

    // a comes back
    seed(&state, "Events/e1/Points-of-Sale/a/Items/x", json!({"isAvailable": true})).await;
    state
        .reconciler
        .on_pos_item_update("e1", "a", "x", Some(&off), Some(&on))
        .await
        .unwrap();
    assert_eq!(
        read(&state, "Events/e1/Items/x").await.unwrap()["isAvailable"],
        json!(true)
    );

    // No-op delivery leaves everything as is
    state
        .reconciler
        .on_pos_item_update("e1", "a", "x", Some(&on), Some(&on))
        .await
        .unwrap();
    assert_eq!(
        read(&state, "Events/e1/Items/x").await.unwrap()["isAvailable"],
        json!(true)
    );
}

// =========================================================================
// Refund propagation
// =========================================================================

#[tokio::test]
async fn test_refund_cancels_items_and_recomputes_totals_everywhere() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed_pos(&state, "a", "Grill", &["x"]).await;

    // Main order with three lines
    seed(
        &state,
        "Events/e1/Orders/o1",
        json!({"servingPointId": "t1", "isPaid": true, "distributed": true, "totalPrice": 14.0}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/o1/Items/x",
        json!({"itemId": "x", "price": 4.0, "quantity": 2}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/o1/Items/y",
        json!({"itemId": "y", "price": 3.0, "quantity": 1}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Orders/o1/Items/z",
        json!({"itemId": "z", "price": 3.0, "quantity": 1}),
    )
    .await;

    // Distributed copy at a holding x and z
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1",
        json!({"id": "o1", "orderStatus": "open"}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__",
        json!({"id": "x", "price": 4.0, "count": 2}),
    )
    .await;
    seed(
        &state,
        "Events/e1/Points-of-Sale/a/Orders/o1/Items/z__",
        json!({"id": "z", "price": 3.0, "count": 1}),
    )
    .await;

    let created = notification(json!({
        "title": "Artikel ist/sind ausverkauft",
        "message": "Unten stehenden Betrag erstatten und bestätigen",
        "orderId": "o1",
        "itemIds": ["x", "y"],
        "status": "created",
        "action": "refund"
    }));
    let confirmed = notification(json!({
        "title": "Artikel ist/sind ausverkauft",
        "message": "Unten stehenden Betrag erstatten und bestätigen",
        "orderId": "o1",
        "itemIds": ["x", "y"],
        "status": "refund",
        "action": "refund"
    }));
    state
        .propagator
        .on_notification_update("e1", "n1", Some(&created), Some(&confirmed))
        .await
        .unwrap();

    // Main order: x and y canceled, z untouched, total recomputed
    let x = read(&state, "Events/e1/Orders/o1/Items/x").await.unwrap();
    assert_eq!(x["status"], json!("canceled"));
    assert_eq!(x["quantity"], json!(0));
    let y = read(&state, "Events/e1/Orders/o1/Items/y").await.unwrap();
    assert_eq!(y["status"], json!("canceled"));
    let z = read(&state, "Events/e1/Orders/o1/Items/z").await.unwrap();
    assert!(!z.contains_key("status"));
    let main = read(&state, "Events/e1/Orders/o1").await.unwrap();
    assert_eq!(main["totalPrice"], json!(3.0));

    // POS copy: x canceled there as well, total is z only
    let pos_x = read(&state, "Events/e1/Points-of-Sale/a/Orders/o1/Items/x__")
        .await
        .unwrap();
    assert_eq!(pos_x["status"], json!("canceled"));
    assert_eq!(pos_x["quantity"], json!(0));
    let pos_order = read(&state, "Events/e1/Points-of-Sale/a/Orders/o1").await.unwrap();
    assert_eq!(pos_order["totalPrice"], json!(3.0));

    // Replaying the same edge changes nothing (canceled stays canceled)
    state
        .propagator
        .on_notification_update("e1", "n1", Some(&created), Some(&confirmed))
        .await
        .unwrap();
    let x_again = read(&state, "Events/e1/Orders/o1/Items/x").await.unwrap();
    assert_eq!(x_again["quantity"], json!(0));
    let main_again = read(&state, "Events/e1/Orders/o1").await.unwrap();
    assert_eq!(main_again["totalPrice"], json!(3.0));
}

#[tokio::test]
async fn test_refund_requires_the_edge_into_refund_status() {
    let state = test_state();
    seed_event_basics(&state).await;
    seed(
        &state,
        "Events/e1/Orders/o1/Items/x",
        json!({"itemId": "x", "price": 4.0, "quantity": 2}),
    )
    .await;

    let refund = notification(json!({
        "title": "t", "message": "m",
        "orderId": "o1", "itemIds": ["x"], "status": "refund"
    }));
    // Already refunded before: not an edge
    state
        .propagator
        .on_notification_update("e1", "n1", Some(&refund), Some(&refund))
        .await
        .unwrap();
    let x = read(&state, "Events/e1/Orders/o1/Items/x").await.unwrap();
    assert!(!x.contains_key("status"));
    assert_eq!(x["quantity"], json!(2));
}
