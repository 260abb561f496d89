//! Purchase (main order) models

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Purchase — the customer-facing order at event level.
///
/// `distributed` is the engine-owned marker that collapses at-least-once
/// trigger deliveries to at-most-one distribution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_point_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_placed: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub distributed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributed_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution_error: Option<String>,
    #[serde(default)]
    pub distribution_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

/// One entry of a purchase item's `entries[]` array
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemEntry {
    /// Raw quantity as stored; may be a number or a numeric string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_extras: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_ingredients: Option<Vec<String>>,
}

/// Purchase line item as stored.
///
/// Quantity has historically been carried three ways (`quantity`, `count`,
/// per-entry quantities); the normalizer reduces them to canonical line
/// items. Catalog fields may be present as a fallback for items missing from
/// the canonical collection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_extras: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_ingredients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<PurchaseItemEntry>>,
    /// Set on already-canonicalized line items; they collapse to themselves
    #[serde(
        default,
        rename = "__calculated",
        skip_serializing_if = "Option::is_none"
    )]
    pub calculated: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    // Catalog fallbacks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
}
