//! Distributed order models (the POS-local sub-order)

use crate::util::coerce_quantity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Distributed order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Open,
    Transferred,
    Completed,
    #[serde(other)]
    Other,
}

/// Distributed order item status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Active,
    MarkedForCanceling,
    Canceled,
    #[serde(other)]
    Other,
}

/// Distributed order — the POS-local projection of a purchase.
///
/// Shares the purchase's id, which makes materialization idempotent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_point_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_point_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transferred_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tablet_number: Option<i64>,
}

/// Distributed order line item.
///
/// Freshly scheduled items carry `id` and `count`; migrated items carry
/// `itemId` and `quantity`. The accessors below paper over the split.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributedItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_extras: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_ingredients: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
}

impl DistributedItem {
    /// Canonical item id, wherever it is carried
    pub fn item_id(&self) -> Option<&str> {
        self.item_id.as_deref().or(self.id.as_deref())
    }

    /// Units in this line, from `quantity` or `count`
    pub fn units(&self) -> i64 {
        coerce_quantity(self.quantity.as_ref().or(self.count.as_ref()))
    }

    /// Zero-quantity items are treated as canceled on read
    pub fn is_canceled(&self) -> bool {
        self.status == Some(ItemStatus::Canceled) || self.units() == 0
    }
}
