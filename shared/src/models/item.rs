//! Canonical and POS-local item models

use serde::{Deserialize, Serialize};

/// Canonical (event-level) item definition.
///
/// `isAvailable` is the global derived flag owned by the availability
/// reconciler; everything else is catalog data mutated externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_out: Option<bool>,
}

/// POS-local snapshot of a canonical item plus the POS-local `isAvailable`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_out: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_extras: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_ingredients: Vec<String>,
}

impl PosItem {
    /// An absent flag counts as available
    pub fn available(&self) -> bool {
        self.is_available != Some(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_flag_counts_as_available() {
        let item: PosItem = serde_json::from_str("{}").unwrap();
        assert!(item.available());

        let item: PosItem = serde_json::from_str(r#"{"isAvailable":false}"#).unwrap();
        assert!(!item.available());

        let item: PosItem = serde_json::from_str(r#"{"isAvailable":true}"#).unwrap();
        assert!(item.available());
    }
}
