//! Notification model

use serde::{Deserialize, Serialize};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

/// Notification lifecycle status.
///
/// `Refund` is the confirmation edge written by the staff UI; the refund
/// propagator reacts to the transition into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    #[default]
    Created,
    InProgress,
    Resolved,
    Refund,
    #[serde(other)]
    Other,
}

impl NotificationStatus {
    /// Non-terminal statuses participate in deduplication
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Created | Self::InProgress)
    }
}

/// Notification document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_of_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default)]
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_values() {
        assert_eq!(
            serde_json::to_string(&NotificationStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        let status: NotificationStatus = serde_json::from_str("\"refund\"").unwrap();
        assert_eq!(status, NotificationStatus::Refund);
    }

    #[test]
    fn test_open_statuses() {
        assert!(NotificationStatus::Created.is_open());
        assert!(NotificationStatus::InProgress.is_open());
        assert!(!NotificationStatus::Resolved.is_open());
        assert!(!NotificationStatus::Refund.is_open());
    }
}
