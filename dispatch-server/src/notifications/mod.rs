//! Notification service
//!
//! Deduplicated writes of notification documents. For payloads that carry
//! an order id, at most one non-terminal notification exists per
//! `(orderId, action)`: repeated emissions update the existing document
//! instead of inserting a new one.

use crate::store::{StoreGateway, gateway};
use serde_json::Value;
use shared::models::{Notification, Purchase};
use shared::{AppError, AppResult};

/// Notification reactor and write surface
#[derive(Clone)]
pub struct NotificationService {
    gateway: StoreGateway,
}

impl NotificationService {
    pub fn new(gateway: StoreGateway) -> Self {
        Self { gateway }
    }

    /// Create or update a notification, returning its document id
    pub async fn create(&self, event_id: &str, payload: Notification) -> AppResult<String> {
        if event_id.is_empty() || payload.title.is_empty() || payload.message.is_empty() {
            return Err(AppError::with_message(
                shared::ErrorCode::NotificationInvalid,
                "notification requires eventId, title and message",
            ));
        }

        let mut data = to_document(&payload)?;
        data.insert("updatedAt".to_string(), gateway::server_timestamp());

        if let Some(order_id) = payload.order_id.as_deref() {
            let existing = self
                .gateway
                .find_open_notification(event_id, order_id, payload.action.as_deref())
                .await?;
            if let Some((id, _)) = existing {
                let path = self.gateway.paths().notification(event_id, &id);
                self.gateway.merge_notification(&path, data).await?;
                tracing::debug!(event_id, order_id, notification_id = %id, "notification updated");
                return Ok(id);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        data.insert("createdAt".to_string(), gateway::server_timestamp());
        let path = self.gateway.paths().notification(event_id, &id);
        self.gateway.put_notification(&path, data).await?;
        tracing::debug!(event_id, notification_id = %id, "notification created");
        Ok(id)
    }

    /// Cash-payment side channel: a purchase created with `paymentMethod:
    /// "cash"` raises a staff notification to collect the amount. Peripheral
    /// to distribution; callers log failures and move on.
    pub async fn on_purchase_created(
        &self,
        event_id: &str,
        purchase_id: &str,
        purchase: &Purchase,
    ) -> AppResult<()> {
        if purchase.payment_method.as_deref() != Some("cash") {
            return Ok(());
        }
        self.create(
            event_id,
            Notification {
                title: "Barzahlung ausstehend".to_string(),
                message: "Betrag beim Kunden kassieren und bestätigen".to_string(),
                price: purchase.total_price,
                order_id: Some(purchase_id.to_string()),
                payment_method: Some("cash".to_string()),
                action: Some("cash_payment".to_string()),
                ..Notification::default()
            },
        )
        .await?;
        Ok(())
    }
}

fn to_document(payload: &Notification) -> AppResult<crate::store::Document> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::internal("notification did not serialize to an object")),
        Err(e) => Err(AppError::internal(format!("serialize notification: {}", e))),
    }
}
