//! Trigger router — change-feed fan-out
//!
//! Decouples the store's change feed from the reactors, giving each one an
//! independent channel:
//!
//! ```text
//! DocumentStore (broadcast)
//!        │
//!        └── TriggerRouter
//!               ├── mpsc ──► purchase worker      (onPurchaseWrite / onOrderCreate)
//!               ├── mpsc ──► POS-item worker      (onPosItemUpdate)
//!               └── mpsc ──► notification worker  (onNotificationUpdate)
//! ```
//!
//! Every channel carries business-critical triggers, so sends block rather
//! than drop. A lagging broadcast receiver is a serious problem: skipped
//! changes mean missed distributions.

use crate::core::ServerState;
use crate::store::{ChangeKind, DocChange, DocPath, Document, PathConfig};
use tokio::sync::{broadcast, mpsc};

/// Per-reactor channel set
pub struct TriggerChannels {
    pub purchase_rx: mpsc::Receiver<DocChange>,
    pub pos_item_rx: mpsc::Receiver<DocChange>,
    pub notification_rx: mpsc::Receiver<DocChange>,
}

/// Routes document changes to the reactor channels
pub struct TriggerRouter {
    paths: PathConfig,
    purchase_tx: mpsc::Sender<DocChange>,
    pos_item_tx: mpsc::Sender<DocChange>,
    notification_tx: mpsc::Sender<DocChange>,
}

impl TriggerRouter {
    /// Create the router and its channels
    pub fn new(paths: PathConfig, buffer: usize) -> (Self, TriggerChannels) {
        let (purchase_tx, purchase_rx) = mpsc::channel(buffer);
        let (pos_item_tx, pos_item_rx) = mpsc::channel(buffer);
        let (notification_tx, notification_rx) = mpsc::channel(buffer);

        let router = Self {
            paths,
            purchase_tx,
            pos_item_tx,
            notification_tx,
        };
        let channels = TriggerChannels {
            purchase_rx,
            pos_item_rx,
            notification_rx,
        };
        (router, channels)
    }

    /// Run the router until the source channel closes
    pub async fn run(self, mut source: broadcast::Receiver<DocChange>) {
        tracing::info!("Trigger router started");
        loop {
            match source.recv().await {
                Ok(change) => self.dispatch(change).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::error!(
                        skipped = n,
                        "Trigger router lagged! Changes skipped - triggers may be lost"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Change feed closed, trigger router stopping");
                    break;
                }
            }
        }
    }

    async fn dispatch(&self, change: DocChange) {
        let target = match self.paths.parse(&change.path) {
            Some(DocPath::Purchase { .. }) => &self.purchase_tx,
            Some(DocPath::PosItem { .. }) if change.kind == ChangeKind::Updated => {
                &self.pos_item_tx
            }
            Some(DocPath::Notification { .. }) if change.kind == ChangeKind::Updated => {
                &self.notification_tx
            }
            _ => return,
        };
        if target.send(change).await.is_err() {
            tracing::error!("Trigger channel closed - change dropped");
        }
    }
}

/// Spawn the router and one worker task per reactor
pub fn spawn(state: &ServerState) {
    let (router, channels) = TriggerRouter::new(
        state.gateway.paths().clone(),
        state.config.trigger_buffer,
    );
    let feed = state.store.watch();
    tokio::spawn(router.run(feed));
    tokio::spawn(purchase_worker(state.clone(), channels.purchase_rx));
    tokio::spawn(pos_item_worker(state.clone(), channels.pos_item_rx));
    tokio::spawn(notification_worker(state.clone(), channels.notification_rx));
}

/// Decode a raw document, logging and discarding undecodable ones
fn decode_side<T: serde::de::DeserializeOwned>(path: &str, doc: Option<&Document>) -> Option<T> {
    let doc = doc?;
    match serde_json::from_value(serde_json::Value::Object(doc.clone())) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!(path, error = %err, "undecodable document in change feed");
            None
        }
    }
}

async fn purchase_worker(state: ServerState, mut rx: mpsc::Receiver<DocChange>) {
    while let Some(change) = rx.recv().await {
        let Some(DocPath::Purchase {
            event_id,
            purchase_id,
        }) = state.gateway.paths().parse(&change.path)
        else {
            continue;
        };
        let before = decode_side(&change.path, change.before.as_ref());
        let after = decode_side(&change.path, change.after.as_ref());

        // Cash-payment side channel rides the create edge; its failures
        // never block distribution
        if change.kind == ChangeKind::Created
            && let Some(purchase) = after.as_ref()
            && let Err(err) = state
                .notifications
                .on_purchase_created(&event_id, &purchase_id, purchase)
                .await
        {
            tracing::error!(
                event_id,
                purchase_id,
                error = %err,
                "cash-payment notification failed"
            );
        }

        if let Err(err) = state
            .orchestrator
            .on_purchase_write(&event_id, &purchase_id, before.as_ref(), after.as_ref())
            .await
        {
            tracing::error!(
                event_id,
                purchase_id,
                error = %err,
                retryable = err.is_retryable(),
                "purchase trigger failed"
            );
        }
    }
}

async fn pos_item_worker(state: ServerState, mut rx: mpsc::Receiver<DocChange>) {
    while let Some(change) = rx.recv().await {
        let Some(DocPath::PosItem {
            event_id,
            pos_id,
            item_id,
        }) = state.gateway.paths().parse(&change.path)
        else {
            continue;
        };
        let before = decode_side(&change.path, change.before.as_ref());
        let after = decode_side(&change.path, change.after.as_ref());
        if let Err(err) = state
            .reconciler
            .on_pos_item_update(&event_id, &pos_id, &item_id, before.as_ref(), after.as_ref())
            .await
        {
            tracing::error!(
                event_id,
                pos_id,
                item_id,
                error = %err,
                "POS item trigger failed"
            );
        }
    }
}

async fn notification_worker(state: ServerState, mut rx: mpsc::Receiver<DocChange>) {
    while let Some(change) = rx.recv().await {
        let Some(DocPath::Notification { event_id, id }) =
            state.gateway.paths().parse(&change.path)
        else {
            continue;
        };
        let before = decode_side(&change.path, change.before.as_ref());
        let after = decode_side(&change.path, change.after.as_ref());
        if let Err(err) = state
            .propagator
            .on_notification_update(&event_id, &id, before.as_ref(), after.as_ref())
            .await
        {
            tracing::error!(
                event_id,
                notification_id = %id,
                error = %err,
                "notification trigger failed"
            );
        }
    }
}
