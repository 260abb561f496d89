//! Typed collection paths
//!
//! All well-known paths are built and parsed here, so the rest of the engine
//! never concatenates path strings. The root collection name is
//! configurable (`Events` by default; legacy deployments used `PosEvents`).

const SERVING_POINTS: &str = "Serving-Points";
const ITEMS: &str = "Items";
const POINTS_OF_SALE: &str = "Points-of-Sale";
const ORDERS: &str = "Orders";
const NOTIFICATIONS: &str = "Notifications";

/// Path builder bound to a root collection name
#[derive(Debug, Clone)]
pub struct PathConfig {
    root: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self::new("Events")
    }
}

impl PathConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    // ── Event scope ──

    pub fn event(&self, event_id: &str) -> String {
        format!("{}/{}", self.root, event_id)
    }

    pub fn serving_point(&self, event_id: &str, id: &str) -> String {
        format!("{}/{}/{}", self.event(event_id), SERVING_POINTS, id)
    }

    pub fn items(&self, event_id: &str) -> String {
        format!("{}/{}", self.event(event_id), ITEMS)
    }

    pub fn item(&self, event_id: &str, item_id: &str) -> String {
        format!("{}/{}", self.items(event_id), item_id)
    }

    // ── POS scope ──

    pub fn pos_collection(&self, event_id: &str) -> String {
        format!("{}/{}", self.event(event_id), POINTS_OF_SALE)
    }

    pub fn pos(&self, event_id: &str, pos_id: &str) -> String {
        format!("{}/{}", self.pos_collection(event_id), pos_id)
    }

    pub fn pos_items(&self, event_id: &str, pos_id: &str) -> String {
        format!("{}/{}", self.pos(event_id, pos_id), ITEMS)
    }

    pub fn pos_item(&self, event_id: &str, pos_id: &str, item_id: &str) -> String {
        format!("{}/{}", self.pos_items(event_id, pos_id), item_id)
    }

    pub fn pos_orders(&self, event_id: &str, pos_id: &str) -> String {
        format!("{}/{}", self.pos(event_id, pos_id), ORDERS)
    }

    pub fn pos_order(&self, event_id: &str, pos_id: &str, order_id: &str) -> String {
        format!("{}/{}", self.pos_orders(event_id, pos_id), order_id)
    }

    pub fn pos_order_items(&self, event_id: &str, pos_id: &str, order_id: &str) -> String {
        format!("{}/{}", self.pos_order(event_id, pos_id, order_id), ITEMS)
    }

    pub fn pos_order_item(
        &self,
        event_id: &str,
        pos_id: &str,
        order_id: &str,
        key: &str,
    ) -> String {
        format!("{}/{}", self.pos_order_items(event_id, pos_id, order_id), key)
    }

    // ── Purchase scope ──

    pub fn purchases(&self, event_id: &str) -> String {
        format!("{}/{}", self.event(event_id), ORDERS)
    }

    pub fn purchase(&self, event_id: &str, purchase_id: &str) -> String {
        format!("{}/{}", self.purchases(event_id), purchase_id)
    }

    pub fn purchase_items(&self, event_id: &str, purchase_id: &str) -> String {
        format!("{}/{}", self.purchase(event_id, purchase_id), ITEMS)
    }

    pub fn purchase_item(&self, event_id: &str, purchase_id: &str, item_id: &str) -> String {
        format!("{}/{}", self.purchase_items(event_id, purchase_id), item_id)
    }

    // ── Notifications ──

    pub fn notifications(&self, event_id: &str) -> String {
        format!("{}/{}", self.event(event_id), NOTIFICATIONS)
    }

    pub fn notification(&self, event_id: &str, id: &str) -> String {
        format!("{}/{}", self.notifications(event_id), id)
    }

    /// Classify a document path into the trigger surfaces the engine reacts
    /// to. Paths outside the root collection, collection paths and unknown
    /// shapes return `None`.
    pub fn parse(&self, path: &str) -> Option<DocPath> {
        let segments: Vec<&str> = path.split('/').collect();
        if segments.first() != Some(&self.root.as_str()) {
            return None;
        }
        match segments.as_slice() {
            [_, event_id, ORDERS, purchase_id] => Some(DocPath::Purchase {
                event_id: event_id.to_string(),
                purchase_id: purchase_id.to_string(),
            }),
            [_, event_id, ORDERS, purchase_id, ITEMS, item_id] => Some(DocPath::PurchaseItem {
                event_id: event_id.to_string(),
                purchase_id: purchase_id.to_string(),
                item_id: item_id.to_string(),
            }),
            [_, event_id, POINTS_OF_SALE, pos_id, ITEMS, item_id] => Some(DocPath::PosItem {
                event_id: event_id.to_string(),
                pos_id: pos_id.to_string(),
                item_id: item_id.to_string(),
            }),
            [_, event_id, POINTS_OF_SALE, pos_id, ORDERS, order_id] => Some(DocPath::PosOrder {
                event_id: event_id.to_string(),
                pos_id: pos_id.to_string(),
                order_id: order_id.to_string(),
            }),
            [_, event_id, NOTIFICATIONS, id] => Some(DocPath::Notification {
                event_id: event_id.to_string(),
                id: id.to_string(),
            }),
            _ => None,
        }
    }
}

/// A parsed document path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocPath {
    Purchase {
        event_id: String,
        purchase_id: String,
    },
    PurchaseItem {
        event_id: String,
        purchase_id: String,
        item_id: String,
    },
    PosItem {
        event_id: String,
        pos_id: String,
        item_id: String,
    },
    PosOrder {
        event_id: String,
        pos_id: String,
        order_id: String,
    },
    Notification {
        event_id: String,
        id: String,
    },
}
