//! Document models for the store layout
//!
//! One module per entity, mirroring the collection tree:
//!
//! ```text
//! Events/{eventId}
//!   Serving-Points/{id}
//!   Items/{itemId}
//!   Points-of-Sale/{posId}
//!     Items/{itemId}
//!     Orders/{orderId}/Items/{key}
//!   Orders/{purchaseId}/Items/{itemId}
//!   Notifications/{id}
//! ```

pub mod distributed_order;
pub mod event;
pub mod item;
pub mod notification;
pub mod pos;
pub mod purchase;
pub mod serving_point;

pub use distributed_order::{DistributedItem, DistributedOrder, ItemStatus, OrderStatus};
pub use event::{DistributionMode, Event};
pub use item::{Item, PosItem};
pub use notification::{Notification, NotificationStatus, Severity};
pub use pos::PointOfSale;
pub use purchase::{Purchase, PurchaseItem, PurchaseItemEntry};
pub use serving_point::ServingPoint;
