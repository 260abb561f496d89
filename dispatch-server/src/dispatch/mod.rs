//! Order distribution
//!
//! - `normalizer`: reduces the historical quantity representations of a
//!   purchase line item to canonical single-unit line items
//! - `scheduler`: least-loaded assignment of canonical items to points of
//!   sale and atomic materialization of the per-POS sub-orders
//! - `orchestrator`: reacts to the purchase paid edge and drives the
//!   scheduler exactly once per purchase

pub mod normalizer;
pub mod orchestrator;
pub mod scheduler;

pub use normalizer::{CanonicalItem, normalize};
pub use orchestrator::PurchaseOrchestrator;
pub use scheduler::{
    DistributedTo, DistributionOutcome, DistributionRequest, DistributionScheduler,
};
