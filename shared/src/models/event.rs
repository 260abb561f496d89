//! Event (tenant) model

use serde::{Deserialize, Serialize};

/// How purchased items are spread over the points of sale of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistributionMode {
    /// Least-loaded assignment by open-order count per POS
    #[default]
    Balanced,
    /// Reserved; selecting it is a failure
    Grouped,
}

/// Event document — the tenant namespace.
///
/// Created and mutated externally; the engine only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub distribution_mode: DistributionMode,
}
