//! Engine counters.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Cumulative counters since the engine was constructed.
///
/// Purely observational: nothing in the scheduler reads these back, so a
/// missed increment can never change escalation behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineStats {
    /// Completed scheduler passes.
    pub ticks_completed: u64,
    /// Alerts examined across all ticks.
    pub alerts_scanned: u64,
    /// Successful tier advancements.
    pub escalations_total: u64,
    /// Successful advancements grouped by the tier reached.
    pub escalations_by_tier: HashMap<u32, u64>,
    /// Conditional writes lost to a concurrent writer.
    pub conflicts: u64,
    /// Deliveries that reported failure.
    pub delivery_failures: u64,
    /// Alerts or tenants skipped because a collaborator errored.
    pub skipped_errors: u64,
    /// Acknowledgment signals seen on the event bus.
    pub acks_observed: u64,
}

impl EngineStats {
    pub(crate) fn record_escalation(&mut self, tier: u32) {
        self.escalations_total += 1;
        *self.escalations_by_tier.entry(tier).or_insert(0) += 1;
    }
}
