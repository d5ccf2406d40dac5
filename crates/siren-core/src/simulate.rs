//! Dry-run simulation: the full escalation timeline of a policy.
//!
//! Lets an operator answer "who would be paged, and when?" without
//! waiting for a real alert to age through the tiers. Read-only: no
//! alerts, no events, no deliveries.

use serde::{Deserialize, Serialize};

use crate::alert::EscalationAction;
use crate::policy::{EscalationPolicy, NotifyMethod, PolicyId, TargetRef};
use crate::resolver::cumulative_timeout_minutes;

/// One projected firing in a policy timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub tier_number: u32,
    pub timeout_minutes: u32,
    /// Minutes after alert creation at which this tier fires
    /// (cumulative over all preceding tiers).
    pub fires_after_minutes: u64,
    pub notify_via: Vec<NotifyMethod>,
    pub targets: Vec<TargetRef>,
    pub action: EscalationAction,
}

/// Simulation output for one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub policy_id: PolicyId,
    pub policy_name: String,
    /// Reported as configured; repeat cycles are not unrolled into the
    /// timeline.
    pub repeat_count: u32,
    pub timeline: Vec<TimelineEntry>,
}

/// Project every tier of a policy onto the time axis.
pub fn simulate_policy(policy: &EscalationPolicy) -> SimulationReport {
    let timeline = policy
        .tiers
        .iter()
        .enumerate()
        .map(|(index, tier)| TimelineEntry {
            tier_number: tier.tier_number,
            timeout_minutes: tier.timeout_minutes,
            fires_after_minutes: cumulative_timeout_minutes(policy, index),
            notify_via: tier.notify_via.clone(),
            targets: tier.targets.clone(),
            action: EscalationAction::Notify,
        })
        .collect();

    SimulationReport {
        policy_id: policy.id,
        policy_name: policy.name.clone(),
        repeat_count: policy.repeat_count,
        timeline,
    }
}
