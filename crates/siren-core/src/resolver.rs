//! Tier resolution: decide whether an alert is due for its next tier.
//!
//! Pure functions over policy + current tier + alert age. No clocks and
//! no I/O; the caller supplies the age so the logic is fully testable.

use crate::policy::{EscalationPolicy, Tier};

/// Find the tier an alert should escalate to, if any.
///
/// The candidate is the first tier in list order whose number exceeds
/// `current_tier`. When the ladder is exhausted and `repeat_count` is
/// positive, the cycle wraps to the first tier; only positivity is
/// consulted, so a positive count cycles indefinitely.
///
/// The candidate fires when the alert age has reached the cumulative
/// timeout of every tier up to and including it, anchored at alert
/// creation. The comparison is inclusive: an age exactly equal to the
/// cumulative timeout escalates.
pub fn next_due_tier<'a>(
    policy: &'a EscalationPolicy,
    current_tier: u32,
    alert_age: chrono::Duration,
) -> Option<&'a Tier> {
    if policy.tiers.is_empty() {
        return None;
    }

    let candidate_index = match policy
        .tiers
        .iter()
        .position(|t| t.tier_number > current_tier)
    {
        Some(index) => index,
        None => {
            let highest = policy.highest_tier_number()?;
            if policy.repeat_count > 0 && current_tier >= highest {
                // Wraparound: the cycle restarts at the first tier, whose
                // cumulative timeout an aged alert always satisfies.
                0
            } else {
                return None;
            }
        }
    };

    let cumulative = cumulative_timeout_minutes(policy, candidate_index);
    if alert_age >= chrono::Duration::minutes(cumulative as i64) {
        Some(&policy.tiers[candidate_index])
    } else {
        None
    }
}

/// Sum of `timeout_minutes` for tiers `[0..=tier_index]`.
///
/// Deadlines are cumulative from alert creation, not relative to the
/// previous escalation, so a checker that was down simply fires the next
/// pending tier on its next pass.
pub fn cumulative_timeout_minutes(policy: &EscalationPolicy, tier_index: usize) -> u64 {
    policy
        .tiers
        .iter()
        .take(tier_index + 1)
        .map(|t| t.timeout_minutes as u64)
        .sum()
}
