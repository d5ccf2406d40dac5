//! Core types and contracts for the Siren escalation engine.
//!
//! This crate carries everything the engine, stores, channels and CLI
//! share:
//!
//! - **Policy model**: escalation policies, tiers, notify methods
//! - **Tier resolver**: pure next-due-tier computation
//! - **Dry-run simulator**: policy timelines without side effects
//! - **Store contracts**: the traits the engine is injected with
//! - **Event bus**: advisory acknowledgment/escalation broadcast
//!
//! ## Example
//!
//! ```rust
//! use siren_core::policy::{EscalationPolicy, NotifyMethod, Tier};
//! use siren_core::resolver::next_due_tier;
//!
//! let policy = EscalationPolicy::new("standard")
//!     .tier(Tier::new(1, 5).notify(NotifyMethod::ChatDm).target("oncall_primary"))
//!     .tier(Tier::new(2, 10).notify(NotifyMethod::Voice).target("team_lead"));
//!
//! let age = chrono::Duration::minutes(6);
//! let due = next_due_tier(&policy, 0, age).unwrap();
//! assert_eq!(due.tier_number, 1);
//! ```

pub mod alert;
pub mod bus;
pub mod config;
pub mod error;
pub mod policy;
pub mod resolver;
pub mod simulate;
pub mod store;
pub mod tenant;

pub use alert::{
    Alert, AlertId, AlertStatus, AlertSummary, DeliveryResult, EscalationAction, EscalationEvent,
    EventId,
};
pub use bus::{EventBus, EventBusReceiver, FilteredReceiver, SharedEventBus, SirenEvent};
pub use error::{Error, Result};
pub use policy::{EscalationPolicy, NotifyMethod, PolicyId, TargetRef, Tier};
pub use resolver::{cumulative_timeout_minutes, next_due_tier};
pub use simulate::{simulate_policy, SimulationReport, TimelineEntry};
pub use store::{AdvanceOutcome, AlertStore, EventLog, PolicyStore, TenantDirectory};
pub use tenant::{validate_tenant_key, TenantRef};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
