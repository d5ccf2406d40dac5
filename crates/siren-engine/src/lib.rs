//! Escalation engine for the Siren on-call platform.
//!
//! Drives open alerts up their escalation policy ladders on a fixed
//! tick, with conditional writes guaranteeing at-most-once advancement
//! per tier transition.
//!
//! ## Features
//!
//! - **Tick scheduler**: periodic multi-tenant scan, per-alert isolation
//! - **Stateless restarts**: everything recomputed from persisted state
//! - **Ack listener**: event bus subscription for acknowledgment signals
//! - **Counters**: per-tier escalation stats without a metrics backend
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use siren_engine::{EngineConfig, EscalationEngine};
//! use siren_notify::ChannelRegistry;
//! use siren_storage::{RedbAlertStore, RedbEventLog, RedbPolicyStore, RedbTenantDirectory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = EscalationEngine::new(
//!         EngineConfig::default(),
//!         Arc::new(RedbTenantDirectory::open("./data")?),
//!         Arc::new(RedbAlertStore::open("./data")?),
//!         Arc::new(RedbPolicyStore::open("./data")?),
//!         Arc::new(RedbEventLog::open("./data")?),
//!         Arc::new(ChannelRegistry::new()),
//!     );
//!
//!     engine.start()?;
//!     tokio::signal::ctrl_c().await?;
//!     engine.stop().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod stats;

pub use engine::{EngineConfig, EscalationEngine, TickOutcome};
pub use stats::EngineStats;

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
