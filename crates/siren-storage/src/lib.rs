//! Persistent storage for the Siren escalation engine.
//!
//! redb-backed implementations of the store contracts in `siren-core`:
//!
//! - **Alerts**: per-tenant partitions with a conditional tier
//!   advancement (compare-and-set inside one write transaction)
//! - **Policies**: validated escalation ladders
//! - **Events**: append-only escalation audit log
//! - **Tenants**: the registry the engine enumerates each tick
//!
//! Every table is string-keyed with JSON values; tenant partitions are
//! key prefixes, so tenant scans are contiguous range reads.
//!
//! ## Example
//!
//! ```rust,no_run
//! use siren_storage::RedbAlertStore;
//! use siren_core::{Alert, TenantRef};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = RedbAlertStore::open("./data")?;
//! let tenant = TenantRef::from("acme");
//! store.insert(&Alert::open(tenant.clone(), "db down", None))?;
//! println!("{} alerts", store.list(&tenant)?.len());
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod error;
pub mod events;
pub mod policies;
pub mod tenants;

pub use alerts::RedbAlertStore;
pub use error::{Error, Result};
pub use events::RedbEventLog;
pub use policies::RedbPolicyStore;
pub use tenants::{RedbTenantDirectory, RegisteredTenant};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
