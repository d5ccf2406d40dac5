//! Notification channels for the Siren escalation engine.
//!
//! A channel delivers an escalation notice for one notify method; the
//! registry dispatches on method and is the engine's delivery boundary.
//!
//! ## Features
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `webhook` | ✅ | Webhook notification channel (HTTP POST) |
//!
//! ## Channel layer
//!
//! - **Channels**: Console, Memory (testing), Webhook
//! - **Registry**: one channel per notify method, best-effort dispatch
//! - **Factories**: build channels from JSON config files
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use siren_notify::{ChannelRegistry, ConsoleChannel, Notifier};
//! use siren_core::alert::{Alert, AlertSummary};
//! use siren_core::policy::{NotifyMethod, TargetRef};
//! use siren_core::tenant::TenantRef;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = ChannelRegistry::new();
//!     registry
//!         .register(Arc::new(ConsoleChannel::new("console", NotifyMethod::ChatDm)))
//!         .await;
//!
//!     let alert = Alert::open(TenantRef::from("acme"), "db down", None);
//!     let summary = AlertSummary::for_tier(&alert, 1);
//!
//!     let result = registry
//!         .deliver(NotifyMethod::ChatDm, &[TargetRef::from("oncall_primary")], &summary)
//!         .await;
//!     assert!(result.is_delivered());
//! }
//! ```

pub mod channel;
pub mod console;
pub mod error;
pub mod memory;

#[cfg(feature = "webhook")]
pub mod webhook;

pub use channel::{
    builtin_factories, registry_from_configs, ChannelFactory, ChannelInfo, ChannelRegistry,
    NotifyChannel, Notifier,
};
pub use console::{ConsoleChannel, ConsoleChannelFactory};
pub use error::{Error, Result};
pub use memory::{MemoryChannel, MemoryChannelFactory, RecordedDelivery};

#[cfg(feature = "webhook")]
pub use webhook::{WebhookChannel, WebhookChannelFactory};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
