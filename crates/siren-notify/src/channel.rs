//! Notification channel trait and registry.
//!
//! A channel owns one notify method (chat DM, SMS, voice, webhook) and
//! turns opaque targets into a delivery attempt. The registry dispatches
//! on method and is what the engine sees as its `Notifier` collaborator:
//! it never errors. A failed or impossible delivery becomes a
//! `DeliveryResult::Failed` for the escalation event, because delivery
//! problems must never roll back escalation state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use siren_core::alert::{AlertSummary, DeliveryResult};
use siren_core::policy::{NotifyMethod, TargetRef};

use crate::error::Result;

/// A delivery backend for one notify method.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Channel name (unique per deployment, used in logs).
    fn name(&self) -> &str;

    /// The notify method this channel serves.
    fn method(&self) -> NotifyMethod;

    /// Whether the channel is currently enabled.
    fn is_enabled(&self) -> bool;

    /// Attempt delivery to the given targets.
    async fn deliver(&self, targets: &[TargetRef], summary: &AlertSummary) -> Result<()>;
}

/// The delivery contract the engine is injected with.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Best-effort delivery. Failure is data on the outcome, never an
    /// error the caller has to unwind.
    async fn deliver(
        &self,
        method: NotifyMethod,
        targets: &[TargetRef],
        summary: &AlertSummary,
    ) -> DeliveryResult;
}

/// Factory for building channels from JSON configuration.
pub trait ChannelFactory: Send + Sync {
    /// The channel type this factory creates ("console", "memory", ...).
    fn channel_type(&self) -> &str;

    /// Create a channel from configuration.
    fn create(&self, config: &serde_json::Value) -> Result<Arc<dyn NotifyChannel>>;
}

/// All factories compiled into this build.
pub fn builtin_factories() -> Vec<Box<dyn ChannelFactory>> {
    vec![
        Box::new(crate::console::ConsoleChannelFactory),
        Box::new(crate::memory::MemoryChannelFactory),
        #[cfg(feature = "webhook")]
        Box::new(crate::webhook::WebhookChannelFactory),
    ]
}

/// Build a registry from a list of channel configs, each carrying a
/// `"type"` field naming the factory.
pub async fn registry_from_configs(configs: &[serde_json::Value]) -> Result<ChannelRegistry> {
    let factories = builtin_factories();
    let registry = ChannelRegistry::new();

    for config in configs {
        let channel_type = config
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                crate::error::Error::InvalidConfiguration(
                    "channel config missing 'type' field".to_string(),
                )
            })?;

        let factory = factories
            .iter()
            .find(|f| f.channel_type() == channel_type)
            .ok_or_else(|| {
                crate::error::Error::InvalidConfiguration(format!(
                    "unknown channel type: {}",
                    channel_type
                ))
            })?;

        registry.register(factory.create(config)?).await;
    }

    Ok(registry)
}

/// Descriptive information about a registered channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub name: String,
    pub method: NotifyMethod,
    pub enabled: bool,
}

/// Registry of channels keyed by notify method.
pub struct ChannelRegistry {
    channels: RwLock<HashMap<NotifyMethod, Arc<dyn NotifyChannel>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Register a channel under its method, replacing any previous one.
    pub async fn register(&self, channel: Arc<dyn NotifyChannel>) {
        let method = channel.method();
        let mut channels = self.channels.write().await;
        if let Some(previous) = channels.insert(method, channel) {
            tracing::warn!(
                method = %method,
                previous = previous.name(),
                "replacing notification channel"
            );
        }
    }

    /// Remove the channel for a method. Returns whether one existed.
    pub async fn unregister(&self, method: NotifyMethod) -> bool {
        self.channels.write().await.remove(&method).is_some()
    }

    /// Channel for a method, if registered.
    pub async fn get(&self, method: NotifyMethod) -> Option<Arc<dyn NotifyChannel>> {
        self.channels.read().await.get(&method).cloned()
    }

    /// Info on every registered channel.
    pub async fn list(&self) -> Vec<ChannelInfo> {
        let channels = self.channels.read().await;
        let mut infos: Vec<ChannelInfo> = channels
            .values()
            .map(|c| ChannelInfo {
                name: c.name().to_string(),
                method: c.method(),
                enabled: c.is_enabled(),
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for ChannelRegistry {
    async fn deliver(
        &self,
        method: NotifyMethod,
        targets: &[TargetRef],
        summary: &AlertSummary,
    ) -> DeliveryResult {
        let channel = match self.get(method).await {
            Some(channel) => channel,
            None => {
                tracing::warn!(method = %method, "no channel registered for method");
                return DeliveryResult::failed(
                    crate::error::Error::NoChannel(method.to_string()).to_string(),
                );
            }
        };

        match channel.deliver(targets, summary).await {
            Ok(()) => DeliveryResult::Delivered,
            Err(e) => {
                tracing::warn!(
                    channel = channel.name(),
                    method = %method,
                    error = %e,
                    "delivery failed"
                );
                DeliveryResult::failed(e.to_string())
            }
        }
    }
}
