//! In-memory notification channel (for testing).

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use siren_core::alert::AlertSummary;
use siren_core::policy::{NotifyMethod, TargetRef};

use crate::channel::{ChannelFactory, NotifyChannel};
use crate::error::{Error, Result};

/// A delivery the channel accepted, kept for assertions.
#[derive(Debug, Clone)]
pub struct RecordedDelivery {
    pub targets: Vec<TargetRef>,
    pub summary: AlertSummary,
}

/// Channel that records deliveries instead of sending them.
#[derive(Debug, Clone)]
pub struct MemoryChannel {
    name: String,
    method: NotifyMethod,
    enabled: bool,
    deliveries: Arc<Mutex<Vec<RecordedDelivery>>>,
}

impl MemoryChannel {
    pub fn new(name: impl Into<String>, method: NotifyMethod) -> Self {
        Self {
            name: name.into(),
            method,
            enabled: true,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn disabled(name: impl Into<String>, method: NotifyMethod) -> Self {
        Self {
            name: name.into(),
            method,
            enabled: false,
            deliveries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub async fn get_deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }

    pub async fn count(&self) -> usize {
        self.deliveries.lock().await.len()
    }
}

#[async_trait]
impl NotifyChannel for MemoryChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn method(&self) -> NotifyMethod {
        self.method
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn deliver(&self, targets: &[TargetRef], summary: &AlertSummary) -> Result<()> {
        if !self.enabled {
            return Err(Error::ChannelDisabled(self.name.clone()));
        }
        self.deliveries.lock().await.push(RecordedDelivery {
            targets: targets.to_vec(),
            summary: summary.clone(),
        });
        Ok(())
    }
}

/// Factory for creating memory channels.
pub struct MemoryChannelFactory;

impl ChannelFactory for MemoryChannelFactory {
    fn channel_type(&self) -> &str {
        "memory"
    }

    fn create(&self, config: &serde_json::Value) -> Result<std::sync::Arc<dyn NotifyChannel>> {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("memory")
            .to_string();

        let method = match config.get("method").and_then(|v| v.as_str()) {
            Some(s) => NotifyMethod::from_string(s).ok_or_else(|| {
                Error::InvalidConfiguration(format!("unknown notify method: {}", s))
            })?,
            None => NotifyMethod::ChatDm,
        };

        let enabled = config
            .get("enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        let channel = if enabled {
            MemoryChannel::new(name, method)
        } else {
            MemoryChannel::disabled(name, method)
        };

        Ok(std::sync::Arc::new(channel))
    }
}
