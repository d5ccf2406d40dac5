//! Console notification channel.

use async_trait::async_trait;

use siren_core::alert::AlertSummary;
use siren_core::policy::{NotifyMethod, TargetRef};

use crate::channel::{ChannelFactory, NotifyChannel};
use crate::error::{Error, Result};

/// Channel that prints escalation notices to stdout. The default for
/// local runs.
#[derive(Debug, Clone)]
pub struct ConsoleChannel {
    name: String,
    method: NotifyMethod,
    enabled: bool,
}

impl ConsoleChannel {
    pub fn new(name: impl Into<String>, method: NotifyMethod) -> Self {
        Self {
            name: name.into(),
            method,
            enabled: true,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }
}

#[async_trait]
impl NotifyChannel for ConsoleChannel {
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

        println!("=== escalation ===");
        println!("{}", summary.headline());
        println!("opened: {}", summary.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
        for target in targets {
            println!("notify: {} via {}", target, self.method);
        }
        println!("==================");

        Ok(())
    }
}

/// Factory for creating console channels.
pub struct ConsoleChannelFactory;

impl ChannelFactory for ConsoleChannelFactory {
    fn channel_type(&self) -> &str {
        "console"
    }

    fn create(&self, config: &serde_json::Value) -> Result<std::sync::Arc<dyn NotifyChannel>> {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("console")
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

        let mut channel = ConsoleChannel::new(name, method);
        if !enabled {
            channel.disable();
        }

        Ok(std::sync::Arc::new(channel))
    }
}
