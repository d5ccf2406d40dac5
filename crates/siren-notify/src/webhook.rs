//! Webhook notification channel.

use async_trait::async_trait;
use std::collections::HashMap;

use siren_core::alert::AlertSummary;
use siren_core::policy::{NotifyMethod, TargetRef};

use crate::channel::{ChannelFactory, NotifyChannel};
use crate::error::{Error, Result};

/// Channel for delivering escalations via HTTP POST.
///
/// With a fixed `url` every delivery goes to that endpoint; without one,
/// each target is treated as an http(s) URL and posted to directly.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    name: String,
    method: NotifyMethod,
    enabled: bool,
    url: Option<String>,
    headers: HashMap<String, String>,
    client: reqwest::Client,
}

impl WebhookChannel {
    pub fn new(name: impl Into<String>, method: NotifyMethod) -> Self {
        Self {
            name: name.into(),
            method,
            enabled: true,
            url: None,
            headers: HashMap::new(),
            client: reqwest::Client::new(),
        }
    }

    /// Route every delivery to one fixed endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    async fn post_one(&self, url: &str, payload: &serde_json::Value) -> Result<()> {
        let mut request = self.client.post(url);

        for (key, value) in &self.headers {
            request = request.header(key, value);
        }

        let response = request
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::SendFailed(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::SendFailed(format!(
                "Webhook returned error: {}",
                response.status()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl NotifyChannel for WebhookChannel {
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

        let payload = serde_json::json!({
            "event": "alert_escalated",
            "tenant": summary.tenant,
            "alert_id": summary.alert_id,
            "title": summary.title,
            "tier": summary.tier,
            "created_at": summary.created_at,
            "targets": targets,
        });

        let urls: Vec<&str> = match &self.url {
            Some(url) => vec![url.as_str()],
            None => {
                let mut urls = Vec::with_capacity(targets.len());
                for target in targets {
                    let url = target.as_str();
                    if !url.starts_with("http://") && !url.starts_with("https://") {
                        return Err(Error::SendFailed(format!(
                            "webhook target is not an http(s) URL: {}",
                            url
                        )));
                    }
                    urls.push(url);
                }
                urls
            }
        };

        if urls.is_empty() {
            return Err(Error::SendFailed(
                "no webhook URL configured and no targets given".to_string(),
            ));
        }

        let results =
            futures::future::join_all(urls.iter().map(|url| self.post_one(url, &payload))).await;

        let failures: Vec<String> = results
            .into_iter()
            .filter_map(|r| r.err().map(|e| e.to_string()))
            .collect();

        if !failures.is_empty() {
            return Err(Error::SendFailed(failures.join("; ")));
        }

        Ok(())
    }
}

/// Factory for creating webhook channels.
pub struct WebhookChannelFactory;

impl ChannelFactory for WebhookChannelFactory {
    fn channel_type(&self) -> &str {
        "webhook"
    }

    fn create(&self, config: &serde_json::Value) -> Result<std::sync::Arc<dyn NotifyChannel>> {
        let name = config
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("webhook")
            .to_string();

        let method = match config.get("method").and_then(|v| v.as_str()) {
            Some(s) => NotifyMethod::from_string(s).ok_or_else(|| {
                Error::InvalidConfiguration(format!("unknown notify method: {}", s))
            })?,
            None => NotifyMethod::Webhook,
        };

        let mut channel = WebhookChannel::new(name, method);

        if let Some(url) = config.get("url").and_then(|v| v.as_str()) {
            channel = channel.with_url(url);
        }

        if let Some(obj) = config.get("headers").and_then(|v| v.as_object()) {
            for (key, value) in obj {
                if let Some(str_val) = value.as_str() {
                    channel = channel.with_header(key.clone(), str_val.to_string());
                }
            }
        }

        if !config
            .get("enabled")
            .and_then(|v| v.as_bool())
            .unwrap_or(true)
        {
            channel = channel.disabled();
        }

        Ok(std::sync::Arc::new(channel))
    }
}
