//! Broadcast bus for acknowledgment and escalation signals.
//!
//! Fire-and-forget pub/sub over `tokio::sync::broadcast`: publishers
//! never wait for consumers and a missing subscriber is not an error.
//! Correctness never rides on this channel: the engine re-reads alert
//! status from the store each tick, so anything delivered here is
//! advisory and a lost signal costs at most one tick of latency.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::alert::AlertId;
use crate::config::defaults;
use crate::policy::NotifyMethod;
use crate::tenant::TenantRef;

/// Events published on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SirenEvent {
    /// An alert was acknowledged by a human.
    AlertAcknowledged {
        tenant: TenantRef,
        alert_id: AlertId,
        acknowledged_by: String,
        timestamp: DateTime<Utc>,
    },
    /// The engine advanced an alert to a tier.
    AlertEscalated {
        tenant: TenantRef,
        alert_id: AlertId,
        tier: u32,
        method: NotifyMethod,
        timestamp: DateTime<Utc>,
    },
}

impl SirenEvent {
    pub fn acknowledged(tenant: TenantRef, alert_id: AlertId, by: impl Into<String>) -> Self {
        Self::AlertAcknowledged {
            tenant,
            alert_id,
            acknowledged_by: by.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn escalated(tenant: TenantRef, alert_id: AlertId, tier: u32, method: NotifyMethod) -> Self {
        Self::AlertEscalated {
            tenant,
            alert_id,
            tier,
            method,
            timestamp: Utc::now(),
        }
    }

    /// The alert this signal is keyed by.
    pub fn alert_id(&self) -> &AlertId {
        match self {
            Self::AlertAcknowledged { alert_id, .. } => alert_id,
            Self::AlertEscalated { alert_id, .. } => alert_id,
        }
    }

    pub fn tenant(&self) -> &TenantRef {
        match self {
            Self::AlertAcknowledged { tenant, .. } => tenant,
            Self::AlertEscalated { tenant, .. } => tenant,
        }
    }

    pub fn is_acknowledgment(&self) -> bool {
        matches!(self, Self::AlertAcknowledged { .. })
    }
}

/// Shared handle to the bus.
pub type SharedEventBus = Arc<EventBus>;

/// Broadcast event bus.
pub struct EventBus {
    tx: broadcast::Sender<SirenEvent>,
}

impl EventBus {
    /// Create a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publish an event. Returns `false` when no subscriber is listening,
    /// which is not an error.
    pub fn publish(&self, event: SirenEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Subscribe to every event from this point on.
    pub fn subscribe(&self) -> EventBusReceiver {
        EventBusReceiver {
            rx: self.tx.subscribe(),
        }
    }

    /// Subscribe with a predicate; non-matching events are silently
    /// skipped.
    pub fn subscribe_filtered<F>(&self, filter: F) -> FilteredReceiver
    where
        F: Fn(&SirenEvent) -> bool + Send + 'static,
    {
        FilteredReceiver {
            inner: self.subscribe(),
            filter: Box::new(filter),
        }
    }

    /// Current number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(defaults::CHANNEL_CAPACITY)
    }
}

/// Receiver over all bus events.
pub struct EventBusReceiver {
    rx: broadcast::Receiver<SirenEvent>,
}

impl EventBusReceiver {
    /// Next event, or `None` once the bus is gone. A lagged receiver
    /// skips to the oldest retained event rather than erroring out.
    pub async fn recv(&mut self) -> Option<SirenEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event bus receiver lagged, skipping ahead");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Receiver that only yields events matching its predicate.
pub struct FilteredReceiver {
    inner: EventBusReceiver,
    filter: Box<dyn Fn(&SirenEvent) -> bool + Send>,
}

impl FilteredReceiver {
    pub async fn recv(&mut self) -> Option<SirenEvent> {
        loop {
            match self.inner.recv().await {
                Some(event) => {
                    if (self.filter)(&event) {
                        return Some(event);
                    }
                }
                None => return None,
            }
        }
    }
}
