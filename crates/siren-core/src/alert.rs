//! Alert and escalation event records.
//!
//! Alerts are owned by the wider platform; the engine reads their status
//! and creation time and performs exactly one kind of write, the
//! conditional tier advancement. Escalation events are the append-only
//! audit trail of those advancements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::policy::{NotifyMethod, PolicyId, TargetRef, Tier};
use crate::tenant::TenantRef;

/// Unique alert identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlertId(pub Uuid);

impl AlertId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for AlertId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Alert lifecycle status. Only `Open` is escalation-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    #[default]
    Open,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Open => "open",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "open" => Some(Self::Open),
            "acknowledged" | "ack" => Some(Self::Acknowledged),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An alert as the escalation engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub tenant: TenantRef,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub status: AlertStatus,
    /// `None` means no escalation is configured for this alert.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<PolicyId>,
    /// 0 = not yet escalated; otherwise the tier number most recently
    /// fired. Decreases only when a repeat cycle wraps to the first tier.
    #[serde(default)]
    pub current_tier: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Create a new open alert.
    pub fn open(tenant: TenantRef, title: impl Into<String>, policy_id: Option<PolicyId>) -> Self {
        Self {
            id: AlertId::new(),
            tenant,
            title: title.into(),
            created_at: Utc::now(),
            status: AlertStatus::Open,
            policy_id,
            current_tier: 0,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Override the creation time (backdating for tests and imports).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == AlertStatus::Open
    }

    /// Open with a policy bound: the only state the engine scans.
    pub fn is_escalatable(&self) -> bool {
        self.is_open() && self.policy_id.is_some()
    }

    /// Wall-clock age relative to `now`. Deadlines are anchored here, at
    /// creation, never at the previous escalation.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Unique escalation event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an escalation record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    /// The engine advanced an alert to this tier.
    Escalate,
    /// Dry-run timeline entry; never written by the engine.
    Notify,
}

impl EscalationAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Escalate => "escalate",
            Self::Notify => "notify",
        }
    }
}

impl std::fmt::Display for EscalationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one delivery attempt. Failure is data, not an error: it is
/// recorded on the event and never rolls back escalation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryResult {
    Delivered,
    Failed { reason: String },
}

impl DeliveryResult {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// Append-only audit record of a tier firing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    pub id: EventId,
    pub tenant: TenantRef,
    pub alert_id: AlertId,
    pub policy_id: PolicyId,
    pub tier: u32,
    pub action: EscalationAction,
    pub method: NotifyMethod,
    pub targets: Vec<TargetRef>,
    /// Delivery outcome, when a delivery was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryResult>,
    pub created_at: DateTime<Utc>,
}

impl EscalationEvent {
    /// Record a tier advancement performed by the engine.
    pub fn escalated(
        alert: &Alert,
        policy_id: PolicyId,
        tier: &Tier,
        method: NotifyMethod,
        delivery: Option<DeliveryResult>,
    ) -> Self {
        Self {
            id: EventId::new(),
            tenant: alert.tenant.clone(),
            alert_id: alert.id,
            policy_id,
            tier: tier.tier_number,
            action: EscalationAction::Escalate,
            method,
            targets: tier.targets.clone(),
            delivery,
            created_at: Utc::now(),
        }
    }
}

/// What the delivery layer gets to say about an alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub tenant: TenantRef,
    pub alert_id: AlertId,
    pub title: String,
    pub tier: u32,
    pub created_at: DateTime<Utc>,
}

impl AlertSummary {
    pub fn for_tier(alert: &Alert, tier: u32) -> Self {
        Self {
            tenant: alert.tenant.clone(),
            alert_id: alert.id,
            title: alert.title.clone(),
            tier,
            created_at: alert.created_at,
        }
    }

    /// One-line form for console channels and logs.
    pub fn headline(&self) -> String {
        format!(
            "[{}] tier {} escalation: {} (alert {})",
            self.tenant, self.tier, self.title, self.alert_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_defaults() {
        let alert = Alert::open(TenantRef::from("acme"), "db down", None);
        assert_eq!(alert.status, AlertStatus::Open);
        assert_eq!(alert.current_tier, 0);
        assert!(alert.is_open());
        assert!(!alert.is_escalatable());

        let alert = Alert::open(TenantRef::from("acme"), "db down", Some(PolicyId::new()));
        assert!(alert.is_escalatable());
    }

    #[test]
    fn test_alert_age() {
        let created = Utc::now() - chrono::Duration::minutes(7);
        let alert =
            Alert::open(TenantRef::from("acme"), "db down", None).with_created_at(created);
        let age = alert.age(Utc::now());
        assert!(age >= chrono::Duration::minutes(7));
        assert!(age < chrono::Duration::minutes(8));
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&AlertStatus::Acknowledged).unwrap(),
            "\"acknowledged\""
        );
        assert_eq!(AlertStatus::from_string("ACK"), Some(AlertStatus::Acknowledged));
        assert_eq!(AlertStatus::from_string("gone"), None);
    }

    #[test]
    fn test_delivery_result_wire_format() {
        let ok = serde_json::to_string(&DeliveryResult::Delivered).unwrap();
        assert_eq!(ok, "\"delivered\"");

        let failed = serde_json::to_string(&DeliveryResult::failed("timeout")).unwrap();
        assert!(failed.contains("failed"));
        assert!(failed.contains("timeout"));

        let back: DeliveryResult = serde_json::from_str(&failed).unwrap();
        assert!(!back.is_delivered());
    }

    #[test]
    fn test_event_from_alert() {
        use crate::policy::Tier;

        let policy_id = PolicyId::new();
        let alert = Alert::open(TenantRef::from("acme"), "db down", Some(policy_id));
        let tier = Tier::new(2, 10)
            .notify(NotifyMethod::Voice)
            .target("team_lead");

        let event = EscalationEvent::escalated(
            &alert,
            policy_id,
            &tier,
            NotifyMethod::Voice,
            Some(DeliveryResult::Delivered),
        );
        assert_eq!(event.alert_id, alert.id);
        assert_eq!(event.tier, 2);
        assert_eq!(event.action, EscalationAction::Escalate);
        assert_eq!(event.targets, vec![TargetRef::from("team_lead")]);
    }

    #[test]
    fn test_summary_headline() {
        let alert = Alert::open(TenantRef::from("acme"), "db down", None);
        let summary = AlertSummary::for_tier(&alert, 1);
        let line = summary.headline();
        assert!(line.contains("acme"));
        assert!(line.contains("tier 1"));
        assert!(line.contains("db down"));
    }
}
