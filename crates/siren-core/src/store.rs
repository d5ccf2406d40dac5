//! Store contracts consumed by the escalation engine.
//!
//! The engine depends on these traits, never on a concrete backend; the
//! redb implementations live in `siren-storage` and tests supply
//! scripted mocks. All methods are async so callers never inherit a
//! backend's blocking behaviour.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::alert::{Alert, AlertId, EscalationEvent};
use crate::error::Result;
use crate::policy::{EscalationPolicy, PolicyId};
use crate::tenant::TenantRef;

/// Result of a conditional tier advancement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The compare-and-set succeeded; this writer owns the transition.
    Advanced,
    /// `current_tier` no longer matched: another writer advanced or
    /// reset the alert first. A normal outcome, not an error.
    Conflict,
    /// No such alert in this tenant partition.
    NotFound,
}

impl AdvanceOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Advanced => "advanced",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for AdvanceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Enumerates the tenants the engine scans each tick.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn list_tenants(&self) -> Result<Vec<TenantRef>>;
}

/// Alert persistence.
///
/// The engine calls `list_escalatable` and `advance_tier`; the rest is
/// the intake/acknowledgment surface used by operators and tests.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn insert(&self, alert: Alert) -> Result<()>;

    async fn get(&self, tenant: &TenantRef, alert_id: &AlertId) -> Result<Option<Alert>>;

    async fn list(&self, tenant: &TenantRef) -> Result<Vec<Alert>>;

    /// Alerts with status `open` and a policy bound. The store performs
    /// the filtering; the engine trusts the result but still advances
    /// conditionally.
    async fn list_escalatable(&self, tenant: &TenantRef) -> Result<Vec<Alert>>;

    /// Atomically set `current_tier` to `new_tier` iff it still equals
    /// `expected_current_tier`. `new_tier` may be lower than the
    /// expectation when a repeat cycle wraps to the first tier.
    async fn advance_tier(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
        expected_current_tier: u32,
        new_tier: u32,
    ) -> Result<AdvanceOutcome>;

    /// Mark an open alert acknowledged. Errors when the alert is missing
    /// or no longer open.
    async fn acknowledge(&self, tenant: &TenantRef, alert_id: &AlertId, by: &str)
        -> Result<Alert>;

    /// Mark an alert resolved.
    async fn resolve(&self, tenant: &TenantRef, alert_id: &AlertId) -> Result<Alert>;
}

/// Escalation policy persistence. Policies are validated before every
/// write.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    async fn get_policy(
        &self,
        tenant: &TenantRef,
        policy_id: &PolicyId,
    ) -> Result<Option<EscalationPolicy>>;

    async fn put_policy(&self, tenant: &TenantRef, policy: EscalationPolicy) -> Result<()>;

    async fn list_policies(&self, tenant: &TenantRef) -> Result<Vec<EscalationPolicy>>;

    /// Returns whether a policy was actually removed.
    async fn delete_policy(&self, tenant: &TenantRef, policy_id: &PolicyId) -> Result<bool>;
}

/// Append-only escalation audit log.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: EscalationEvent) -> Result<()>;

    /// Events for one alert in append order.
    async fn list_for_alert(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
    ) -> Result<Vec<EscalationEvent>>;

    /// Most recent events across a tenant, newest first.
    async fn list_recent(&self, tenant: &TenantRef, limit: usize) -> Result<Vec<EscalationEvent>>;
}
