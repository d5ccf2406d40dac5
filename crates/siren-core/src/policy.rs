//! Escalation policy model and validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unique policy identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyId(pub Uuid);

impl PolicyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PolicyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PolicyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification method carried by a tier directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyMethod {
    /// Direct message in the chat integration.
    ChatDm,
    /// Text message.
    Sms,
    /// Phone call.
    Voice,
    /// HTTP webhook.
    Webhook,
}

impl NotifyMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ChatDm => "chat_dm",
            Self::Sms => "sms",
            Self::Voice => "voice",
            Self::Webhook => "webhook",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "chat_dm" | "chat" => Some(Self::ChatDm),
            "sms" => Some(Self::Sms),
            "voice" | "phone" => Some(Self::Voice),
            "webhook" => Some(Self::Webhook),
            _ => None,
        }
    }

    /// All known methods, in registry order.
    pub fn all() -> [NotifyMethod; 4] {
        [Self::ChatDm, Self::Sms, Self::Voice, Self::Webhook]
    }
}

impl std::fmt::Display for NotifyMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Opaque notification target (user handle, schedule name, URL, ...).
/// Resolution to concrete endpoints belongs to the delivery layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetRef(pub String);

impl TargetRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TargetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TargetRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One rung of an escalation ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    /// Position in the ladder, starting at 1. 0 is reserved for the
    /// "not yet escalated" sentinel on alerts.
    pub tier_number: u32,
    /// Minutes added to the cumulative deadline by this tier.
    pub timeout_minutes: u32,
    /// Notification directives; the engine delivers via the first entry.
    pub notify_via: Vec<NotifyMethod>,
    /// Who gets notified.
    pub targets: Vec<TargetRef>,
}

impl Tier {
    pub fn new(tier_number: u32, timeout_minutes: u32) -> Self {
        Self {
            tier_number,
            timeout_minutes,
            notify_via: Vec::new(),
            targets: Vec::new(),
        }
    }

    pub fn notify(mut self, method: NotifyMethod) -> Self {
        self.notify_via.push(method);
        self
    }

    pub fn target(mut self, target: impl Into<TargetRef>) -> Self {
        self.targets.push(target.into());
        self
    }
}

/// An ordered escalation ladder bound to alerts by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Generated when absent, so hand-written policy files can omit it.
    #[serde(default)]
    pub id: PolicyId,
    pub name: String,
    /// Tiers in escalation order; numbers are unique and strictly
    /// increasing. An empty list is legal and never escalates.
    pub tiers: Vec<Tier>,
    /// How many times to repeat the cycle after the final tier fires.
    /// Only positivity is consulted; see the resolver.
    #[serde(default)]
    pub repeat_count: u32,
}

impl EscalationPolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PolicyId::new(),
            name: name.into(),
            tiers: Vec::new(),
            repeat_count: 0,
        }
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tiers.push(tier);
        self
    }

    pub fn repeat(mut self, count: u32) -> Self {
        self.repeat_count = count;
        self
    }

    /// Highest configured tier number, if any tier exists.
    pub fn highest_tier_number(&self) -> Option<u32> {
        self.tiers.iter().map(|t| t.tier_number).max()
    }

    /// Check structural invariants before the policy is stored.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("policy name must not be empty"));
        }

        let mut previous: Option<u32> = None;
        for tier in &self.tiers {
            if tier.tier_number == 0 {
                return Err(Error::validation(format!(
                    "policy '{}': tier numbers start at 1",
                    self.name
                )));
            }
            if let Some(prev) = previous {
                if tier.tier_number <= prev {
                    return Err(Error::validation(format!(
                        "policy '{}': tier numbers must be strictly increasing ({} after {})",
                        self.name, tier.tier_number, prev
                    )));
                }
            }
            previous = Some(tier.tier_number);

            if tier.timeout_minutes == 0 {
                return Err(Error::validation(format!(
                    "policy '{}' tier {}: timeout must be at least 1 minute",
                    self.name, tier.tier_number
                )));
            }
            if tier.notify_via.is_empty() {
                return Err(Error::validation(format!(
                    "policy '{}' tier {}: at least one notify method is required",
                    self.name, tier.tier_number
                )));
            }
            if tier.targets.is_empty() {
                return Err(Error::validation(format!(
                    "policy '{}' tier {}: at least one target is required",
                    self.name, tier.tier_number
                )));
            }
        }
        Ok(())
    }
}
