//! Tenant identity.
//!
//! Every escalation read and write is scoped to one tenant partition.
//! Tenant keys double as storage key prefixes, so registration enforces
//! a restricted character set.

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::error::{Error, Result};

/// Opaque tenant key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantRef(pub String);

impl TenantRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TenantRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TenantRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Validate a tenant key for registration.
///
/// `/` is the reserved storage key separator and is rejected along with
/// everything outside lowercase ASCII alphanumerics, `-` and `_`.
pub fn validate_tenant_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::validation("tenant key must not be empty"));
    }
    if key.len() > defaults::MAX_TENANT_KEY_LEN {
        return Err(Error::validation(format!(
            "tenant key '{}' exceeds {} characters",
            key,
            defaults::MAX_TENANT_KEY_LEN
        )));
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(Error::validation(format!(
            "tenant key '{}' may only contain lowercase letters, digits, '-' and '_'",
            key
        )));
    }
    Ok(())
}
