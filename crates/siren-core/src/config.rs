//! Shared configuration defaults and environment variable helpers.
//!
//! Every tunable has a constant default here so the crates never
//! re-declare the same values with drifting copies.

/// Default values.
pub mod defaults {
    /// Data directory for the redb stores.
    pub const DATA_DIR: &str = "./data";
    /// Escalation scan interval in seconds.
    pub const TICK_INTERVAL_SECS: u64 = 30;
    /// Event bus channel capacity.
    pub const CHANNEL_CAPACITY: usize = 1000;
    /// Maximum tenant key length.
    pub const MAX_TENANT_KEY_LEN: usize = 64;
}

/// Environment variable names and typed accessors.
pub mod env_vars {
    use super::defaults;

    pub const DATA_DIR: &str = "SIREN_DATA_DIR";
    pub const TICK_INTERVAL_SECS: &str = "SIREN_TICK_INTERVAL_SECS";
    pub const LOG_JSON: &str = "SIREN_LOG_JSON";

    /// Data directory from the environment, or the default.
    pub fn data_dir() -> String {
        std::env::var(DATA_DIR)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| defaults::DATA_DIR.to_string())
    }

    /// Tick interval (seconds) from the environment, or the default.
    /// Zero and unparseable values fall back to the default.
    pub fn tick_interval_secs() -> u64 {
        std::env::var(TICK_INTERVAL_SECS)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(defaults::TICK_INTERVAL_SECS)
    }

    /// Whether logs should be emitted as JSON.
    pub fn log_json() -> bool {
        std::env::var(LOG_JSON)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}
