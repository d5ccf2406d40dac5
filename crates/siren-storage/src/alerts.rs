//! Alert storage using redb.
//!
//! Keys are `"{tenant}/{alert_id}"`, so one tenant partition is one
//! contiguous key range. The engine-facing write is `advance_tier`, a
//! compare-and-set on `current_tier` inside a single write transaction;
//! redb's single-writer property makes concurrent advancements race-free.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};

use siren_core::alert::{Alert, AlertId, AlertStatus};
use siren_core::store::{AdvanceOutcome, AlertStore};
use siren_core::tenant::TenantRef;

use crate::error::{Error, Result};

// Alerts table: key = "{tenant}/{alert_id}", value = Alert (serialized as JSON)
const ALERTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("alerts");

fn alert_key(tenant: &TenantRef, alert_id: &AlertId) -> String {
    format!("{}/{}", tenant, alert_id)
}

/// Alert store for persistent storage.
pub struct RedbAlertStore {
    db: Arc<Database>,
}

impl RedbAlertStore {
    /// Open an alert store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let db_path = path.join("alerts.redb");
        let db = Database::create(db_path)
            .map_err(|e| Error::Storage(format!("Failed to open alert database: {}", e)))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;
        {
            write_txn
                .open_table(ALERTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Create a throwaway alert store for testing.
    pub fn memory() -> Result<Self> {
        // redb has no true in-memory mode, so use a unique temp file
        let db_path = std::env::temp_dir().join(format!(
            "siren_alerts_{}_{}.redb",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let db = Database::create(&db_path)
            .map_err(|e| Error::Storage(format!("Failed to create test database: {}", e)))?;

        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;
        {
            write_txn
                .open_table(ALERTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert an alert.
    pub fn insert(&self, alert: &Alert) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let json = serde_json::to_string(alert)
            .map_err(|e| Error::Serialization(format!("Failed to serialize alert: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(ALERTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;
            let key = alert_key(&alert.tenant, &alert.id);
            table
                .insert(key.as_str(), json.as_str())
                .map_err(|e| Error::Storage(format!("Failed to insert alert: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(())
    }

    /// Get an alert by id within a tenant partition.
    pub fn get(&self, tenant: &TenantRef, alert_id: &AlertId) -> Result<Option<Alert>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(ALERTS_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;

        let key = alert_key(tenant, alert_id);
        match table.get(key.as_str()) {
            Ok(Some(value)) => {
                let alert: Alert = serde_json::from_str(value.value()).map_err(|e| {
                    Error::Serialization(format!("Failed to deserialize alert: {}", e))
                })?;
                Ok(Some(alert))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to read alert: {}", e))),
        }
    }

    /// List every alert in a tenant partition, newest first.
    pub fn list(&self, tenant: &TenantRef) -> Result<Vec<Alert>> {
        let mut alerts = self.scan_tenant(tenant)?;
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    /// List escalation-eligible alerts: status `open` with a policy
    /// bound. Oldest first, so the longest-waiting alerts are handled
    /// first within a tick.
    pub fn list_escalatable(&self, tenant: &TenantRef) -> Result<Vec<Alert>> {
        let mut alerts: Vec<Alert> = self
            .scan_tenant(tenant)?
            .into_iter()
            .filter(|a| a.is_escalatable())
            .collect();
        alerts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(alerts)
    }

    /// Conditionally advance an alert's tier.
    ///
    /// The read, the comparison and the write share one transaction, so
    /// of two racing callers exactly one observes `Advanced`.
    pub fn advance_tier(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
        expected_current_tier: u32,
        new_tier: u32,
    ) -> Result<AdvanceOutcome> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let outcome = {
            let mut table = write_txn
                .open_table(ALERTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;

            let key = alert_key(tenant, alert_id);
            let existing = match table
                .get(key.as_str())
                .map_err(|e| Error::Storage(format!("Failed to read alert: {}", e)))?
            {
                Some(value) => Some(serde_json::from_str::<Alert>(value.value()).map_err(|e| {
                    Error::Serialization(format!("Failed to deserialize alert: {}", e))
                })?),
                None => None,
            };

            match existing {
                None => AdvanceOutcome::NotFound,
                Some(alert) if alert.current_tier != expected_current_tier => {
                    AdvanceOutcome::Conflict
                }
                Some(mut alert) => {
                    alert.current_tier = new_tier;
                    let json = serde_json::to_string(&alert).map_err(|e| {
                        Error::Serialization(format!("Failed to serialize alert: {}", e))
                    })?;
                    table
                        .insert(key.as_str(), json.as_str())
                        .map_err(|e| Error::Storage(format!("Failed to update alert: {}", e)))?;
                    AdvanceOutcome::Advanced
                }
            }
        };

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(outcome)
    }

    /// Acknowledge an open alert.
    pub fn acknowledge(&self, tenant: &TenantRef, alert_id: &AlertId, by: &str) -> Result<Alert> {
        self.transition(tenant, alert_id, |alert| {
            if alert.status != AlertStatus::Open {
                return Err(Error::InvalidInput(format!(
                    "alert {} is {}, not open",
                    alert.id, alert.status
                )));
            }
            alert.status = AlertStatus::Acknowledged;
            alert.acknowledged_by = Some(by.to_string());
            alert.acknowledged_at = Some(Utc::now());
            Ok(())
        })
    }

    /// Resolve an alert.
    pub fn resolve(&self, tenant: &TenantRef, alert_id: &AlertId) -> Result<Alert> {
        self.transition(tenant, alert_id, |alert| {
            alert.status = AlertStatus::Resolved;
            Ok(())
        })
    }

    /// Load, mutate and store an alert in one write transaction.
    fn transition<F>(&self, tenant: &TenantRef, alert_id: &AlertId, apply: F) -> Result<Alert>
    where
        F: FnOnce(&mut Alert) -> Result<()>,
    {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let updated = {
            let mut table = write_txn
                .open_table(ALERTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;

            let key = alert_key(tenant, alert_id);
            let mut alert = match table
                .get(key.as_str())
                .map_err(|e| Error::Storage(format!("Failed to read alert: {}", e)))?
            {
                Some(value) => serde_json::from_str::<Alert>(value.value()).map_err(|e| {
                    Error::Serialization(format!("Failed to deserialize alert: {}", e))
                })?,
                None => {
                    return Err(Error::NotFound(format!(
                        "alert {} in tenant {}",
                        alert_id, tenant
                    )))
                }
            };

            apply(&mut alert)?;

            let json = serde_json::to_string(&alert)
                .map_err(|e| Error::Serialization(format!("Failed to serialize alert: {}", e)))?;
            table
                .insert(key.as_str(), json.as_str())
                .map_err(|e| Error::Storage(format!("Failed to update alert: {}", e)))?;

            alert
        };

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(updated)
    }

    fn scan_tenant(&self, tenant: &TenantRef) -> Result<Vec<Alert>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(ALERTS_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open alerts table: {}", e)))?;

        let prefix = format!("{}/", tenant);
        let mut alerts = Vec::new();
        let iter = table
            .range(prefix.as_str()..)
            .map_err(|e| Error::Storage(format!("Failed to scan alerts: {}", e)))?;
        for entry in iter {
            let (key, value) =
                entry.map_err(|e| Error::Storage(format!("Failed to read entry: {}", e)))?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let alert: Alert = serde_json::from_str(value.value())
                .map_err(|e| Error::Serialization(format!("Failed to deserialize: {}", e)))?;
            alerts.push(alert);
        }

        Ok(alerts)
    }
}

#[async_trait]
impl AlertStore for RedbAlertStore {
    async fn insert(&self, alert: Alert) -> siren_core::Result<()> {
        RedbAlertStore::insert(self, &alert).map_err(Into::into)
    }

    async fn get(&self, tenant: &TenantRef, alert_id: &AlertId) -> siren_core::Result<Option<Alert>> {
        RedbAlertStore::get(self, tenant, alert_id).map_err(Into::into)
    }

    async fn list(&self, tenant: &TenantRef) -> siren_core::Result<Vec<Alert>> {
        RedbAlertStore::list(self, tenant).map_err(Into::into)
    }

    async fn list_escalatable(&self, tenant: &TenantRef) -> siren_core::Result<Vec<Alert>> {
        RedbAlertStore::list_escalatable(self, tenant).map_err(Into::into)
    }

    async fn advance_tier(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
        expected_current_tier: u32,
        new_tier: u32,
    ) -> siren_core::Result<AdvanceOutcome> {
        RedbAlertStore::advance_tier(self, tenant, alert_id, expected_current_tier, new_tier)
            .map_err(Into::into)
    }

    async fn acknowledge(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
        by: &str,
    ) -> siren_core::Result<Alert> {
        RedbAlertStore::acknowledge(self, tenant, alert_id, by).map_err(Into::into)
    }

    async fn resolve(&self, tenant: &TenantRef, alert_id: &AlertId) -> siren_core::Result<Alert> {
        RedbAlertStore::resolve(self, tenant, alert_id).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::policy::PolicyId;

    fn tenant() -> TenantRef {
        TenantRef::from("acme")
    }

    #[test]
    fn test_insert_and_get() {
        let store = RedbAlertStore::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));

        store.insert(&alert).unwrap();
        let loaded = store.get(&tenant(), &alert.id).unwrap().unwrap();
        assert_eq!(loaded, alert);

        assert!(store.get(&tenant(), &AlertId::new()).unwrap().is_none());
    }

    #[test]
    fn test_list_escalatable_filters() {
        let store = RedbAlertStore::memory().unwrap();

        let eligible = Alert::open(tenant(), "eligible", Some(PolicyId::new()));
        let no_policy = Alert::open(tenant(), "no policy", None);
        let other_tenant = Alert::open(TenantRef::from("globex"), "elsewhere", Some(PolicyId::new()));
        store.insert(&eligible).unwrap();
        store.insert(&no_policy).unwrap();
        store.insert(&other_tenant).unwrap();

        let acked = Alert::open(tenant(), "acked", Some(PolicyId::new()));
        store.insert(&acked).unwrap();
        store.acknowledge(&tenant(), &acked.id, "casey").unwrap();

        let escalatable = store.list_escalatable(&tenant()).unwrap();
        assert_eq!(escalatable.len(), 1);
        assert_eq!(escalatable[0].id, eligible.id);
    }

    #[test]
    fn test_list_escalatable_oldest_first() {
        let store = RedbAlertStore::memory().unwrap();
        let now = Utc::now();

        let newer = Alert::open(tenant(), "newer", Some(PolicyId::new()));
        let older = Alert::open(tenant(), "older", Some(PolicyId::new()))
            .with_created_at(now - chrono::Duration::minutes(30));
        store.insert(&newer).unwrap();
        store.insert(&older).unwrap();

        let escalatable = store.list_escalatable(&tenant()).unwrap();
        assert_eq!(escalatable[0].id, older.id);
        assert_eq!(escalatable[1].id, newer.id);
    }

    #[test]
    fn test_advance_tier_success_then_conflict() {
        let store = RedbAlertStore::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));
        store.insert(&alert).unwrap();

        let outcome = store.advance_tier(&tenant(), &alert.id, 0, 1).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced);
        assert_eq!(store.get(&tenant(), &alert.id).unwrap().unwrap().current_tier, 1);

        // Same expectation again: someone else already owns this transition.
        let outcome = store.advance_tier(&tenant(), &alert.id, 0, 1).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Conflict);
        assert_eq!(store.get(&tenant(), &alert.id).unwrap().unwrap().current_tier, 1);
    }

    #[test]
    fn test_advance_tier_missing_alert() {
        let store = RedbAlertStore::memory().unwrap();
        let outcome = store.advance_tier(&tenant(), &AlertId::new(), 0, 1).unwrap();
        assert_eq!(outcome, AdvanceOutcome::NotFound);
    }

    #[test]
    fn test_advance_tier_wraparound_decreases() {
        let store = RedbAlertStore::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));
        store.insert(&alert).unwrap();

        assert_eq!(store.advance_tier(&tenant(), &alert.id, 0, 2).unwrap(), AdvanceOutcome::Advanced);
        // Repeat cycle wraps back to tier 1.
        assert_eq!(store.advance_tier(&tenant(), &alert.id, 2, 1).unwrap(), AdvanceOutcome::Advanced);
        assert_eq!(store.get(&tenant(), &alert.id).unwrap().unwrap().current_tier, 1);
    }

    #[test]
    fn test_acknowledge_lifecycle() {
        let store = RedbAlertStore::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));
        store.insert(&alert).unwrap();

        let acked = store.acknowledge(&tenant(), &alert.id, "casey").unwrap();
        assert_eq!(acked.status, AlertStatus::Acknowledged);
        assert_eq!(acked.acknowledged_by.as_deref(), Some("casey"));
        assert!(acked.acknowledged_at.is_some());

        // Acknowledging twice fails: no longer open.
        assert!(store.acknowledge(&tenant(), &alert.id, "casey").is_err());

        // Missing alert is NotFound.
        assert!(matches!(
            store.acknowledge(&tenant(), &AlertId::new(), "casey"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_resolve() {
        let store = RedbAlertStore::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", None);
        store.insert(&alert).unwrap();

        let resolved = store.resolve(&tenant(), &alert.id).unwrap();
        assert_eq!(resolved.status, AlertStatus::Resolved);
        assert!(!resolved.is_open());
    }

    #[test]
    fn test_tenant_partitions_are_isolated() {
        let store = RedbAlertStore::memory().unwrap();
        let acme = Alert::open(TenantRef::from("acme"), "a", Some(PolicyId::new()));
        let globex = Alert::open(TenantRef::from("globex"), "g", Some(PolicyId::new()));
        store.insert(&acme).unwrap();
        store.insert(&globex).unwrap();

        assert!(store.get(&TenantRef::from("acme"), &globex.id).unwrap().is_none());
        assert_eq!(store.list(&TenantRef::from("acme")).unwrap().len(), 1);
        assert_eq!(store.list(&TenantRef::from("globex")).unwrap().len(), 1);
    }
}
