//! Append-only escalation event log using redb.
//!
//! Keys are `"{tenant}/{alert_id}/{timestamp_millis}_{event_id}"`, so an
//! alert's history is one prefix scan in append order. Nothing here
//! updates or deletes: the log is the audit trail.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use siren_core::alert::{AlertId, EscalationEvent};
use siren_core::store::EventLog;
use siren_core::tenant::TenantRef;

use crate::error::{Error, Result};

// Events table: key = "{tenant}/{alert_id}/{timestamp_millis}_{event_id}",
// value = EscalationEvent (JSON)
const EVENTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("escalation_events");

fn event_key(event: &EscalationEvent) -> String {
    format!(
        "{}/{}/{}_{}",
        event.tenant,
        event.alert_id,
        event.created_at.timestamp_millis(),
        event.id
    )
}

/// Escalation event log for persistent storage.
pub struct RedbEventLog {
    db: Arc<Database>,
}

impl RedbEventLog {
    /// Open an event log at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let db_path = path.join("events.redb");
        let db = Database::create(db_path)
            .map_err(|e| Error::Storage(format!("Failed to open event database: {}", e)))?;

        Self::init_tables(db)
    }

    /// Create a throwaway event log for testing.
    pub fn memory() -> Result<Self> {
        // redb has no true in-memory mode, so use a unique temp file
        let db_path = std::env::temp_dir().join(format!(
            "siren_events_{}_{}.redb",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        let db = Database::create(&db_path)
            .map_err(|e| Error::Storage(format!("Failed to create test database: {}", e)))?;

        Self::init_tables(db)
    }

    fn init_tables(db: Database) -> Result<Self> {
        let write_txn = db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;
        {
            write_txn
                .open_table(EVENTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open events table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Append an event.
    pub fn append(&self, event: &EscalationEvent) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let json = serde_json::to_string(event)
            .map_err(|e| Error::Serialization(format!("Failed to serialize event: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(EVENTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open events table: {}", e)))?;
            let key = event_key(event);
            table
                .insert(key.as_str(), json.as_str())
                .map_err(|e| Error::Storage(format!("Failed to append event: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(())
    }

    /// Events for one alert, in append order.
    pub fn list_for_alert(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
    ) -> Result<Vec<EscalationEvent>> {
        let prefix = format!("{}/{}/", tenant, alert_id);
        self.scan_prefix(&prefix)
    }

    /// Most recent events across a tenant, newest first.
    pub fn list_recent(&self, tenant: &TenantRef, limit: usize) -> Result<Vec<EscalationEvent>> {
        let prefix = format!("{}/", tenant);
        let mut events = self.scan_prefix(&prefix)?;
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    fn scan_prefix(&self, prefix: &str) -> Result<Vec<EscalationEvent>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(EVENTS_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open events table: {}", e)))?;

        let mut events = Vec::new();
        let iter = table
            .range(prefix..)
            .map_err(|e| Error::Storage(format!("Failed to scan events: {}", e)))?;
        for entry in iter {
            let (key, value) =
                entry.map_err(|e| Error::Storage(format!("Failed to read entry: {}", e)))?;
            if !key.value().starts_with(prefix) {
                break;
            }
            let event: EscalationEvent = serde_json::from_str(value.value())
                .map_err(|e| Error::Serialization(format!("Failed to deserialize: {}", e)))?;
            events.push(event);
        }

        Ok(events)
    }
}

#[async_trait]
impl EventLog for RedbEventLog {
    async fn append(&self, event: EscalationEvent) -> siren_core::Result<()> {
        RedbEventLog::append(self, &event).map_err(Into::into)
    }

    async fn list_for_alert(
        &self,
        tenant: &TenantRef,
        alert_id: &AlertId,
    ) -> siren_core::Result<Vec<EscalationEvent>> {
        RedbEventLog::list_for_alert(self, tenant, alert_id).map_err(Into::into)
    }

    async fn list_recent(
        &self,
        tenant: &TenantRef,
        limit: usize,
    ) -> siren_core::Result<Vec<EscalationEvent>> {
        RedbEventLog::list_recent(self, tenant, limit).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_core::alert::{Alert, DeliveryResult, EscalationEvent};
    use siren_core::policy::{NotifyMethod, PolicyId, Tier};

    fn tenant() -> TenantRef {
        TenantRef::from("acme")
    }

    fn event_for(alert: &Alert, tier_number: u32) -> EscalationEvent {
        let tier = Tier::new(tier_number, 5)
            .notify(NotifyMethod::ChatDm)
            .target("oncall_primary");
        EscalationEvent::escalated(
            alert,
            alert.policy_id.unwrap(),
            &tier,
            NotifyMethod::ChatDm,
            Some(DeliveryResult::Delivered),
        )
    }

    #[test]
    fn test_append_and_list_for_alert() {
        let log = RedbEventLog::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));

        // Staggered timestamps: same-millisecond keys would tie-break on
        // the random event id.
        let mut first = event_for(&alert, 1);
        first.created_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        log.append(&first).unwrap();
        log.append(&event_for(&alert, 2)).unwrap();

        let events = log.list_for_alert(&tenant(), &alert.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tier, 1);
        assert_eq!(events[1].tier, 2);
    }

    #[test]
    fn test_histories_are_per_alert() {
        let log = RedbEventLog::memory().unwrap();
        let first = Alert::open(tenant(), "one", Some(PolicyId::new()));
        let second = Alert::open(tenant(), "two", Some(PolicyId::new()));

        log.append(&event_for(&first, 1)).unwrap();
        log.append(&event_for(&second, 1)).unwrap();

        assert_eq!(log.list_for_alert(&tenant(), &first.id).unwrap().len(), 1);
        assert_eq!(log.list_for_alert(&tenant(), &second.id).unwrap().len(), 1);
        assert!(log
            .list_for_alert(&tenant(), &AlertId::new())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_list_recent_newest_first_with_limit() {
        let log = RedbEventLog::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));

        let mut early = event_for(&alert, 1);
        early.created_at = chrono::Utc::now() - chrono::Duration::minutes(10);
        let late = event_for(&alert, 2);

        log.append(&early).unwrap();
        log.append(&late).unwrap();

        let recent = log.list_recent(&tenant(), 10).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].tier, 2);

        let capped = log.list_recent(&tenant(), 1).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].tier, 2);
    }

    #[test]
    fn test_tenants_do_not_leak() {
        let log = RedbEventLog::memory().unwrap();
        let alert = Alert::open(tenant(), "db down", Some(PolicyId::new()));
        log.append(&event_for(&alert, 1)).unwrap();

        assert!(log.list_recent(&TenantRef::from("globex"), 10).unwrap().is_empty());
    }
}
