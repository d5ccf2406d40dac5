//! Escalation policy storage using redb.
//!
//! Policies are validated before every write; the store never holds a
//! structurally invalid ladder.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};

use siren_core::policy::{EscalationPolicy, PolicyId};
use siren_core::store::PolicyStore;
use siren_core::tenant::TenantRef;

use crate::error::{Error, Result};

// Policies table: key = "{tenant}/{policy_id}", value = EscalationPolicy (JSON)
const POLICIES_TABLE: TableDefinition<&str, &str> = TableDefinition::new("policies");

fn policy_key(tenant: &TenantRef, policy_id: &PolicyId) -> String {
    format!("{}/{}", tenant, policy_id)
}

/// Policy store for persistent storage.
pub struct RedbPolicyStore {
    db: Arc<Database>,
}

impl RedbPolicyStore {
    /// Open a policy store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let db_path = path.join("policies.redb");
        let db = Database::create(db_path)
            .map_err(|e| Error::Storage(format!("Failed to open policy database: {}", e)))?;

        Self::init_tables(db)
    }

    /// Create a throwaway policy store for testing.
    pub fn memory() -> Result<Self> {
        // redb has no true in-memory mode, so use a unique temp file
        let db_path = std::env::temp_dir().join(format!(
            "siren_policies_{}_{}.redb",
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
                .open_table(POLICIES_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open policies table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Insert or replace a policy. Rejects invalid ladders.
    pub fn put(&self, tenant: &TenantRef, policy: &EscalationPolicy) -> Result<()> {
        policy
            .validate()
            .map_err(|e| Error::InvalidInput(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let json = serde_json::to_string(policy)
            .map_err(|e| Error::Serialization(format!("Failed to serialize policy: {}", e)))?;

        {
            let mut table = write_txn
                .open_table(POLICIES_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open policies table: {}", e)))?;
            let key = policy_key(tenant, &policy.id);
            table
                .insert(key.as_str(), json.as_str())
                .map_err(|e| Error::Storage(format!("Failed to insert policy: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(())
    }

    /// Get a policy by id within a tenant partition.
    pub fn get(&self, tenant: &TenantRef, policy_id: &PolicyId) -> Result<Option<EscalationPolicy>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(POLICIES_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open policies table: {}", e)))?;

        let key = policy_key(tenant, policy_id);
        match table.get(key.as_str()) {
            Ok(Some(value)) => {
                let policy: EscalationPolicy = serde_json::from_str(value.value()).map_err(|e| {
                    Error::Serialization(format!("Failed to deserialize policy: {}", e))
                })?;
                Ok(Some(policy))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(Error::Storage(format!("Failed to read policy: {}", e))),
        }
    }

    /// List a tenant's policies, sorted by name.
    pub fn list(&self, tenant: &TenantRef) -> Result<Vec<EscalationPolicy>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(POLICIES_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open policies table: {}", e)))?;

        let prefix = format!("{}/", tenant);
        let mut policies = Vec::new();
        let iter = table
            .range(prefix.as_str()..)
            .map_err(|e| Error::Storage(format!("Failed to scan policies: {}", e)))?;
        for entry in iter {
            let (key, value) =
                entry.map_err(|e| Error::Storage(format!("Failed to read entry: {}", e)))?;
            if !key.value().starts_with(&prefix) {
                break;
            }
            let policy: EscalationPolicy = serde_json::from_str(value.value())
                .map_err(|e| Error::Serialization(format!("Failed to deserialize: {}", e)))?;
            policies.push(policy);
        }

        policies.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(policies)
    }

    /// Delete a policy. Returns whether it existed.
    pub fn delete(&self, tenant: &TenantRef, policy_id: &PolicyId) -> Result<bool> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let existed = {
            let mut table = write_txn
                .open_table(POLICIES_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open policies table: {}", e)))?;
            let key = policy_key(tenant, policy_id);
            let removed = table
                .remove(key.as_str())
                .map_err(|e| Error::Storage(format!("Failed to remove policy: {}", e)))?
                .is_some();
            removed
        };

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(existed)
    }
}

#[async_trait]
impl PolicyStore for RedbPolicyStore {
    async fn get_policy(
        &self,
        tenant: &TenantRef,
        policy_id: &PolicyId,
    ) -> siren_core::Result<Option<EscalationPolicy>> {
        self.get(tenant, policy_id).map_err(Into::into)
    }

    async fn put_policy(
        &self,
        tenant: &TenantRef,
        policy: EscalationPolicy,
    ) -> siren_core::Result<()> {
        self.put(tenant, &policy).map_err(Into::into)
    }

    async fn list_policies(&self, tenant: &TenantRef) -> siren_core::Result<Vec<EscalationPolicy>> {
        self.list(tenant).map_err(Into::into)
    }

    async fn delete_policy(
        &self,
        tenant: &TenantRef,
        policy_id: &PolicyId,
    ) -> siren_core::Result<bool> {
        self.delete(tenant, policy_id).map_err(Into::into)
    }
}
