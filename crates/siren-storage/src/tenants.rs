//! Tenant registry using redb.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use siren_core::store::TenantDirectory;
use siren_core::tenant::{validate_tenant_key, TenantRef};

use crate::error::{Error, Result};

// Tenants table: key = tenant name, value = RegisteredTenant (JSON)
const TENANTS_TABLE: TableDefinition<&str, &str> = TableDefinition::new("tenants");

/// Stored tenant record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredTenant {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Tenant registry for persistent storage.
pub struct RedbTenantDirectory {
    db: Arc<Database>,
}

impl RedbTenantDirectory {
    /// Open a tenant registry at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let db_path = path.join("tenants.redb");
        let db = Database::create(db_path)
            .map_err(|e| Error::Storage(format!("Failed to open tenant database: {}", e)))?;

        Self::init_tables(db)
    }

    /// Create a throwaway tenant registry for testing.
    pub fn memory() -> Result<Self> {
        // redb has no true in-memory mode, so use a unique temp file
        let db_path = std::env::temp_dir().join(format!(
            "siren_tenants_{}_{}.redb",
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
                .open_table(TENANTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open tenants table: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Register a tenant. Returns `false` when it was already present.
    pub fn register(&self, name: &str) -> Result<bool> {
        validate_tenant_key(name).map_err(|e| Error::InvalidInput(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| Error::Storage(format!("Failed to begin write: {}", e)))?;

        let inserted = {
            let mut table = write_txn
                .open_table(TENANTS_TABLE)
                .map_err(|e| Error::Storage(format!("Failed to open tenants table: {}", e)))?;

            let exists = table
                .get(name)
                .map_err(|e| Error::Storage(format!("Failed to read tenant: {}", e)))?
                .is_some();

            if exists {
                false
            } else {
                let record = RegisteredTenant {
                    name: name.to_string(),
                    created_at: Utc::now(),
                };
                let json = serde_json::to_string(&record).map_err(|e| {
                    Error::Serialization(format!("Failed to serialize tenant: {}", e))
                })?;
                table
                    .insert(name, json.as_str())
                    .map_err(|e| Error::Storage(format!("Failed to insert tenant: {}", e)))?;
                true
            }
        };

        write_txn
            .commit()
            .map_err(|e| Error::Storage(format!("Failed to commit: {}", e)))?;

        Ok(inserted)
    }

    /// Whether a tenant is registered.
    pub fn contains(&self, name: &str) -> Result<bool> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(TENANTS_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open tenants table: {}", e)))?;

        Ok(table
            .get(name)
            .map_err(|e| Error::Storage(format!("Failed to read tenant: {}", e)))?
            .is_some())
    }

    /// All registered tenants, sorted by name.
    pub fn list(&self) -> Result<Vec<TenantRef>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| Error::Storage(format!("Failed to begin read: {}", e)))?;

        let table = read_txn
            .open_table(TENANTS_TABLE)
            .map_err(|e| Error::Storage(format!("Failed to open tenants table: {}", e)))?;

        let mut tenants = Vec::new();
        let iter = table
            .iter()
            .map_err(|e| Error::Storage(format!("Failed to iterate: {}", e)))?;
        for entry in iter {
            let (key, _) =
                entry.map_err(|e| Error::Storage(format!("Failed to read entry: {}", e)))?;
            tenants.push(TenantRef::from(key.value()));
        }

        Ok(tenants)
    }
}

#[async_trait]
impl TenantDirectory for RedbTenantDirectory {
    async fn list_tenants(&self) -> siren_core::Result<Vec<TenantRef>> {
        self.list().map_err(Into::into)
    }
}
