use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::roles::Role;

/// Account snapshot attached to the request once the session is verified.
/// The secret hash never appears here.
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store backend error: {0}")]
    Backend(String),
    #[error("account {0} has corrupt data: {1}")]
    Corrupt(Uuid, String),
}

/// Credential store seam used by the session extractor. Injected through
/// application state so tests can substitute a fixture.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError>;
}

/// Thread-safe in-memory store, used as a test fixture and by local tooling.
#[derive(Clone, Default)]
pub struct MemoryAccountStore {
    inner: Arc<RwLock<HashMap<Uuid, AccountRecord>>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, account: AccountRecord) {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.insert(account.id, account);
    }

    pub fn remove(&self, id: Uuid) -> Option<AccountRecord> {
        let mut guard = self.inner.write().expect("rwlock poisoned");
        guard.remove(&id)
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
        let guard = self.inner.read().expect("rwlock poisoned");
        Ok(guard.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Role) -> AccountRecord {
        AccountRecord {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_store_insert_lookup_remove() {
        let store = MemoryAccountStore::new();
        let account = record(Role::Seller);
        let id = account.id;

        assert!(store.find_by_id(id).await.unwrap().is_none());
        store.insert(account);
        let found = store.find_by_id(id).await.unwrap().expect("present");
        assert_eq!(found.username, "alice");
        store.remove(id);
        assert!(store.find_by_id(id).await.unwrap().is_none());
    }
}
