use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_auth::{AccountRecord, AccountStore, StoreError};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    username: String,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl AccountRow {
    fn into_record(self) -> Result<AccountRecord, StoreError> {
        let role = self
            .role
            .parse()
            .map_err(|err| StoreError::Corrupt(self.id, format!("{err}")))?;
        Ok(AccountRecord {
            id: self.id,
            username: self.username,
            email: self.email,
            role,
            created_at: self.created_at,
        })
    }
}

/// Postgres-backed credential store consumed by the session extractor.
#[derive(Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<AccountRecord>, StoreError> {
        let row = sqlx::query_as::<_, AccountRow>(
            "SELECT id, username, email, role, created_at FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StoreError::Backend(err.to_string()))?;

        row.map(AccountRow::into_record).transpose()
    }
}
