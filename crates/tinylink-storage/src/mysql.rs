use crate::Result;
use async_trait::async_trait;
use jiff::Timestamp;
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tinylink_core::{
    InsertOutcome, MappingStore, OwnerId, ReadStore, Resolved, ShortCode, ShortMapping,
    StorageError, StoreStats,
};
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../ddl/mysql/short_urls.sql");

/// MySQL implementation of the mapping store.
///
/// Uniqueness of codes and URLs is enforced by the table's keys; URLs are keyed
/// by a stored SHA-256 column so their length is not bounded. Deletion is a
/// soft delete through `is_deleted`; rows are never removed, so neither a code
/// nor a URL is ever reused.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table when it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    async fn code_for_url(&self, original_url: &str) -> Result<Option<ShortCode>> {
        let row = sqlx::query(
            r#"
            SELECT short_code
            FROM short_urls
            WHERE url_hash = UNHEX(SHA2(?, 256))
              AND original_url = ?
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|row| {
            let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
            Ok(ShortCode::new_unchecked(code))
        })
        .transpose()
    }
}

fn parse_created_at(micros: i64) -> Result<Timestamp> {
    Timestamp::from_microsecond(micros).map_err(|e| {
        StorageError::InvalidData(format!("invalid created_at timestamp '{}': {e}", micros))
    })
}

fn mapping_from_row(row: &MySqlRow) -> Result<ShortMapping> {
    let id: String = row.try_get("id").map_err(map_sqlx_error)?;
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    let owner_id: String = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let deleted: bool = row.try_get("is_deleted").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ShortMapping {
        id: Uuid::parse_str(&id)
            .map_err(|e| StorageError::InvalidData(format!("invalid id '{}': {e}", id)))?,
        short_code: ShortCode::new_unchecked(short_code),
        original_url,
        owner_id: OwnerId::new(owner_id),
        deleted,
        created_at: parse_created_at(created_at)?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StorageError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageError::InvalidData(message),
        _ => StorageError::Query(message),
    }
}

#[async_trait]
impl ReadStore for MySqlStore {
    async fn resolve(&self, code: &ShortCode) -> Result<Option<Resolved>> {
        let row = sqlx::query(
            r#"
            SELECT original_url, is_deleted
            FROM short_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Resolved {
            original_url: row.try_get("original_url").map_err(map_sqlx_error)?,
            deleted: row.try_get("is_deleted").map_err(map_sqlx_error)?,
        }))
    }

    async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<ShortMapping>> {
        let rows = sqlx::query(
            r#"
            SELECT id, short_code, original_url, owner_id, is_deleted, created_at
            FROM short_urls
            WHERE owner_id = ?
            ORDER BY created_at, short_code
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(mapping_from_row).collect()
    }

    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS urls, COUNT(DISTINCT NULLIF(owner_id, '')) AS users
            FROM short_urls
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let urls: i64 = row.try_get("urls").map_err(map_sqlx_error)?;
        let users: i64 = row.try_get("users").map_err(map_sqlx_error)?;

        Ok(StoreStats {
            urls: urls.max(0) as u64,
            users: users.max(0) as u64,
        })
    }
}

#[async_trait]
impl MappingStore for MySqlStore {
    async fn insert(&self, mapping: ShortMapping) -> Result<InsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (short_code, id, original_url, owner_id, is_deleted, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(mapping.short_code.as_str())
        .bind(mapping.id.to_string())
        .bind(&mapping.original_url)
        .bind(mapping.owner_id.as_str())
        .bind(mapping.deleted)
        .bind(mapping.created_at.as_microsecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(err) if is_unique_violation(&err) => {
                // Either key may have fired. A URL hit wins over a code collision.
                match self.code_for_url(&mapping.original_url).await? {
                    Some(existing) => {
                        debug!(code = %existing, "url already shortened");
                        Ok(InsertOutcome::AlreadyExists(existing))
                    }
                    None => Err(StorageError::CodeCollision(mapping.short_code.to_string())),
                }
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn mark_deleted(&self, code: &ShortCode, owner: &OwnerId) -> Result<bool> {
        if owner.is_anonymous() {
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET is_deleted = TRUE
            WHERE short_code = ?
              AND owner_id = ?
              AND is_deleted = FALSE
            "#,
        )
        .bind(code.as_str())
        .bind(owner.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
