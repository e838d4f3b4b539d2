use async_trait::async_trait;
use jiff::Timestamp;
use linkshard_core::partition::Result;
use linkshard_core::{LinkRecord, Partition, StorageError};
use sqlx::mysql::MySqlPoolOptions;
use sqlx::{MySqlPool, Row};
use std::time::Duration;

/// Schema of a partition's table; safe to run against an existing database.
pub const SCHEMA: &str = include_str!("../ddl/mysql/link_records.sql");

/// MySQL implementation of one partition.
///
/// Each partition is its own database. `payload` is the primary key with a
/// binary collation, so payloads differing only in case are distinct and a
/// concurrent insert of the same payload fails on the unique index.
/// Timestamps are stored as Unix milliseconds.
#[derive(Debug, Clone)]
pub struct MySqlPartition {
    pool: MySqlPool,
}

impl MySqlPartition {
    /// Creates a partition from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a partition by opening a new MySQL connection pool.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `link_records` table if it does not exist yet.
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
}

fn parse_timestamp(column: &str, millis: i64) -> Result<Timestamp> {
    Timestamp::from_millisecond(millis).map_err(|e| {
        StorageError::InvalidData(format!("invalid {column} timestamp '{millis}': {e}"))
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
impl Partition for MySqlPartition {
    async fn get(&self, payload: &str) -> Result<Option<LinkRecord>> {
        let row = sqlx::query(
            r#"
            SELECT payload, long_url, created_at, expires_at
            FROM link_records
            WHERE payload = ?
            LIMIT 1
            "#,
        )
        .bind(payload)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload").map_err(map_sqlx_error)?;
        let long_url: String = row.try_get("long_url").map_err(map_sqlx_error)?;
        let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
        let expires_at: i64 = row.try_get("expires_at").map_err(map_sqlx_error)?;

        Ok(Some(LinkRecord {
            payload,
            long_url,
            created_at: parse_timestamp("created_at", created_at)?,
            expires_at: parse_timestamp("expires_at", expires_at)?,
        }))
    }

    async fn put(&self, record: LinkRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO link_records (payload, long_url, created_at, expires_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.payload)
        .bind(&record.long_url)
        .bind(record.created_at.as_millisecond())
        .bind(record.expires_at.as_millisecond())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(StorageError::DuplicateKey(record.payload)),
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn delete_one(&self, payload: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM link_records WHERE payload = ?")
            .bind(payload)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired_before(&self, now: Timestamp) -> Result<u64> {
        let result = sqlx::query("DELETE FROM link_records WHERE expires_at <= ?")
            .bind(now.as_millisecond())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
