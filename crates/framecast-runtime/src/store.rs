//! Task result stores
//!
//! The runtime writes every status change through a [`ResultStore`]. Two
//! implementations exist: an in-process map for local use and tests, and a
//! PostgreSQL table for deployments that need results to outlive the process.

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::task::{TaskId, TaskRecord};

/// Persistence for task records
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert or replace a record
    async fn put(&self, record: &TaskRecord) -> Result<()>;

    /// Fetch a record that has not expired
    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskRecord>>;

    /// Unexpired records of one requester, newest first
    async fn list_for_requester(&self, requester_id: &str, limit: usize)
    -> Result<Vec<TaskRecord>>;

    /// Remove expired records, returning how many were dropped
    async fn purge_expired(&self) -> Result<u64>;
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    records: RwLock<HashMap<TaskId, TaskRecord>>,
}

impl MemoryResultStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held, expired ones included
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no records
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn put(&self, record: &TaskRecord) -> Result<()> {
        self.records
            .write()
            .await
            .insert(record.task_id, record.clone());
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskRecord>> {
        let now = Utc::now();
        Ok(self
            .records
            .read()
            .await
            .get(task_id)
            .filter(|r| !r.is_expired(now))
            .cloned())
    }

    async fn list_for_requester(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<TaskRecord>> {
        let now = Utc::now();
        let records = self.records.read().await;
        let mut matching: Vec<TaskRecord> = records
            .values()
            .filter(|r| r.requester_id.as_deref() == Some(requester_id) && !r.is_expired(now))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(limit);
        Ok(matching)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let now = Utc::now();
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, r| !r.is_expired(now));
        Ok((before - records.len()) as u64)
    }
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS framecast_tasks (
    task_id      TEXT PRIMARY KEY,
    requester_id TEXT,
    status       TEXT NOT NULL,
    record       TEXT NOT NULL,
    created_at   BIGINT NOT NULL,
    expires_at   BIGINT NOT NULL
)"#;

const CREATE_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS framecast_tasks_requester
    ON framecast_tasks (requester_id, created_at DESC)"#;

/// PostgreSQL-backed store
///
/// Records are kept as JSON text next to the columns needed for lookup;
/// timestamps are epoch milliseconds.
#[derive(Debug, Clone)]
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    /// Wrap an existing pool; call [`PgResultStore::migrate`] before use
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the table exists
    pub async fn connect(url: &str) -> Result<Self> {
        tracing::debug!("Connecting to result store database...");
        let pool = PgPool::connect(url)
            .await
            .context("Failed to connect to result store database")?;
        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!("PostgreSQL result store ready");
        Ok(store)
    }

    /// Create the task table and its index if missing
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .context("Failed to create framecast_tasks table")?;
        sqlx::query(CREATE_INDEX)
            .execute(&self.pool)
            .await
            .context("Failed to create framecast_tasks index")?;
        Ok(())
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn decode(row: &sqlx::postgres::PgRow) -> Result<TaskRecord> {
    let json: String = row.try_get("record")?;
    serde_json::from_str(&json).context("Corrupt task record in result store")
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn put(&self, record: &TaskRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;
        sqlx::query(
            r#"
            INSERT INTO framecast_tasks
                (task_id, requester_id, status, record, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (task_id) DO UPDATE SET
                status = EXCLUDED.status,
                record = EXCLUDED.record,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(record.task_id.to_string())
        .bind(record.requester_id.as_deref())
        .bind(record.status.as_str())
        .bind(json)
        .bind(record.created_at.timestamp_millis())
        .bind(record.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to store task {}", record.task_id))?;
        Ok(())
    }

    async fn get(&self, task_id: &TaskId) -> Result<Option<TaskRecord>> {
        let row = sqlx::query(
            "SELECT record FROM framecast_tasks WHERE task_id = $1 AND expires_at > $2",
        )
        .bind(task_id.to_string())
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load task {}", task_id))?;

        row.as_ref().map(decode).transpose()
    }

    async fn list_for_requester(
        &self,
        requester_id: &str,
        limit: usize,
    ) -> Result<Vec<TaskRecord>> {
        let mut rows = sqlx::query(
            r#"
            SELECT record FROM framecast_tasks
            WHERE requester_id = $1 AND expires_at > $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(requester_id)
        .bind(Utc::now().timestamp_millis())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch(&self.pool);

        let mut records = Vec::new();
        while let Some(row) = rows.try_next().await? {
            records.push(decode(&row)?);
        }
        Ok(records)
    }

    async fn purge_expired(&self) -> Result<u64> {
        let done = sqlx::query("DELETE FROM framecast_tasks WHERE expires_at <= $1")
            .bind(Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .context("Failed to purge expired tasks")?;
        Ok(done.rows_affected())
    }
}
