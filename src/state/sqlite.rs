//! SQLite-backed task store

use super::TaskStore;
use crate::error::{Error, Result, StoreError};
use crate::types::{Task, TaskId, TaskUpdate};
use async_trait::async_trait;
use sqlx::SqliteConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tokio::sync::Mutex;

/// Task records persisted as JSON rows in a SQLite file
///
/// State and progress are also stored in their own columns for external
/// inspection. Writes go through one async mutex, which serializes every
/// read-merge-write cycle.
#[derive(Debug)]
pub struct SqliteTaskStore {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteTaskStore {
    /// Open (or create) the database and apply migrations
    pub async fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::config("state.path", format!("invalid database path: {}", e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePool::connect_with(options).await?;
        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        let current_version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
                .fetch_optional(&mut *conn)
                .await?
                .flatten();

        if current_version.unwrap_or(0) < 1 {
            Self::migrate_v1(&mut conn).await?;
        }
        Ok(())
    }

    /// Migration v1: tasks table
    async fn migrate_v1(conn: &mut SqliteConnection) -> Result<()> {
        tracing::info!("Applying task store migration v1");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                state INTEGER NOT NULL,
                progress REAL NOT NULL,
                record TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&mut *conn)
        .await?;

        sqlx::query("INSERT INTO schema_version (version, applied_at) VALUES (1, ?)")
            .bind(chrono::Utc::now().timestamp())
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn load(&self, id: &TaskId) -> Result<Option<Task>> {
        let record: Option<String> = sqlx::query_scalar("SELECT record FROM tasks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        record
            .map(|r| serde_json::from_str(&r).map_err(Error::from))
            .transpose()
    }

    async fn save(&self, task: &Task) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, state, progress, record, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                state = excluded.state,
                progress = excluded.progress,
                record = excluded.record,
                created_at = excluded.created_at,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(task.id.as_str())
        .bind(task.state.to_i32())
        .bind(task.progress)
        .bind(serde_json::to_string(task)?)
        .bind(task.created_at.timestamp_millis())
        .bind(task.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        let _guard = self.write_lock.lock().await;
        if let Some(existing) = self.load(&task.id).await?
            && !existing.state.is_terminal()
        {
            return Err(StoreError::AlreadyExists(task.id.clone()).into());
        }
        self.save(&task).await?;
        Ok(task)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>> {
        self.load(id).await
    }

    async fn update(&self, id: &TaskId, update: TaskUpdate) -> Result<Task> {
        let _guard = self.write_lock.lock().await;
        let mut task = self
            .load(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        task.merge(update)?;
        self.save(&task).await?;
        Ok(task)
    }

    async fn list(&self) -> Result<Vec<Task>> {
        let records: Vec<String> =
            sqlx::query_scalar("SELECT record FROM tasks ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;
        records
            .iter()
            .map(|r| serde_json::from_str(r).map_err(Error::from))
            .collect()
    }

    async fn delete(&self, id: &TaskId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
