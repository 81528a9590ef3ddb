// src/store.rs
//! Document store for per-user analysis records and profiles.
//!
//! Documents are stored as JSON text keyed by `(user_id, analysis_id)`,
//! following a `users/{uid}/resume_analyses/{analysisId}` namespace.
//! Analysis records are create-and-read only; there is no update or
//! delete path.

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::AnalysisError;

#[derive(Debug, Clone)]
struct StoreEvent {
    user_id: String,
}

#[derive(Clone)]
pub struct AnalysisStore {
    pool: SqlitePool,
    events: broadcast::Sender<StoreEvent>,
}

impl AnalysisStore {
    /// Open (or create) the store at the given path and run migrations.
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url)
            .await
            .context("Failed to connect to SQLite database")?;

        info!("Document store opened: {}", database_url);

        let store = Self::with_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    /// In-memory store, used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory SQLite database")?;

        let store = Self::with_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    fn with_pool(pool: SqlitePool) -> Self {
        let (events, _) = broadcast::channel(64);
        Self { pool, events }
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resume_analyses (
                user_id TEXT NOT NULL,
                analysis_id TEXT NOT NULL,
                document TEXT NOT NULL,
                PRIMARY KEY (user_id, analysis_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_resume_analyses_user
            ON resume_analyses(user_id);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_profiles (
                user_id TEXT PRIMARY KEY,
                document TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("Document store migrations completed");
        Ok(())
    }

    /// Write one analysis record. Records are immutable: writing an id
    /// that already exists for the user is an error, not an overwrite.
    pub async fn save_analysis(
        &self,
        user_id: &str,
        analysis_id: &str,
        document: &Value,
    ) -> Result<(), AnalysisError> {
        sqlx::query(
            r#"
            INSERT INTO resume_analyses (user_id, analysis_id, document)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(analysis_id)
        .bind(document.to_string())
        .execute(&self.pool)
        .await?;

        let _ = self.events.send(StoreEvent {
            user_id: user_id.to_string(),
        });

        Ok(())
    }

    /// All stored analyses for a user, as raw documents. Decoding is
    /// the consumer's concern.
    pub async fn get_analyses(&self, user_id: &str) -> Result<Vec<Value>, AnalysisError> {
        let rows = sqlx::query(
            r#"
            SELECT document FROM resume_analyses
            WHERE user_id = ?
            ORDER BY analysis_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let raw: String = row.try_get("document").ok()?;
                serde_json::from_str(&raw).ok()
            })
            .collect())
    }

    /// A single analysis document. `NotFound` when the document is
    /// absent, distinct from a transport failure.
    pub async fn get_analysis_by_id(
        &self,
        user_id: &str,
        analysis_id: &str,
    ) -> Result<Value, AnalysisError> {
        let row = sqlx::query(
            r#"
            SELECT document FROM resume_analyses
            WHERE user_id = ? AND analysis_id = ?
            "#,
        )
        .bind(user_id)
        .bind(analysis_id)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or(AnalysisError::NotFound)?;
        let raw: String = row
            .try_get("document")
            .map_err(|_| AnalysisError::MalformedResponse)?;
        serde_json::from_str(&raw).map_err(|_| AnalysisError::MalformedResponse)
    }

    pub async fn save_user_profile(
        &self,
        user_id: &str,
        document: &Value,
    ) -> Result<(), AnalysisError> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (user_id, document)
            VALUES (?, ?)
            ON CONFLICT(user_id) DO UPDATE SET document = excluded.document
            "#,
        )
        .bind(user_id)
        .bind(document.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_user_profile(&self, user_id: &str) -> Result<Option<Value>, AnalysisError> {
        let row = sqlx::query(
            r#"
            SELECT document FROM user_profiles WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|row| {
            let raw: String = row.try_get("document").ok()?;
            serde_json::from_str(&raw).ok()
        }))
    }

    /// Push-based live view of a user's analyses. Each change to the
    /// user's namespace yields the freshly re-read full list.
    pub fn watch_analyses(&self, user_id: &str) -> AnalysisWatch {
        AnalysisWatch {
            user_id: user_id.to_string(),
            receiver: self.events.subscribe(),
            store: self.clone(),
        }
    }
}

pub struct AnalysisWatch {
    user_id: String,
    receiver: broadcast::Receiver<StoreEvent>,
    store: AnalysisStore,
}

impl AnalysisWatch {
    /// Wait for the next change to this user's records and return the
    /// current full list. A lagged receiver skips to the latest state
    /// rather than erroring.
    pub async fn changed(&mut self) -> Result<Vec<Value>, AnalysisError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.user_id == self.user_id => {
                    return self.store.get_analyses(&self.user_id).await;
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    return self.store.get_analyses(&self.user_id).await;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(AnalysisError::Unknown("Store closed".to_string()));
                }
            }
        }
    }
}
