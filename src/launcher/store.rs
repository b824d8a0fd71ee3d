//! SQLite storage for provisioned document ids
//!
//! Once a journal document or mood-tracker sheet has been created for a
//! user it is reused forever, so the external id is persisted locally and
//! looked up before any creation call.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

use super::DocKind;

pub struct IdStore {
    pool: SqlitePool,
}

impl IdStore {
    /// Open (or create) the store at the given SQLite database path.
    pub async fn new(db_path: &Path) -> Result<Self, sqlx::Error> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    pub async fn new_in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS external_documents (
                email TEXT NOT NULL,
                kind TEXT NOT NULL,
                external_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (email, kind)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look up a previously provisioned id for this user and kind.
    pub async fn get(&self, email: &str, kind: DocKind) -> Result<Option<String>, sqlx::Error> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT external_id FROM external_documents
            WHERE email = ? AND kind = ?
            "#,
        )
        .bind(email)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    /// Persist a freshly provisioned id, replacing any stale entry.
    pub async fn put(&self, email: &str, kind: DocKind, id: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO external_documents (email, kind, external_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(email)
        .bind(kind.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
