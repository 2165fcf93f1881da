use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::{Slot, MIGRATION_001_SLOTS};

/// Repository holding the persisted slots, one JSON document per slot.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_SLOTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open the database file at `path`, creating it if needed, and migrate.
    pub async fn open(path: &str) -> Result<Self> {
        let repo = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Read the raw payload of a slot. `None` if the slot was never written.
    pub async fn load_slot(&self, slot: Slot) -> Result<Option<String>> {
        let row = sqlx::query("SELECT payload FROM slots WHERE key = ?")
            .bind(slot.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to read slot '{}'", slot))?;

        Ok(row.map(|row| row.get("payload")))
    }

    /// Overwrite a slot with a new payload.
    pub async fn save_slot(&self, slot: Slot, payload: &str) -> Result<()> {
        sqlx::query(UPSERT_SLOT)
            .bind(slot.as_str())
            .bind(payload)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to write slot '{}'", slot))?;

        tracing::debug!(slot = %slot, bytes = payload.len(), "slot written");
        Ok(())
    }

    /// Overwrite several slots in a single transaction, so either all of
    /// them change or none do.
    pub async fn save_slots(&self, slots: &[(Slot, String)]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        let now = Utc::now().to_rfc3339();

        for (slot, payload) in slots {
            sqlx::query(UPSERT_SLOT)
                .bind(slot.as_str())
                .bind(payload)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to write slot '{}'", slot))?;
        }

        tx.commit().await.context("Failed to commit slots")?;
        tracing::debug!(count = slots.len(), "slots written in one transaction");
        Ok(())
    }

    /// Close the underlying pool. Later writes will fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

const UPSERT_SLOT: &str = r#"
    INSERT INTO slots (key, payload, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
"#;
