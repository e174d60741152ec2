use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::types::ListingKey;

/// Append-only record of every listing key the monitor has processed.
#[async_trait]
pub trait DedupStore: Send + Sync {
    /// Every key ever inserted.
    async fn list_known_keys(&self) -> Result<HashSet<ListingKey>>;

    /// Persist `keys` atomically: all land or none do. Keys already present are ignored.
    async fn insert_keys(&self, keys: &[ListingKey]) -> Result<()>;
}

/// `DedupStore` over the SQLite `listings` table.
#[derive(Clone)]
pub struct SqliteDedupStore {
    pool: SqlitePool,
}

impl SqliteDedupStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database at `db_path` and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {db_path}");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl DedupStore for SqliteDedupStore {
    async fn list_known_keys(&self) -> Result<HashSet<ListingKey>> {
        let rows = sqlx::query_scalar::<_, String>("SELECT item_id FROM listings")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::StoreUnavailable(format!("load listing keys: {e}")))?;

        Ok(rows.into_iter().map(ListingKey::from).collect())
    }

    async fn insert_keys(&self, keys: &[ListingKey]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let unavailable = |e: sqlx::Error| AppError::StoreUnavailable(format!("insert listing keys: {e}"));
        let first_seen_at = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(unavailable)?;
        for key in keys {
            sqlx::query("INSERT OR IGNORE INTO listings (item_id, first_seen_at) VALUES (?, ?)")
                .bind(key.as_str())
                .bind(&first_seen_at)
                .execute(&mut *tx)
                .await
                .map_err(unavailable)?;
        }
        tx.commit().await.map_err(unavailable)?;

        debug!(count = keys.len(), "Inserted listing keys");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_store() -> SqliteDedupStore {
        // One connection: every in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        SqliteDedupStore::new(pool)
    }

    fn keys(ks: &[&str]) -> Vec<ListingKey> {
        ks.iter().map(|k| ListingKey::from(*k)).collect()
    }

    #[tokio::test]
    async fn empty_store_has_no_keys() {
        let store = memory_store().await;
        assert!(store.list_known_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inserted_keys_are_listed() {
        let store = memory_store().await;
        store
            .insert_keys(&keys(&["v1|1|0", "v1|2|0"]))
            .await
            .unwrap();
        let known = store.list_known_keys().await.unwrap();
        assert_eq!(known.len(), 2);
        assert!(known.contains(&ListingKey::from("v1|1|0")));
        assert!(known.contains(&ListingKey::from("v1|2|0")));
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_no_op() {
        let store = memory_store().await;
        store.insert_keys(&keys(&["A"])).await.unwrap();
        store.insert_keys(&keys(&["A", "B", "B"])).await.unwrap();
        let known = store.list_known_keys().await.unwrap();
        assert_eq!(known.len(), 2);
    }

    #[tokio::test]
    async fn empty_insert_is_a_no_op() {
        let store = memory_store().await;
        store.insert_keys(&[]).await.unwrap();
        assert!(store.list_known_keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_pool_reports_store_unavailable() {
        let store = memory_store().await;
        store.close().await;
        let err = store.list_known_keys().await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)), "got {err:?}");
        let err = store.insert_keys(&keys(&["A"])).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)), "got {err:?}");
    }
}
