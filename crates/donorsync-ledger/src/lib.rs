//! Ledger implementations: the durable SQLite store used in production
//! and an in-memory store for tests.

use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use donorsync_core::ledger::{Ledger, LedgerError};

fn storage_err(err: sqlx::Error) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

/// SQLite-backed [`Ledger`].
///
/// The pool is capped at one connection, which serializes all ledger
/// access; entries for different products therefore never interleave
/// mid-write.
pub struct SqliteLedger {
    pool: SqlitePool,
}

impl SqliteLedger {
    /// Opens (creating if needed) the ledger database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] when the database cannot be opened
    /// or its schema cannot be created.
    pub async fn open(path: &Path) -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        let ledger = Self { pool };
        ledger.migrate().await?;
        tracing::debug!(path = %path.display(), "ledger opened");
        Ok(ledger)
    }

    /// Opens a throwaway in-memory ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Storage`] when the database cannot be
    /// created.
    pub async fn in_memory() -> Result<Self, LedgerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        let ledger = Self { pool };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> Result<(), LedgerError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS products (
                external_id TEXT PRIMARY KEY,
                remote_product_id INTEGER NOT NULL,
                last_synced_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS variants (
                remote_product_id INTEGER NOT NULL,
                option_key TEXT NOT NULL,
                remote_variant_id INTEGER NOT NULL,
                last_synced_at TEXT NOT NULL,
                PRIMARY KEY (remote_product_id, option_key)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn get_product(&self, external_id: &str) -> Result<Option<i64>, LedgerError> {
        let row = sqlx::query("SELECT remote_product_id FROM products WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    async fn put_product(
        &self,
        external_id: &str,
        remote_product_id: i64,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO products (external_id, remote_product_id, last_synced_at)
             VALUES (?, ?, ?)
             ON CONFLICT(external_id) DO UPDATE SET
               remote_product_id = excluded.remote_product_id,
               last_synced_at = excluded.last_synced_at",
        )
        .bind(external_id)
        .bind(remote_product_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
    ) -> Result<Option<i64>, LedgerError> {
        let row = sqlx::query(
            "SELECT remote_variant_id FROM variants
             WHERE remote_product_id = ? AND option_key = ?",
        )
        .bind(remote_product_id)
        .bind(option_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.map(|r| r.get::<i64, _>(0)))
    }

    async fn put_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
        remote_variant_id: i64,
    ) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO variants (remote_product_id, option_key, remote_variant_id, last_synced_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(remote_product_id, option_key) DO UPDATE SET
               remote_variant_id = excluded.remote_variant_id,
               last_synced_at = excluded.last_synced_at",
        )
        .bind(remote_product_id)
        .bind(option_key)
        .bind(remote_variant_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}

/// In-memory [`Ledger`] for tests and dry runs.
#[derive(Default)]
pub struct MemoryLedger {
    products: Mutex<HashMap<String, i64>>,
    variants: Mutex<HashMap<(i64, String), i64>>,
}

impl MemoryLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_product(&self, external_id: &str) -> Result<Option<i64>, LedgerError> {
        let products = self
            .products
            .lock()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(products.get(external_id).copied())
    }

    async fn put_product(
        &self,
        external_id: &str,
        remote_product_id: i64,
    ) -> Result<(), LedgerError> {
        let mut products = self
            .products
            .lock()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        products.insert(external_id.to_owned(), remote_product_id);
        Ok(())
    }

    async fn get_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
    ) -> Result<Option<i64>, LedgerError> {
        let variants = self
            .variants
            .lock()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        Ok(variants
            .get(&(remote_product_id, option_key.to_owned()))
            .copied())
    }

    async fn put_variant(
        &self,
        remote_product_id: i64,
        option_key: &str,
        remote_variant_id: i64,
    ) -> Result<(), LedgerError> {
        let mut variants = self
            .variants
            .lock()
            .map_err(|e| LedgerError::Storage(e.to_string()))?;
        variants.insert(
            (remote_product_id, option_key.to_owned()),
            remote_variant_id,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn product_entries_round_trip_and_overwrite() {
        let ledger = SqliteLedger::in_memory().await.unwrap();

        assert_eq!(ledger.get_product("parfum-lux").await.unwrap(), None);

        ledger.put_product("parfum-lux", 101).await.unwrap();
        assert_eq!(ledger.get_product("parfum-lux").await.unwrap(), Some(101));

        // Recreation overwrites the stale mapping.
        ledger.put_product("parfum-lux", 202).await.unwrap();
        assert_eq!(ledger.get_product("parfum-lux").await.unwrap(), Some(202));
    }

    #[tokio::test]
    async fn variant_entries_are_keyed_by_product_and_option_key() {
        let ledger = SqliteLedger::in_memory().await.unwrap();

        ledger.put_variant(101, "pa_obyem=30 ml", 7).await.unwrap();
        ledger.put_variant(101, "pa_obyem=50 ml", 8).await.unwrap();
        ledger.put_variant(202, "pa_obyem=30 ml", 9).await.unwrap();

        assert_eq!(
            ledger.get_variant(101, "pa_obyem=30 ml").await.unwrap(),
            Some(7)
        );
        assert_eq!(
            ledger.get_variant(101, "pa_obyem=50 ml").await.unwrap(),
            Some(8)
        );
        assert_eq!(
            ledger.get_variant(202, "pa_obyem=30 ml").await.unwrap(),
            Some(9)
        );
        assert_eq!(ledger.get_variant(202, "pa_obyem=50 ml").await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_ledger_matches_sqlite_behavior() {
        let ledger = MemoryLedger::new();

        assert_eq!(ledger.get_product("p").await.unwrap(), None);
        ledger.put_product("p", 1).await.unwrap();
        ledger.put_product("p", 2).await.unwrap();
        assert_eq!(ledger.get_product("p").await.unwrap(), Some(2));

        ledger.put_variant(2, "pa_obyem=30 ml", 5).await.unwrap();
        assert_eq!(
            ledger.get_variant(2, "pa_obyem=30 ml").await.unwrap(),
            Some(5)
        );
    }
}
