//! Database access for the ingester
//!
//! Wraps the shared pool with the ingest schema and lock-retrying upserts.

pub mod schema;

pub use schema::{all_definitions, Table};

use crate::error::Result;
use sqlx::SqlitePool;
use tracing::{debug, info};
use yfdb_common::db::{self as common_db, retry_on_lock, DatabaseOptions, Row, UpsertStats};
use yfdb_common::time;

/// Pool plus the lock-wait budget for writes
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    max_lock_wait_ms: u64,
}

impl Database {
    /// Open the pool and create or synchronise every table
    pub async fn open(options: &DatabaseOptions) -> Result<Self> {
        info!(url = %options.display_url(), "Opening database");
        let pool = common_db::init_database(options, all_definitions()).await?;
        Ok(Self {
            pool,
            max_lock_wait_ms: options.max_lock_wait_ms,
        })
    }

    /// Wrap an existing pool; tables are not touched
    pub fn from_pool(pool: SqlitePool, max_lock_wait_ms: u64) -> Self {
        Self { pool, max_lock_wait_ms }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_tables(&self) -> Result<()> {
        common_db::create_tables(&self.pool, all_definitions()).await?;
        info!(tables = Table::ALL.len(), "Tables created");
        Ok(())
    }

    pub async fn drop_tables(&self) -> Result<()> {
        common_db::drop_tables(&self.pool, all_definitions()).await?;
        info!(tables = Table::ALL.len(), "Tables dropped");
        Ok(())
    }

    /// Upsert a batch into one table by its natural key
    pub async fn upsert(&self, table: Table, rows: &[Row]) -> Result<UpsertStats> {
        let definition = table.definition();
        let stats = retry_on_lock(table.name(), self.max_lock_wait_ms, || {
            common_db::upsert_rows(&self.pool, definition, rows)
        })
        .await?;

        debug!(
            table = table.name(),
            inserted = stats.inserted,
            updated = stats.updated,
            "Upserted rows"
        );
        Ok(stats)
    }

    /// Insert a bare `stock_info` row so dependent tables satisfy the
    /// foreign key; existing rows are left alone
    pub async fn ensure_stock(&self, symbol: &str) -> Result<()> {
        let now = time::now_timestamp();
        retry_on_lock("ensure_stock", self.max_lock_wait_ms, || async {
            sqlx::query(
                "INSERT OR IGNORE INTO stock_info (symbol, created_at, updated_at) VALUES (?, ?, ?)",
            )
            .bind(symbol)
            .bind(&now)
            .bind(&now)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
        .await?;
        Ok(())
    }

    /// Row count of one table
    pub async fn count(&self, table: Table) -> Result<i64> {
        Ok(common_db::count_rows(&self.pool, table.name()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> Database {
        Database::open(&DatabaseOptions::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_all_tables() {
        let db = memory_db().await;
        for table in Table::ALL {
            assert_eq!(db.count(table).await.unwrap(), 0, "{}", table.name());
        }
    }

    #[tokio::test]
    async fn test_ensure_stock_is_idempotent() {
        let db = memory_db().await;
        db.ensure_stock("7203.T").await.unwrap();
        db.ensure_stock("7203.T").await.unwrap();
        assert_eq!(db.count(Table::StockInfo).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_requires_parent_stock() {
        let db = memory_db().await;
        let row = Row::new()
            .with("symbol", "7203.T")
            .with("date", "2024-04-01")
            .with("dividends", 30.0);

        assert!(db.upsert(Table::Dividends, &[row.clone()]).await.is_err());

        db.ensure_stock("7203.T").await.unwrap();
        let first = db.upsert(Table::Dividends, &[row.clone()]).await.unwrap();
        let second = db.upsert(Table::Dividends, &[row]).await.unwrap();
        assert_eq!((first.inserted, first.updated), (1, 0));
        assert_eq!((second.inserted, second.updated), (0, 1));
        assert_eq!(db.count(Table::Dividends).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_drop_tables() {
        let db = memory_db().await;
        db.drop_tables().await.unwrap();
        assert!(db.count(Table::StockInfo).await.is_err());
        db.create_tables().await.unwrap();
        assert_eq!(db.count(Table::StockInfo).await.unwrap(), 0);
    }
}
