//! Declarative table definitions and automatic schema synchronization
//!
//! Every table is described once, in code, as a [`TableDefinition`]. The
//! same definition drives `CREATE TABLE`, the natural-key unique index,
//! column synchronization for databases created by older builds, and the
//! column list used by the generic upsert.
//!
//! Initialization runs in two phases:
//! 1. **CREATE TABLE IF NOT EXISTS** plus the unique index on the natural key
//! 2. **Auto-Sync** - add missing columns via ALTER TABLE, warn on drift
//!
//! ```rust,ignore
//! let table = TableDefinition::new("dividends", &["symbol", "date"])
//!     .column(ColumnDefinition::new("symbol", "TEXT").not_null().references("stock_info(symbol)"))
//!     .column(ColumnDefinition::new("date", "TEXT").not_null())
//!     .column(ColumnDefinition::new("dividends", "REAL"))
//!     .with_timestamps();
//!
//! SchemaSync::create_table(&pool, &table).await?;
//! SchemaSync::sync_table(&pool, &table).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTOINCREMENT (only meaningful on an INTEGER PRIMARY KEY)
    pub autoincrement: bool,
    /// UNIQUE constraint
    pub unique: bool,
    /// DEFAULT value (SQL literal, e.g. `'yfinance'`)
    pub default_value: Option<String>,
    /// REFERENCES target, e.g. `stock_info(symbol)`
    pub references: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            autoincrement: false,
            unique: false,
            default_value: None,
            references: None,
        }
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as INTEGER PRIMARY KEY AUTOINCREMENT
    pub fn autoincrement(mut self) -> Self {
        self.primary_key = true;
        self.autoincrement = true;
        self
    }

    /// Mark column as NOT NULL
    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    /// Mark column as UNIQUE
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set DEFAULT value
    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Add a foreign key reference
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    /// Column clause as used inside CREATE TABLE
    pub fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(target) = &self.references {
            sql.push_str(&format!(" REFERENCES {}", target));
        }
        sql
    }
}

/// Declarative table definition
#[derive(Debug, Clone, PartialEq)]
pub struct TableDefinition {
    /// Table name in database
    pub name: String,
    /// Expected columns, in creation order
    pub columns: Vec<ColumnDefinition>,
    /// Natural key used for upserts (unique index)
    pub unique_key: Vec<String>,
    /// Columns written on insert and left alone when the row already exists
    pub insert_only: Vec<String>,
    /// On update, NULL values keep the stored value instead of clearing it
    pub keep_on_null: bool,
}

impl TableDefinition {
    /// Start a definition with the given natural key
    pub fn new(name: impl Into<String>, unique_key: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            unique_key: unique_key.iter().map(|k| k.to_string()).collect(),
            insert_only: Vec::new(),
            keep_on_null: false,
        }
    }

    /// Start a definition with the conventional surrogate `id` column
    pub fn with_id(name: impl Into<String>, unique_key: &[&str]) -> Self {
        Self::new(name, unique_key).column(ColumnDefinition::new("id", "INTEGER").autoincrement())
    }

    /// Append a column
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    /// Append several columns
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnDefinition>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Mark columns as set once, when the row is first inserted
    pub fn insert_only(mut self, columns: &[&str]) -> Self {
        self.insert_only.extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// Updates never overwrite a stored value with NULL
    pub fn keep_on_null(mut self) -> Self {
        self.keep_on_null = true;
        self
    }

    /// True if upserts may change this column on an existing row
    pub fn is_updatable(&self, name: &str) -> bool {
        !self.unique_key.iter().any(|k| k == name) && !self.insert_only.iter().any(|c| c == name)
    }

    /// Append `created_at` / `updated_at`
    pub fn with_timestamps(self) -> Self {
        self.column(ColumnDefinition::new("created_at", "TEXT"))
            .column(ColumnDefinition::new("updated_at", "TEXT"))
    }

    /// True if the table declares this column
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Name of the unique index backing the natural key
    pub fn unique_index_name(&self) -> String {
        format!("uq_{}_{}", self.name, self.unique_key.join("_"))
    }

    /// `CREATE TABLE IF NOT EXISTS` statement
    pub fn create_table_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| format!("    {}", c.to_sql())).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            columns.join(",\n")
        )
    }

    /// `CREATE UNIQUE INDEX IF NOT EXISTS` on the natural key
    ///
    /// `None` when the key is the single primary-key column.
    pub fn unique_index_sql(&self) -> Option<String> {
        if self.unique_key.is_empty() {
            return None;
        }
        if self.unique_key.len() == 1 {
            let key = &self.unique_key[0];
            if self.columns.iter().any(|c| &c.name == key && (c.primary_key || c.unique)) {
                return None;
            }
        }
        Some(format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
            self.unique_index_name(),
            self.name,
            self.unique_key.join(", ")
        ))
    }
}

/// SQLite type affinity of a declared column type
///
/// Follows the SQLite rules in order: `INT` → integer, `CHAR`/`CLOB`/`TEXT`
/// → text, `BLOB` or no type → blob, `REAL`/`FLOA`/`DOUB` → real, anything
/// else numeric. Declared types with the same affinity store identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    pub fn of(sql_type: &str) -> Self {
        let declared = sql_type.to_ascii_uppercase();
        if declared.contains("INT") {
            Affinity::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            Affinity::Text
        } else if declared.trim().is_empty() || declared.contains("BLOB") {
            Affinity::Blob
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }
}

/// One row of `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct TableColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Difference between a [`TableDefinition`] and the live table
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Declared but absent; fixed with `ALTER TABLE ADD COLUMN`
    MissingColumn(ColumnDefinition),
    /// Declared and live types have different affinities
    TypeMismatch {
        column: String,
        expected: String,
        actual: String,
    },
    /// Live column lacks `NOT NULL` or `PRIMARY KEY`
    MissingConstraint {
        column: String,
        constraint: &'static str,
    },
}

impl TableDefinition {
    /// Drift of the live columns against this definition, in declaration order
    pub fn drift(&self, live: &[TableColumn]) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for column in &self.columns {
            let Some(found) = live.iter().find(|c| c.name == column.name) else {
                drift.push(SchemaDrift::MissingColumn(column.clone()));
                continue;
            };

            if Affinity::of(&column.sql_type) != Affinity::of(&found.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    column: column.name.clone(),
                    expected: column.sql_type.clone(),
                    actual: found.type_name.clone(),
                });
            }
            // SQLite reports an INTEGER PRIMARY KEY as nullable
            if column.not_null && !found.not_null && !found.pk {
                drift.push(SchemaDrift::MissingConstraint {
                    column: column.name.clone(),
                    constraint: "NOT NULL",
                });
            }
            if column.primary_key && !found.pk {
                drift.push(SchemaDrift::MissingConstraint {
                    column: column.name.clone(),
                    constraint: "PRIMARY KEY",
                });
            }
        }

        drift
    }
}

impl ColumnDefinition {
    /// `ALTER TABLE ADD COLUMN` clause, keeping only what SQLite accepts there:
    /// no key constraints, `NOT NULL` only with a default
    fn add_column_sql(&self, table: &str) -> String {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, self.name, self.sql_type);
        if self.not_null && self.default_value.is_some() {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        if let Some(target) = &self.references {
            if self.default_value.is_none() {
                sql.push_str(&format!(" REFERENCES {}", target));
            }
        }
        sql
    }
}

/// Applies table definitions to a live database
pub struct SchemaSync;

impl SchemaSync {
    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Live columns ordered by position
    pub async fn table_columns(pool: &SqlitePool, table_name: &str) -> Result<Vec<TableColumn>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", table_name))
            .fetch_all(pool)
            .await?;

        let mut columns = rows
            .iter()
            .map(|row| {
                Ok(TableColumn {
                    cid: row.try_get("cid")?,
                    name: row.try_get("name")?,
                    type_name: row.try_get("type")?,
                    not_null: row.try_get::<i32, _>("notnull")? != 0,
                    default_value: row.try_get("dflt_value")?,
                    pk: row.try_get::<i32, _>("pk")? != 0,
                })
            })
            .collect::<std::result::Result<Vec<_>, sqlx::Error>>()?;
        columns.sort_by_key(|c| c.cid);
        Ok(columns)
    }

    /// Create the table and its natural-key index if missing
    pub async fn create_table(pool: &SqlitePool, table: &TableDefinition) -> Result<()> {
        sqlx::query(&table.create_table_sql()).execute(pool).await?;
        if let Some(index_sql) = table.unique_index_sql() {
            sqlx::query(&index_sql).execute(pool).await?;
        }
        debug!(table = %table.name, "Table ensured");
        Ok(())
    }

    pub async fn drop_table(pool: &SqlitePool, table: &TableDefinition) -> Result<()> {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table.name))
            .execute(pool)
            .await?;
        info!(table = %table.name, "Table dropped");
        Ok(())
    }

    /// Add missing columns and report other drift; returns columns added
    ///
    /// Type and constraint changes need a table rebuild and are only logged.
    pub async fn sync_table(pool: &SqlitePool, table: &TableDefinition) -> Result<usize> {
        if !Self::table_exists(pool, &table.name).await? {
            warn!(table = %table.name, "Cannot sync a table that does not exist");
            return Ok(0);
        }

        let live = Self::table_columns(pool, &table.name).await?;
        let mut added = 0;

        for change in table.drift(&live) {
            match change {
                SchemaDrift::MissingColumn(column) => {
                    Self::add_column(pool, &table.name, &column).await?;
                    added += 1;
                }
                SchemaDrift::TypeMismatch { column, expected, actual } => warn!(
                    table = %table.name,
                    column = %column,
                    "Column type is {} but {} is declared; rebuild the table to change it",
                    actual,
                    expected
                ),
                SchemaDrift::MissingConstraint { column, constraint } => warn!(
                    table = %table.name,
                    column = %column,
                    "Column lacks {}; rebuild the table to add it",
                    constraint
                ),
            }
        }

        // Tables from older builds may predate the natural-key index
        if let Some(index_sql) = table.unique_index_sql() {
            sqlx::query(&index_sql).execute(pool).await?;
        }

        if added > 0 {
            info!(table = %table.name, columns_added = added, "Schema synchronized");
        }
        Ok(added)
    }

    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        if column.primary_key || column.unique || (column.not_null && column.default_value.is_none()) {
            warn!(
                table,
                column = %column.name,
                "Adding column without its key or NOT NULL constraint"
            );
        }

        match sqlx::query(&column.add_column_sql(table)).execute(pool).await {
            Ok(_) => {
                info!(table, column = %column.name, sql_type = %column.sql_type, "Added column");
                Ok(())
            }
            Err(sqlx::Error::Database(e)) if e.message().contains("duplicate column") => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
