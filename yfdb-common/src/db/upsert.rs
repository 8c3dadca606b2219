//! Generic row upsert keyed by a table's natural key
//!
//! Rows are ordered column/value lists checked against a
//! [`TableDefinition`]. A batch is written inside one transaction with
//! `INSERT ... ON CONFLICT(<key>) DO UPDATE`; `created_at` is set only on
//! insert and `updated_at` on every write. Columns a table marks
//! insert-only are never updated, and tables with `keep_on_null` keep the
//! stored value when the new one is NULL.

use crate::db::schema_sync::TableDefinition;
use crate::{time, Error, Result};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        // NaN and infinities are not storable as REAL
        if v.is_finite() {
            Value::Real(v)
        } else {
            Value::Null
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Ordered column/value list for one table row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Row::set`]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Set a column, replacing any earlier value for it
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| name == column) {
            Some(entry) => entry.1 = value,
            None => self.values.push((column.to_string(), value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.iter().find(|(name, _)| name == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> &[(String, Value)] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Outcome of one upsert batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertStats {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertStats {
    /// Rows written (inserted + updated)
    pub fn processed(&self) -> usize {
        self.inserted + self.updated
    }
}

impl std::ops::AddAssign for UpsertStats {
    fn add_assign(&mut self, rhs: Self) {
        self.inserted += rhs.inserted;
        self.updated += rhs.updated;
    }
}

const MANAGED_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// Insert or update rows by the table's natural key, in one transaction
pub async fn upsert_rows(pool: &SqlitePool, table: &TableDefinition, rows: &[Row]) -> Result<UpsertStats> {
    let mut stats = UpsertStats::default();
    if rows.is_empty() {
        return Ok(stats);
    }

    for row in rows {
        validate_row(table, row)?;
    }

    let now = time::now_timestamp();
    let mut tx = pool.begin().await?;

    for row in rows {
        let exists_sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            table.name,
            key_predicate(table)
        );
        let mut exists_query = sqlx::query_scalar::<_, i64>(&exists_sql);
        for key in &table.unique_key {
            exists_query = match row.get(key) {
                Some(Value::Integer(v)) => exists_query.bind(*v),
                Some(Value::Real(v)) => exists_query.bind(*v),
                Some(Value::Text(v)) => exists_query.bind(v.clone()),
                Some(Value::Null) | None => exists_query.bind(None::<String>),
            };
        }
        let exists = exists_query.fetch_optional(&mut *tx).await?.is_some();

        let sql = upsert_sql(table, row);
        let mut query = sqlx::query(&sql);
        for (_, value) in row.values() {
            query = bind_value(query, value);
        }
        if table.has_column("created_at") {
            query = query.bind(now.clone());
        }
        if table.has_column("updated_at") {
            query = query.bind(now.clone());
        }
        query.execute(&mut *tx).await?;

        if exists {
            stats.updated += 1;
        } else {
            stats.inserted += 1;
        }
    }

    tx.commit().await?;

    tracing::debug!(
        table = %table.name,
        inserted = stats.inserted,
        updated = stats.updated,
        "Upsert batch committed"
    );

    Ok(stats)
}

/// Row count of a table
pub async fn count_rows(pool: &SqlitePool, table_name: &str) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table_name))
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn validate_row(table: &TableDefinition, row: &Row) -> Result<()> {
    for column in row.columns() {
        if MANAGED_COLUMNS.contains(&column) {
            return Err(Error::InvalidInput(format!(
                "{}.{} is maintained by upsert and cannot be set",
                table.name, column
            )));
        }
        if !table.has_column(column) {
            return Err(Error::InvalidInput(format!(
                "Unknown column {}.{}",
                table.name, column
            )));
        }
    }

    for key in &table.unique_key {
        match row.get(key) {
            Some(value) if !value.is_null() => {}
            _ => {
                return Err(Error::InvalidInput(format!(
                    "Row for {} is missing key column '{}'",
                    table.name, key
                )))
            }
        }
    }

    Ok(())
}

fn key_predicate(table: &TableDefinition) -> String {
    table
        .unique_key
        .iter()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn upsert_sql(table: &TableDefinition, row: &Row) -> String {
    let mut columns: Vec<&str> = row.columns().collect();
    let has_created = table.has_column("created_at");
    let has_updated = table.has_column("updated_at");
    if has_created {
        columns.push("created_at");
    }
    if has_updated {
        columns.push("updated_at");
    }

    let placeholders = vec!["?"; columns.len()].join(", ");

    let mut assignments: Vec<String> = row
        .columns()
        .filter(|c| table.is_updatable(c))
        .map(|c| {
            if table.keep_on_null {
                format!("{c} = COALESCE(excluded.{c}, {t}.{c})", t = table.name)
            } else {
                format!("{c} = excluded.{c}")
            }
        })
        .collect();
    if has_updated {
        assignments.push("updated_at = excluded.updated_at".to_string());
    }

    let conflict = if assignments.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", assignments.join(", "))
    };

    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT({}) {}",
        table.name,
        columns.join(", "),
        placeholders,
        table.unique_key.join(", "),
        conflict
    )
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &Value,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Integer(v) => query.bind(*v),
        Value::Real(v) => query.bind(*v),
        Value::Text(v) => query.bind(v.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema_sync::ColumnDefinition;

    fn dividends() -> TableDefinition {
        TableDefinition::with_id("dividends", &["symbol", "date"])
            .column(ColumnDefinition::new("symbol", "TEXT").not_null())
            .column(ColumnDefinition::new("date", "TEXT").not_null())
            .column(ColumnDefinition::new("dividends", "REAL"))
            .with_timestamps()
    }

    #[test]
    fn test_row_set_replaces_value() {
        let mut row = Row::new().with("symbol", "7203.T").with("dividends", 30.0);
        row.set("dividends", 35.0);

        assert_eq!(row.len(), 2);
        assert_eq!(row.get("dividends"), Some(&Value::Real(35.0)));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(f64::NAN), Value::Null);
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::Text("x".to_string()));
        assert_eq!(Value::Integer(3).as_f64(), Some(3.0));
    }

    #[test]
    fn test_upsert_sql_shape() {
        let row = Row::new()
            .with("symbol", "7203.T")
            .with("date", "2024-03-28")
            .with("dividends", 30.0);
        assert_eq!(
            upsert_sql(&dividends(), &row),
            "INSERT INTO dividends (symbol, date, dividends, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) ON CONFLICT(symbol, date) \
             DO UPDATE SET dividends = excluded.dividends, updated_at = excluded.updated_at"
        );
    }

    #[test]
    fn test_upsert_sql_insert_only_and_keep_on_null() {
        let news = TableDefinition::new("news", &["id"])
            .column(ColumnDefinition::new("id", "TEXT").primary_key())
            .column(ColumnDefinition::new("symbol", "TEXT").not_null())
            .column(ColumnDefinition::new("title", "TEXT"))
            .insert_only(&["symbol"])
            .keep_on_null()
            .with_timestamps();
        let row = Row::new().with("id", "a1").with("symbol", "7203.T").with("title", "t");

        assert_eq!(
            upsert_sql(&news, &row),
            "INSERT INTO news (id, symbol, title, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?) ON CONFLICT(id) \
             DO UPDATE SET title = COALESCE(excluded.title, news.title), \
             updated_at = excluded.updated_at"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_and_missing_key() {
        let table = dividends();

        let unknown = Row::new().with("symbol", "A").with("date", "2024-01-01").with("bogus", 1.0);
        assert!(matches!(validate_row(&table, &unknown), Err(Error::InvalidInput(_))));

        let missing_key = Row::new().with("symbol", "A").with("dividends", 1.0);
        assert!(matches!(validate_row(&table, &missing_key), Err(Error::InvalidInput(_))));

        let null_key = Row::new().with("symbol", "A").with("date", Value::Null);
        assert!(matches!(validate_row(&table, &null_key), Err(Error::InvalidInput(_))));

        let managed = Row::new()
            .with("symbol", "A")
            .with("date", "2024-01-01")
            .with("created_at", "x");
        assert!(matches!(validate_row(&table, &managed), Err(Error::InvalidInput(_))));
    }
}
