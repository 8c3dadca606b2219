//! Declarative column maps for flat Yahoo objects

use super::json::{epoch_iso, flag, int, num, text};
use serde_json::Value;
use yfdb_common::db::{self, Row};

/// Storage kind of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Real,
    Integer,
    Text,
    /// Boolean stored as `"true"` / `"false"`
    Flag,
    /// Epoch seconds stored as an ISO string
    Timestamp,
}

impl FieldKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Real => "REAL",
            FieldKind::Integer => "INTEGER",
            FieldKind::Text | FieldKind::Flag | FieldKind::Timestamp => "TEXT",
        }
    }

    pub fn extract(self, value: &Value) -> db::Value {
        match self {
            FieldKind::Real => num(value).into(),
            FieldKind::Integer => int(value).into(),
            FieldKind::Text => text(value).into(),
            FieldKind::Flag => flag(value).into(),
            FieldKind::Timestamp => epoch_iso(value).into(),
        }
    }
}

/// Column fed by one JSON key
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub column: &'static str,
    pub key: &'static str,
    pub kind: FieldKind,
}

pub const fn real(column: &'static str, key: &'static str) -> Field {
    Field { column, key, kind: FieldKind::Real }
}

pub const fn integer(column: &'static str, key: &'static str) -> Field {
    Field { column, key, kind: FieldKind::Integer }
}

pub const fn text_field(column: &'static str, key: &'static str) -> Field {
    Field { column, key, kind: FieldKind::Text }
}

pub const fn flag_field(column: &'static str, key: &'static str) -> Field {
    Field { column, key, kind: FieldKind::Flag }
}

pub const fn timestamp(column: &'static str, key: &'static str) -> Field {
    Field { column, key, kind: FieldKind::Timestamp }
}

/// Set every mapped column on `row`; absent keys become NULL
pub fn apply(row: &mut Row, source: &Value, fields: &[Field]) {
    for field in fields {
        row.set(field.column, field.kind.extract(&source[field.key]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_apply_kinds() {
        let fields = [
            real("price", "price"),
            integer("count", "count"),
            text_field("name", "name"),
            flag_field("flagged", "flagged"),
            timestamp("at", "at"),
            real("missing", "missing"),
        ];
        let source = json!({
            "price": {"raw": 1.5, "fmt": "1.50"},
            "count": 3,
            "name": " Toyota ",
            "flagged": true,
            "at": 0
        });

        let mut row = Row::new();
        apply(&mut row, &source, &fields);

        assert_eq!(row.get("price"), Some(&db::Value::Real(1.5)));
        assert_eq!(row.get("count"), Some(&db::Value::Integer(3)));
        assert_eq!(row.get("name"), Some(&db::Value::Text("Toyota".to_string())));
        assert_eq!(row.get("flagged"), Some(&db::Value::Text("true".to_string())));
        assert_eq!(row.get("at"), Some(&db::Value::Text("1970-01-01T00:00:00".to_string())));
        assert_eq!(row.get("missing"), Some(&db::Value::Null));
        assert_eq!(FieldKind::Flag.sql_type(), "TEXT");
    }
}
