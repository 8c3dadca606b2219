//! Major, institutional, mutual fund and insider holdings

use super::fields::{self, real, Field};
use super::json::{int, items, local_date, num, text};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};

pub const MAJOR_HOLDER_FIELDS: &[Field] = &[
    real("insiders_percent_held", "insidersPercentHeld"),
    real("institutions_percent_held", "institutionsPercentHeld"),
    real("institutions_float_percent_held", "institutionsFloatPercentHeld"),
    real("institutions_count", "institutionsCount"),
];

/// Ownership list source for the holder tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Institutional,
    MutualFund,
}

impl Ownership {
    pub fn module(self) -> &'static str {
        match self {
            Ownership::Institutional => "institutionOwnership",
            Ownership::MutualFund => "fundOwnership",
        }
    }

    pub fn table(self) -> Table {
        match self {
            Ownership::Institutional => Table::InstitutionalHolders,
            Ownership::MutualFund => Table::MutualfundHolders,
        }
    }
}

/// Insider activity rows: (label, shares key, transactions key)
const INSIDER_ROWS: &[(&str, &str, Option<&str>)] = &[
    ("Purchases", "buyInfoShares", Some("buyInfoCount")),
    ("Sales", "sellInfoShares", Some("sellInfoCount")),
    ("Net Shares Purchased (Sold)", "netInfoShares", Some("netInfoCount")),
    ("Total Insider Shares Held", "totalInsiderShares", None),
    ("% Net Shares Purchased (Sold)", "netPercentInsiderShares", None),
    ("% Buy Shares", "buyPercentInsiderShares", None),
    ("% Sell Shares", "sellPercentInsiderShares", None),
];

pub fn major_holders_row(symbol: &str, summary: &Value) -> Option<Row> {
    let breakdown = &summary["majorHoldersBreakdown"];
    if !breakdown.is_object() {
        return None;
    }
    let mut row = Row::new().with("symbol", symbol);
    fields::apply(&mut row, breakdown, MAJOR_HOLDER_FIELDS);
    Some(row)
}

/// Holder rows keyed by (report date, holder); entries lacking either are
/// skipped
pub fn ownership_rows(symbol: &str, summary: &Value, ownership: Ownership) -> Vec<Row> {
    items(&summary[ownership.module()]["ownershipList"])
        .iter()
        .filter_map(|entry| {
            let holder = text(&entry["organization"])?;
            let date = local_date(&entry["reportDate"], 0)?;
            Some(
                Row::new()
                    .with("symbol", symbol)
                    .with("date", date)
                    .with("holder", holder)
                    .with("pct_held", num(&entry["pctHeld"]))
                    .with("shares", num(&entry["position"]))
                    .with("value", num(&entry["value"]))
                    .with("pct_change", num(&entry["pctChange"])),
            )
        })
        .collect()
}

pub fn insider_purchase_rows(symbol: &str, summary: &Value) -> Vec<Row> {
    let activity = &summary["netSharePurchaseActivity"];
    if !activity.is_object() {
        return Vec::new();
    }

    INSIDER_ROWS
        .iter()
        .filter_map(|(label, shares_key, trans_key)| {
            let shares = num(&activity[*shares_key]);
            let trans = trans_key.and_then(|key| int(&activity[key]));
            if shares.is_none() && trans.is_none() {
                return None;
            }
            Some(
                Row::new()
                    .with("symbol", symbol)
                    .with("insider_purchases_last_6m", *label)
                    .with("shares", shares)
                    .with("trans", trans),
            )
        })
        .collect()
}

pub async fn insert_stock_major_holders(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor
        .yahoo()
        .quote_summary(symbol, &["majorHoldersBreakdown"])
        .await?;

    match major_holders_row(symbol, &summary) {
        Some(row) => ingestor.db().upsert(Table::MajorHolders, &[row]).await,
        None => {
            debug!(symbol, "No major holders found");
            Ok(UpsertStats::default())
        }
    }
}

pub async fn insert_holders(ingestor: &Ingestor, symbol: &str, ownership: Ownership) -> Result<UpsertStats> {
    let summary = ingestor.yahoo().quote_summary(symbol, &[ownership.module()]).await?;

    let rows = ownership_rows(symbol, &summary, ownership);
    if rows.is_empty() {
        debug!(symbol, ownership = ?ownership, "No holders found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(ownership.table(), &rows).await
}

pub async fn insert_stock_insider_purchases(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor
        .yahoo()
        .quote_summary(symbol, &["netSharePurchaseActivity"])
        .await?;

    let rows = insider_purchase_rows(symbol, &summary);
    if rows.is_empty() {
        debug!(symbol, "No insider purchases found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::InsiderPurchases, &rows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yfdb_common::db::Value as Cell;

    #[test]
    fn test_major_holders_row() {
        let summary = json!({
            "majorHoldersBreakdown": {
                "maxAge": 1,
                "insidersPercentHeld": {"raw": 0.105},
                "institutionsPercentHeld": {"raw": 0.2},
                "institutionsCount": {"raw": 1021}
            }
        });

        let row = major_holders_row("7203.T", &summary).unwrap();
        assert_eq!(row.get("insiders_percent_held"), Some(&Cell::Real(0.105)));
        assert_eq!(row.get("institutions_count"), Some(&Cell::Real(1021.0)));
        assert_eq!(row.get("institutions_float_percent_held"), Some(&Cell::Null));

        assert!(major_holders_row("7203.T", &json!({})).is_none());
    }

    #[test]
    fn test_ownership_rows_skip_incomplete_entries() {
        let summary = json!({
            "fundOwnership": {
                "ownershipList": [
                    {
                        "reportDate": {"raw": 1_711_843_200, "fmt": "2024-03-31"},
                        "organization": "  Vanguard Total Intl Stock Index Fd  ",
                        "pctHeld": {"raw": 0.0123},
                        "position": {"raw": 160_000_000},
                        "value": {"raw": 4_000_000_000_i64},
                        "pctChange": {"raw": -0.01}
                    },
                    {"reportDate": {"raw": 1_711_843_200}, "pctHeld": {"raw": 0.01}},
                    {"organization": "No Date Fund"}
                ]
            }
        });

        let rows = ownership_rows("7203.T", &summary, Ownership::MutualFund);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0].get("holder"),
            Some(&Cell::Text("Vanguard Total Intl Stock Index Fd".to_string()))
        );
        assert_eq!(rows[0].get("date"), Some(&Cell::Text("2024-03-31".to_string())));
        assert_eq!(rows[0].get("shares"), Some(&Cell::Real(160_000_000.0)));

        assert!(ownership_rows("7203.T", &summary, Ownership::Institutional).is_empty());
    }

    #[test]
    fn test_insider_purchase_rows() {
        let summary = json!({
            "netSharePurchaseActivity": {
                "period": "6m",
                "buyInfoCount": {"raw": 3},
                "buyInfoShares": {"raw": 12_000},
                "sellInfoCount": {"raw": 1},
                "sellInfoShares": {"raw": 500},
                "netInfoShares": {"raw": 11_500},
                "totalInsiderShares": {"raw": 2_000_000},
                "buyPercentInsiderShares": {"raw": 0.006}
            }
        });

        let rows = insider_purchase_rows("7203.T", &summary);
        let labels: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.get("insider_purchases_last_6m").and_then(Cell::as_str))
            .collect();
        assert_eq!(
            labels,
            vec![
                "Purchases",
                "Sales",
                "Net Shares Purchased (Sold)",
                "Total Insider Shares Held",
                "% Buy Shares"
            ]
        );
        assert_eq!(rows[0].get("trans"), Some(&Cell::Integer(3)));
        assert_eq!(rows[2].get("trans"), Some(&Cell::Null));
        assert_eq!(rows[3].get("shares"), Some(&Cell::Real(2_000_000.0)));
    }
}
