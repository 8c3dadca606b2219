//! Analyst recommendation counts per period (`0m`, `-1m`, ...)

use super::json::{int, items, text};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};

const BUCKETS: [(&str, &str); 5] = [
    ("strong_buy", "strongBuy"),
    ("buy", "buy"),
    ("hold", "hold"),
    ("sell", "sell"),
    ("strong_sell", "strongSell"),
];

pub fn recommendation_rows(symbol: &str, summary: &Value) -> Vec<Row> {
    items(&summary["recommendationTrend"]["trend"])
        .iter()
        .filter_map(|entry| {
            let period = text(&entry["period"])?;
            let mut row = Row::new().with("symbol", symbol).with("period", period);

            let mut total = 0;
            for (column, key) in BUCKETS {
                let count = int(&entry[key]);
                total += count.unwrap_or(0);
                row.set(column, count);
            }
            row.set("total_analysts", (total > 0).then_some(total));
            Some(row)
        })
        .collect()
}

pub async fn insert_stock_recommendations(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor
        .yahoo()
        .quote_summary(symbol, &["recommendationTrend"])
        .await?;

    let rows = recommendation_rows(symbol, &summary);
    if rows.is_empty() {
        debug!(symbol, "No recommendations found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::Recommendations, &rows).await
}
