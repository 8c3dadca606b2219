//! Earnings dates (visualization calendar) and reported earnings history

use super::json::{int, items, local_date, num};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use chrono::DateTime;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};
use yfdb_common::time;

/// Column ids of the visualization table mapped to `earnings_dates`
const EPS_ESTIMATE: &str = "epsestimate";
const EPS_ACTUAL: &str = "epsactual";
const SURPRISE: &str = "epssurprisepct";
const START: &str = "startdatetime";
const GMT_OFFSET_MS: &str = "gmtOffsetMilliSeconds";

/// Event start (RFC 3339) as the exchange-local date
fn event_date(start: &Value, gmt_offset_ms: Option<i64>) -> Option<String> {
    let start = start.as_str()?;
    let epoch = DateTime::parse_from_rfc3339(start).ok()?.timestamp();
    let offset_secs = i32::try_from(gmt_offset_ms.unwrap_or(0) / 1000).ok()?;
    time::epoch_to_local_date(epoch, offset_secs)
}

/// Rows of the visualization document, one per distinct event date
pub fn earnings_date_rows(symbol: &str, document: &Value) -> Vec<Row> {
    let columns: Vec<&str> = items(&document["columns"])
        .iter()
        .map(|column| column["id"].as_str().unwrap_or_default())
        .collect();
    let index = |id: &str| columns.iter().position(|c| *c == id);
    let cell = |row: &Value, id: &str| index(id).map(|i| row[i].clone()).unwrap_or(Value::Null);

    let mut by_date: BTreeMap<String, Row> = BTreeMap::new();
    for raw_row in items(&document["rows"]) {
        let Some(date) = event_date(&cell(raw_row, START), int(&cell(raw_row, GMT_OFFSET_MS))) else {
            continue;
        };
        let row = Row::new()
            .with("symbol", symbol)
            .with("date", date.clone())
            .with("eps_estimate", num(&cell(raw_row, EPS_ESTIMATE)))
            .with("reported_eps", num(&cell(raw_row, EPS_ACTUAL)))
            .with("surprise_percent", num(&cell(raw_row, SURPRISE)));
        by_date.entry(date).or_insert(row);
    }

    by_date.into_values().collect()
}

/// `earningsHistory.history[]` keyed by quarter end
pub fn earnings_history_rows(symbol: &str, summary: &Value) -> Vec<Row> {
    items(&summary["earningsHistory"]["history"])
        .iter()
        .filter_map(|entry| {
            let date = local_date(&entry["quarter"], 0)?;
            Some(
                Row::new()
                    .with("symbol", symbol)
                    .with("date", date)
                    .with("eps_actual", num(&entry["epsActual"]))
                    .with("eps_estimate", num(&entry["epsEstimate"]))
                    .with("eps_difference", num(&entry["epsDifference"]))
                    .with("surprise_percent", num(&entry["surprisePercent"])),
            )
        })
        .collect()
}

pub async fn insert_stock_earnings_dates(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let limit = ingestor.yahoo().settings().earnings_dates_limit;
    let document = ingestor.yahoo().earnings_calendar(symbol, limit).await?;

    let rows = earnings_date_rows(symbol, &document);
    if rows.is_empty() {
        debug!(symbol, "No earnings dates found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::EarningsDates, &rows).await
}

pub async fn insert_stock_earnings_history(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor.yahoo().quote_summary(symbol, &["earningsHistory"]).await?;

    let rows = earnings_history_rows(symbol, &summary);
    if rows.is_empty() {
        debug!(symbol, "No earnings history found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::EarningsHistory, &rows).await
}
