//! Price history, dividends and corporate actions from the chart endpoint

use super::chart::ChartSeries;
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use std::collections::BTreeMap;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};
use yfdb_common::time;

/// (range, interval) per chart request
pub const DAILY_CHART: (&str, &str) = ("1y", "1d");
pub const MINUTE_CHART: (&str, &str) = ("7d", "1m");
/// Events are returned for the whole range regardless of bar size
pub const EVENTS_CHART: (&str, &str) = ("max", "1mo");

/// OHLCV rows keyed by exchange-local bar start
pub fn price_rows(symbol: &str, series: &ChartSeries, auto_adjust: bool) -> Vec<Row> {
    series
        .trading_bars(auto_adjust)
        .into_iter()
        .filter_map(|bar| {
            let date = time::epoch_to_local_iso(bar.timestamp, series.gmt_offset)?;
            Some(
                Row::new()
                    .with("symbol", symbol)
                    .with("date", date)
                    .with("open", bar.open)
                    .with("high", bar.high)
                    .with("low", bar.low)
                    .with("close", bar.close)
                    .with("volume", bar.volume),
            )
        })
        .collect()
}

/// Positive dividend amounts keyed by local ex-date
pub fn dividend_rows(symbol: &str, series: &ChartSeries) -> Vec<Row> {
    series
        .dividends
        .iter()
        .filter(|(_, amount)| *amount > 0.0)
        .filter_map(|(ts, amount)| {
            let date = time::epoch_to_local_date(*ts, series.gmt_offset)?;
            Some(
                Row::new()
                    .with("symbol", symbol)
                    .with("date", date)
                    .with("dividends", *amount),
            )
        })
        .collect()
}

/// Dividends and splits joined by local date; dates where both are zero
/// are skipped
pub fn action_rows(symbol: &str, series: &ChartSeries) -> Vec<Row> {
    let mut by_date: BTreeMap<String, (f64, f64)> = BTreeMap::new();

    for (ts, amount) in &series.dividends {
        if let Some(date) = time::epoch_to_local_date(*ts, series.gmt_offset) {
            by_date.entry(date).or_default().0 += amount;
        }
    }
    for (ts, ratio) in &series.splits {
        if let Some(date) = time::epoch_to_local_date(*ts, series.gmt_offset) {
            by_date.entry(date).or_default().1 = *ratio;
        }
    }

    by_date
        .into_iter()
        .filter(|(_, (dividends, splits))| *dividends != 0.0 || *splits != 0.0)
        .map(|(date, (dividends, splits))| {
            Row::new()
                .with("symbol", symbol)
                .with("date", date)
                .with("dividends", dividends)
                .with("stock_splits", splits)
        })
        .collect()
}

async fn fetch_series(ingestor: &Ingestor, symbol: &str, (range, interval): (&str, &str)) -> Result<ChartSeries> {
    let chart = ingestor.yahoo().chart(symbol, range, interval).await?;
    Ok(ChartSeries::parse(&chart))
}

async fn store(ingestor: &Ingestor, symbol: &str, table: Table, rows: Vec<Row>) -> Result<UpsertStats> {
    if rows.is_empty() {
        debug!(symbol, table = table.name(), "No rows found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(table, &rows).await
}

pub async fn insert_stock_history(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let series = fetch_series(ingestor, symbol, DAILY_CHART).await?;
    let rows = price_rows(symbol, &series, ingestor.yahoo().settings().auto_adjust);
    store(ingestor, symbol, Table::History, rows).await
}

pub async fn insert_stock_history_1min(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let series = fetch_series(ingestor, symbol, MINUTE_CHART).await?;
    let rows = price_rows(symbol, &series, ingestor.yahoo().settings().auto_adjust);
    store(ingestor, symbol, Table::History1Min, rows).await
}

pub async fn insert_stock_dividends(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let series = fetch_series(ingestor, symbol, EVENTS_CHART).await?;
    store(ingestor, symbol, Table::Dividends, dividend_rows(symbol, &series)).await
}

pub async fn insert_stock_actions(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let series = fetch_series(ingestor, symbol, EVENTS_CHART).await?;
    store(ingestor, symbol, Table::Actions, action_rows(symbol, &series)).await
}
