//! Quick price and volume summary derived from one year of daily bars

use super::chart::{Bar, ChartSeries};
use super::history::DAILY_CHART;
use super::json::{int, num, text};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};

const THREE_MONTHS_SECS: i64 = 90 * 24 * 60 * 60;

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn tail(bars: &[Bar], n: usize) -> &[Bar] {
    &bars[bars.len().saturating_sub(n)..]
}

/// Build the `fast_info` row; `None` when the chart has no trading bars
pub fn fast_info_row(symbol: &str, chart: &Value, shares: Option<i64>) -> Option<Row> {
    let meta = &chart["meta"];
    let series = ChartSeries::parse(chart);
    let bars = series.trading_bars(false);
    let last = bars.last()?;

    let closes: Vec<f64> = bars.iter().filter_map(|b| b.close).collect();
    let last_price = num(&meta["regularMarketPrice"]).or(last.close);
    let previous_close = closes.len().checked_sub(2).map(|i| closes[i]);

    let year_high = bars.iter().filter_map(|b| b.high).reduce(f64::max);
    let year_low = bars.iter().filter_map(|b| b.low).reduce(f64::min);
    let year_change = match (closes.first(), last_price) {
        (Some(first), Some(last)) if *first != 0.0 => Some(last / first - 1.0),
        _ => None,
    };

    let volumes = |slice: &[Bar]| mean(slice.iter().filter_map(|b| b.volume).map(|v| v as f64));
    let three_month_start = last.timestamp - THREE_MONTHS_SECS;
    let three_month: Vec<Bar> = bars
        .iter()
        .filter(|b| b.timestamp >= three_month_start)
        .cloned()
        .collect();

    let close_mean = |n: usize| mean(closes[closes.len().saturating_sub(n)..].iter().copied());

    let market_cap = match (shares, last_price) {
        (Some(shares), Some(price)) => Some(shares as f64 * price),
        _ => None,
    };

    Some(
        Row::new()
            .with("symbol", symbol)
            .with("currency", text(&meta["currency"]))
            .with("exchange", text(&meta["exchangeName"]))
            .with("quote_type", text(&meta["instrumentType"]))
            .with("timezone", text(&meta["exchangeTimezoneName"]))
            .with("shares", shares)
            .with("last_price", last_price)
            .with("open_price", last.open)
            .with("previous_close", previous_close)
            .with(
                "regular_market_previous_close",
                num(&meta["regularMarketPreviousClose"]).or(previous_close),
            )
            .with("day_high", num(&meta["regularMarketDayHigh"]).or(last.high))
            .with("day_low", num(&meta["regularMarketDayLow"]).or(last.low))
            .with("year_high", year_high)
            .with("year_low", year_low)
            .with("year_change", year_change)
            .with("last_volume", int(&meta["regularMarketVolume"]).or(last.volume))
            .with("ten_day_average_volume", volumes(tail(&bars, 10)))
            .with("three_month_average_volume", volumes(&three_month))
            .with("fifty_day_average", close_mean(50))
            .with("two_hundred_day_average", close_mean(200))
            .with("market_cap", market_cap),
    )
}

pub async fn insert_stock_fast_info(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let (range, interval) = DAILY_CHART;
    let chart = ingestor.yahoo().chart(symbol, range, interval).await?;

    let shares = match ingestor.yahoo().quote(symbol).await {
        Ok(quote) => int(&quote["sharesOutstanding"]),
        Err(e) => {
            debug!(symbol, error = %e, "Quote unavailable, shares left empty");
            None
        }
    };

    match fast_info_row(symbol, &chart, shares) {
        Some(row) => ingestor.db().upsert(Table::FastInfo, &[row]).await,
        None => {
            debug!(symbol, "No fast info found");
            Ok(UpsertStats::default())
        }
    }
}
