//! Upcoming earnings and dividend dates

use super::json::{items, local_date, num};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};
use yfdb_common::time;

pub const CALENDAR_MODULES: &[&str] = &["calendarEvents", "defaultKeyStatistics"];

/// Source tag stored with every calendar row
pub const DATA_SOURCE: &str = "yahoo";

/// One row per symbol; `None` when the summary has no calendar events
pub fn calendar_row(symbol: &str, summary: &Value) -> Option<Row> {
    let events = &summary["calendarEvents"];
    if !events.is_object() {
        return None;
    }
    let earnings = &events["earnings"];
    let date = |value: &Value| local_date(value, 0);

    Some(
        Row::new()
            .with("symbol", symbol)
            .with("ex_dividend_date", date(&events["exDividendDate"]))
            .with("dividend_payment_date", date(&events["dividendDate"]))
            .with(
                "earnings_date",
                items(&earnings["earningsDate"]).first().and_then(date),
            )
            .with("earnings_high", num(&earnings["earningsHigh"]))
            .with("earnings_low", num(&earnings["earningsLow"]))
            .with("earnings_average", num(&earnings["earningsAverage"]))
            .with("revenue_high", num(&earnings["revenueHigh"]))
            .with("revenue_low", num(&earnings["revenueLow"]))
            .with("revenue_average", num(&earnings["revenueAverage"]))
            .with(
                "fiscal_year_end",
                date(&summary["defaultKeyStatistics"]["nextFiscalYearEnd"]),
            )
            .with("data_source", DATA_SOURCE)
            .with("last_updated", time::now_timestamp()),
    )
}

pub async fn insert_stock_calendar(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor.yahoo().quote_summary(symbol, CALENDAR_MODULES).await?;

    match calendar_row(symbol, &summary) {
        Some(row) => ingestor.db().upsert(Table::Calendars, &[row]).await,
        None => {
            debug!(symbol, "No calendar data found");
            Ok(UpsertStats::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yfdb_common::db::Value as Cell;

    #[test]
    fn test_calendar_row() {
        let summary = json!({
            "calendarEvents": {
                "earnings": {
                    "earningsDate": [{"raw": 1_715_126_400, "fmt": "2024-05-08"}, {"raw": 1_715_644_800}],
                    "earningsAverage": {"raw": 95.2},
                    "earningsLow": {"raw": 80.0},
                    "earningsHigh": {"raw": 110.5},
                    "revenueAverage": {"raw": 11_000_000_000_000.0}
                },
                "exDividendDate": {"raw": 1_711_843_200},
                "dividendDate": {}
            },
            "defaultKeyStatistics": {"nextFiscalYearEnd": {"raw": 1_743_379_200}}
        });

        let row = calendar_row("7203.T", &summary).unwrap();
        assert_eq!(row.get("earnings_date"), Some(&Cell::Text("2024-05-08".to_string())));
        assert_eq!(row.get("ex_dividend_date"), Some(&Cell::Text("2024-03-31".to_string())));
        assert_eq!(row.get("dividend_payment_date"), Some(&Cell::Null));
        assert_eq!(row.get("earnings_high"), Some(&Cell::Real(110.5)));
        assert_eq!(row.get("revenue_low"), Some(&Cell::Null));
        assert_eq!(row.get("fiscal_year_end"), Some(&Cell::Text("2025-03-31".to_string())));
        assert_eq!(row.get("data_source"), Some(&Cell::Text("yahoo".to_string())));
    }

    #[test]
    fn test_missing_calendar() {
        assert!(calendar_row("7203.T", &json!({"defaultKeyStatistics": {}})).is_none());
    }
}
