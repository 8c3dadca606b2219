//! Analyst estimates from `earningsTrend` and `indexTrend`
//!
//! One row per period (`0q`, `+1q`, `0y`, `+1y`); growth estimates also
//! carry the long-term `+5y` period, stored as `LTG`.

use super::json::{int, items, num, text};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};
use yfdb_common::time;

pub const ESTIMATE_MODULES: &[&str] = &["earningsTrend", "indexTrend"];

/// Periods stored by the estimate tables
pub const ESTIMATE_PERIODS: &[&str] = &["0q", "+1q", "0y", "+1y"];

const LONG_TERM_PERIOD: &str = "+5y";
const LONG_TERM_LABEL: &str = "LTG";

/// Which `earningsTrend` block feeds a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Estimate {
    Earnings,
    Revenue,
    EpsTrend,
    EpsRevisions,
}

impl Estimate {
    pub fn table(self) -> Table {
        match self {
            Estimate::Earnings => Table::EarningsEstimates,
            Estimate::Revenue => Table::RevenueEstimates,
            Estimate::EpsTrend => Table::EpsTrends,
            Estimate::EpsRevisions => Table::EpsRevisions,
        }
    }

    /// Fill the columns of this table from one trend entry; `false` when
    /// the block is missing
    fn fill(self, row: &mut Row, trend: &Value) -> bool {
        match self {
            Estimate::Earnings => {
                let block = &trend["earningsEstimate"];
                if !block.is_object() {
                    return false;
                }
                row.set("avg_estimate", num(&block["avg"]))
                    .set("low_estimate", num(&block["low"]))
                    .set("high_estimate", num(&block["high"]))
                    .set("year_ago_eps", num(&block["yearAgoEps"]))
                    .set("number_of_analysts", int(&block["numberOfAnalysts"]))
                    .set("growth_rate", num(&block["growth"]));
            }
            Estimate::Revenue => {
                let block = &trend["revenueEstimate"];
                if !block.is_object() {
                    return false;
                }
                row.set("avg", num(&block["avg"]))
                    .set("low", num(&block["low"]))
                    .set("high", num(&block["high"]))
                    .set("number_of_analysts", int(&block["numberOfAnalysts"]))
                    .set("year_ago_revenue", num(&block["yearAgoRevenue"]))
                    .set("growth", num(&block["growth"]));
            }
            Estimate::EpsTrend => {
                let block = &trend["epsTrend"];
                if !block.is_object() {
                    return false;
                }
                row.set("current", num(&block["current"]))
                    .set("days_ago_7", num(&block["7daysAgo"]))
                    .set("days_ago_30", num(&block["30daysAgo"]))
                    .set("days_ago_60", num(&block["60daysAgo"]))
                    .set("days_ago_90", num(&block["90daysAgo"]));
            }
            Estimate::EpsRevisions => {
                let block = &trend["epsRevisions"];
                if !block.is_object() {
                    return false;
                }
                row.set("up_last_7days", int(&block["upLast7days"]).unwrap_or(0))
                    .set("up_last_30days", int(&block["upLast30days"]).unwrap_or(0))
                    .set("down_last_7days", int(&block["downLast7days"]).unwrap_or(0))
                    .set("down_last_30days", int(&block["downLast30days"]).unwrap_or(0));
            }
        }
        true
    }
}

fn base_row(symbol: &str, period: &str, year: i32) -> Row {
    Row::new()
        .with("symbol", symbol)
        .with("period_type", period)
        .with("year", i64::from(year))
}

/// Rows of one estimate table for the standard periods
pub fn estimate_rows(symbol: &str, summary: &Value, estimate: Estimate, year: i32) -> Vec<Row> {
    items(&summary["earningsTrend"]["trend"])
        .iter()
        .filter_map(|trend| {
            let period = text(&trend["period"])?;
            if !ESTIMATE_PERIODS.contains(&period.as_str()) {
                return None;
            }
            let mut row = base_row(symbol, &period, year);
            estimate.fill(&mut row, trend).then_some(row)
        })
        .collect()
}

/// Stock growth per period alongside the index growth for the same period
pub fn growth_rows(symbol: &str, summary: &Value, year: i32) -> Vec<Row> {
    let index_growth = |period: &str| {
        items(&summary["indexTrend"]["estimates"])
            .iter()
            .find(|e| e["period"].as_str() == Some(period))
            .and_then(|e| num(&e["growth"]))
    };

    let mut periods: Vec<String> = Vec::new();
    for entry in items(&summary["earningsTrend"]["trend"])
        .iter()
        .chain(items(&summary["indexTrend"]["estimates"]))
    {
        if let Some(period) = text(&entry["period"]) {
            let wanted = ESTIMATE_PERIODS.contains(&period.as_str()) || period == LONG_TERM_PERIOD;
            if wanted && !periods.contains(&period) {
                periods.push(period);
            }
        }
    }

    periods
        .iter()
        .filter_map(|period| {
            let stock_trend = items(&summary["earningsTrend"]["trend"])
                .iter()
                .find(|t| t["period"].as_str() == Some(period.as_str()))
                .and_then(|t| num(&t["growth"]));
            let index_trend = index_growth(period.as_str());
            if stock_trend.is_none() && index_trend.is_none() {
                return None;
            }
            let label = if period == LONG_TERM_PERIOD { LONG_TERM_LABEL } else { period.as_str() };
            Some(
                base_row(symbol, label, year)
                    .with("stock_trend", stock_trend)
                    .with("index_trend", index_trend),
            )
        })
        .collect()
}

async fn fetch_summary(ingestor: &Ingestor, symbol: &str) -> Result<Value> {
    Ok(ingestor.yahoo().quote_summary(symbol, ESTIMATE_MODULES).await?)
}

pub async fn insert_estimate(ingestor: &Ingestor, symbol: &str, estimate: Estimate) -> Result<UpsertStats> {
    let summary = fetch_summary(ingestor, symbol).await?;

    let rows = estimate_rows(symbol, &summary, estimate, time::current_year());
    if rows.is_empty() {
        debug!(symbol, estimate = ?estimate, "No estimates found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(estimate.table(), &rows).await
}

pub async fn insert_stock_growth_estimates(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = fetch_summary(ingestor, symbol).await?;

    let rows = growth_rows(symbol, &summary, time::current_year());
    if rows.is_empty() {
        debug!(symbol, "No growth estimates found");
        return Ok(UpsertStats::default());
    }
    ingestor.db().upsert(Table::GrowthEstimates, &rows).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yfdb_common::db::Value as Cell;

    fn summary() -> Value {
        json!({
            "earningsTrend": {
                "trend": [
                    {
                        "period": "0q",
                        "growth": {"raw": 0.12},
                        "earningsEstimate": {
                            "avg": {"raw": 95.2}, "low": {"raw": 80.0}, "high": {"raw": 110.5},
                            "yearAgoEps": {"raw": 85.0}, "numberOfAnalysts": {"raw": 8}, "growth": {"raw": 0.12}
                        },
                        "revenueEstimate": {"avg": {"raw": 11.0e12}, "numberOfAnalysts": {"raw": 7}},
                        "epsTrend": {"current": {"raw": 95.2}, "7daysAgo": {"raw": 95.0}, "90daysAgo": {"raw": 90.0}},
                        "epsRevisions": {"upLast7days": {"raw": 1}, "downLast30days": {"raw": 2}}
                    },
                    {"period": "+1y", "growth": {"raw": 0.05}, "earningsEstimate": {"avg": {"raw": 400.0}}},
                    {"period": "+5y", "growth": {"raw": 0.08}},
                    {"period": "-5y", "growth": {"raw": 0.2}}
                ]
            },
            "indexTrend": {
                "symbol": "SP5",
                "estimates": [
                    {"period": "0q", "growth": {"raw": 0.03}},
                    {"period": "+1q", "growth": {"raw": 0.04}},
                    {"period": "+5y", "growth": {"raw": 0.06}}
                ]
            }
        })
    }

    #[test]
    fn test_earnings_estimate_rows() {
        let rows = estimate_rows("7203.T", &summary(), Estimate::Earnings, 2024);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("period_type"), Some(&Cell::Text("0q".to_string())));
        assert_eq!(rows[0].get("year"), Some(&Cell::Integer(2024)));
        assert_eq!(rows[0].get("number_of_analysts"), Some(&Cell::Integer(8)));
        assert_eq!(rows[0].get("growth_rate"), Some(&Cell::Real(0.12)));
        assert_eq!(rows[1].get("avg_estimate"), Some(&Cell::Real(400.0)));
        assert_eq!(rows[1].get("low_estimate"), Some(&Cell::Null));
    }

    #[test]
    fn test_blocks_missing_for_a_period_are_skipped() {
        let revenue = estimate_rows("7203.T", &summary(), Estimate::Revenue, 2024);
        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[0].get("avg"), Some(&Cell::Real(11.0e12)));

        let trend = estimate_rows("7203.T", &summary(), Estimate::EpsTrend, 2024);
        assert_eq!(trend[0].get("days_ago_30"), Some(&Cell::Null));
        assert_eq!(trend[0].get("days_ago_90"), Some(&Cell::Real(90.0)));
    }

    #[test]
    fn test_revision_counts_default_to_zero() {
        let rows = estimate_rows("7203.T", &summary(), Estimate::EpsRevisions, 2024);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("up_last_7days"), Some(&Cell::Integer(1)));
        assert_eq!(rows[0].get("up_last_30days"), Some(&Cell::Integer(0)));
        assert_eq!(rows[0].get("down_last_30days"), Some(&Cell::Integer(2)));
    }

    #[test]
    fn test_growth_rows_with_long_term() {
        let rows = growth_rows("7203.T", &summary(), 2024);
        let periods: Vec<&str> = rows
            .iter()
            .filter_map(|r| r.get("period_type").and_then(Cell::as_str))
            .collect();
        assert_eq!(periods, vec!["0q", "+1y", "LTG", "+1q"]);

        assert_eq!(rows[0].get("stock_trend"), Some(&Cell::Real(0.12)));
        assert_eq!(rows[0].get("index_trend"), Some(&Cell::Real(0.03)));
        assert_eq!(rows[1].get("index_trend"), Some(&Cell::Null));
        assert_eq!(rows[2].get("stock_trend"), Some(&Cell::Real(0.08)));
        assert_eq!(rows[2].get("index_trend"), Some(&Cell::Real(0.06)));
        assert_eq!(rows[3].get("stock_trend"), Some(&Cell::Null));
    }

    #[test]
    fn test_empty_summary() {
        assert!(estimate_rows("7203.T", &json!({}), Estimate::Earnings, 2024).is_empty());
        assert!(growth_rows("7203.T", &json!({}), 2024).is_empty());
    }
}
