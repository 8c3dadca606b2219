//! Company profile, price, ratio and governance fields
//!
//! The flat info map is built from the quoteSummary modules in
//! [`INFO_MODULES`] with the v7 quote fields layered on top.

use super::fields::{self, flag_field, integer, real, text_field, timestamp, Field};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use crate::services::yahoo_client::INFO_MODULES;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use yfdb_common::db::{Row, UpsertStats};

pub const INFO_FIELDS: &[Field] = &[
    // Company
    text_field("long_name", "longName"),
    text_field("short_name", "shortName"),
    text_field("address1", "address1"),
    text_field("address2", "address2"),
    text_field("city", "city"),
    text_field("zip_code", "zip"),
    text_field("country", "country"),
    text_field("phone", "phone"),
    text_field("website", "website"),
    text_field("ir_website", "irWebsite"),
    text_field("industry", "industry"),
    text_field("industry_key", "industryKey"),
    text_field("industry_disp", "industryDisp"),
    text_field("sector", "sector"),
    text_field("sector_key", "sectorKey"),
    text_field("sector_disp", "sectorDisp"),
    text_field("long_business_summary", "longBusinessSummary"),
    integer("full_time_employees", "fullTimeEmployees"),
    // Price
    text_field("currency", "currency"),
    real("current_price", "currentPrice"),
    real("previous_close", "previousClose"),
    real("open_price", "open"),
    real("day_low", "dayLow"),
    real("day_high", "dayHigh"),
    real("regular_market_previous_close", "regularMarketPreviousClose"),
    real("regular_market_open", "regularMarketOpen"),
    real("regular_market_day_low", "regularMarketDayLow"),
    real("regular_market_day_high", "regularMarketDayHigh"),
    real("regular_market_price", "regularMarketPrice"),
    real("regular_market_change", "regularMarketChange"),
    real("regular_market_change_percent", "regularMarketChangePercent"),
    // 52 week and all time
    real("fifty_two_week_low", "fiftyTwoWeekLow"),
    real("fifty_two_week_high", "fiftyTwoWeekHigh"),
    real("fifty_two_week_change", "52WeekChange"),
    real("fifty_two_week_change_percent", "fiftyTwoWeekChangePercent"),
    real("all_time_high", "allTimeHigh"),
    real("all_time_low", "allTimeLow"),
    // Moving averages
    real("fifty_day_average", "fiftyDayAverage"),
    real("fifty_day_average_change", "fiftyDayAverageChange"),
    real("fifty_day_average_change_percent", "fiftyDayAverageChangePercent"),
    real("two_hundred_day_average", "twoHundredDayAverage"),
    real("two_hundred_day_average_change", "twoHundredDayAverageChange"),
    real("two_hundred_day_average_change_percent", "twoHundredDayAverageChangePercent"),
    // Volume
    real("volume", "volume"),
    real("regular_market_volume", "regularMarketVolume"),
    real("average_volume", "averageVolume"),
    real("average_volume_10days", "averageVolume10days"),
    real("average_daily_volume_10day", "averageDailyVolume10Day"),
    real("average_daily_volume_3month", "averageDailyVolume3Month"),
    real("bid", "bid"),
    real("ask", "ask"),
    real("bid_size", "bidSize"),
    real("ask_size", "askSize"),
    // Dividends and splits
    real("dividend_rate", "dividendRate"),
    real("dividend_yield", "dividendYield"),
    timestamp("ex_dividend_date", "exDividendDate"),
    real("payout_ratio", "payoutRatio"),
    real("five_year_avg_dividend_yield", "fiveYearAvgDividendYield"),
    real("trailing_annual_dividend_rate", "trailingAnnualDividendRate"),
    real("trailing_annual_dividend_yield", "trailingAnnualDividendYield"),
    real("last_dividend_value", "lastDividendValue"),
    timestamp("last_dividend_date", "lastDividendDate"),
    text_field("last_split_factor", "lastSplitFactor"),
    timestamp("last_split_date", "lastSplitDate"),
    // Valuation
    real("market_cap", "marketCap"),
    real("enterprise_value", "enterpriseValue"),
    real("shares_outstanding", "sharesOutstanding"),
    real("float_shares", "floatShares"),
    real("implied_shares_outstanding", "impliedSharesOutstanding"),
    real("held_percent_insiders", "heldPercentInsiders"),
    real("held_percent_institutions", "heldPercentInstitutions"),
    real("beta", "beta"),
    real("trailing_pe", "trailingPE"),
    real("forward_pe", "forwardPE"),
    real("price_to_book", "priceToBook"),
    real("price_to_sales_trailing_12months", "priceToSalesTrailing12Months"),
    real("enterprise_to_revenue", "enterpriseToRevenue"),
    real("enterprise_to_ebitda", "enterpriseToEbitda"),
    real("trailing_peg_ratio", "trailingPegRatio"),
    // Financials
    real("total_cash", "totalCash"),
    real("total_cash_per_share", "totalCashPerShare"),
    real("total_debt", "totalDebt"),
    real("total_revenue", "totalRevenue"),
    real("revenue_per_share", "revenuePerShare"),
    real("ebitda", "ebitda"),
    real("gross_profits", "grossProfits"),
    real("net_income_to_common", "netIncomeToCommon"),
    real("book_value", "bookValue"),
    real("quick_ratio", "quickRatio"),
    real("current_ratio", "currentRatio"),
    real("return_on_assets", "returnOnAssets"),
    real("return_on_equity", "returnOnEquity"),
    real("profit_margins", "profitMargins"),
    real("gross_margins", "grossMargins"),
    real("ebitda_margins", "ebitdaMargins"),
    real("operating_margins", "operatingMargins"),
    real("earnings_growth", "earningsGrowth"),
    real("revenue_growth", "revenueGrowth"),
    real("earnings_quarterly_growth", "earningsQuarterlyGrowth"),
    real("trailing_eps", "trailingEps"),
    real("forward_eps", "forwardEps"),
    real("eps_trailing_twelve_months", "epsTrailingTwelveMonths"),
    real("eps_forward", "epsForward"),
    // Analysts
    real("target_high_price", "targetHighPrice"),
    real("target_low_price", "targetLowPrice"),
    real("target_mean_price", "targetMeanPrice"),
    real("target_median_price", "targetMedianPrice"),
    real("recommendation_mean", "recommendationMean"),
    text_field("recommendation_key", "recommendationKey"),
    integer("number_of_analyst_opinions", "numberOfAnalystOpinions"),
    text_field("average_analyst_rating", "averageAnalystRating"),
    // Exchange
    text_field("exchange", "exchange"),
    text_field("full_exchange_name", "fullExchangeName"),
    text_field("market", "market"),
    text_field("market_state", "marketState"),
    text_field("quote_type", "quoteType"),
    flag_field("tradeable", "tradeable"),
    text_field("exchange_timezone_name", "exchangeTimezoneName"),
    text_field("exchange_timezone_short_name", "exchangeTimezoneShortName"),
    real("gmt_off_set_milliseconds", "gmtOffSetMilliseconds"),
    timestamp("regular_market_time", "regularMarketTime"),
    // Governance risk
    integer("audit_risk", "auditRisk"),
    integer("board_risk", "boardRisk"),
    integer("compensation_risk", "compensationRisk"),
    integer("shareholder_rights_risk", "shareHolderRightsRisk"),
    integer("overall_risk", "overallRisk"),
    // Fiscal calendar
    timestamp("last_fiscal_year_end", "lastFiscalYearEnd"),
    timestamp("next_fiscal_year_end", "nextFiscalYearEnd"),
    timestamp("most_recent_quarter", "mostRecentQuarter"),
    timestamp("earnings_timestamp", "earningsTimestamp"),
    timestamp("earnings_timestamp_start", "earningsTimestampStart"),
    timestamp("earnings_timestamp_end", "earningsTimestampEnd"),
    flag_field("is_earnings_date_estimate", "isEarningsDateEstimate"),
];

/// Flatten the quoteSummary modules and overlay the v7 quote
pub fn merge_info(summary: &Value, quote: &Value) -> Value {
    let mut info = Map::new();

    for module in INFO_MODULES {
        if let Some(fields) = summary[*module].as_object() {
            for (key, value) in fields {
                if key == "maxAge" || value.is_null() {
                    continue;
                }
                info.insert(key.clone(), value.clone());
            }
        }
    }

    if let Some(fields) = quote.as_object() {
        for (key, value) in fields {
            if !value.is_null() {
                info.insert(key.clone(), value.clone());
            }
        }
    }

    Value::Object(info)
}

/// `stock_info` row; `None` when the merged map is empty
pub fn stock_info_row(symbol: &str, info: &Value) -> Option<Row> {
    if info.as_object().map_or(true, Map::is_empty) {
        return None;
    }

    let mut row = Row::new().with("symbol", symbol);
    fields::apply(&mut row, info, INFO_FIELDS);
    Some(row)
}

pub async fn insert_stock_info(ingestor: &Ingestor, symbol: &str) -> Result<UpsertStats> {
    let summary = ingestor.yahoo().quote_summary(symbol, INFO_MODULES).await?;

    let quote = match ingestor.yahoo().quote(symbol).await {
        Ok(quote) => quote,
        Err(e) => {
            warn!(symbol, error = %e, "Quote request failed, storing summary fields only");
            Value::Null
        }
    };

    match stock_info_row(symbol, &merge_info(&summary, &quote)) {
        Some(row) => ingestor.db().upsert(Table::StockInfo, &[row]).await,
        None => {
            debug!(symbol, "No stock info found");
            Ok(UpsertStats::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use yfdb_common::db::Value as Cell;

    fn summary() -> Value {
        json!({
            "assetProfile": {
                "address1": "1 Toyota-Cho",
                "city": "Toyota",
                "zip": "471-8571",
                "fullTimeEmployees": 380793,
                "auditRisk": 4,
                "maxAge": 86400
            },
            "summaryDetail": {
                "previousClose": {"raw": 3540.0, "fmt": "3,540.00"},
                "open": {"raw": 3520.0, "fmt": "3,520.00"},
                "exDividendDate": {"raw": 1_711_843_200, "fmt": "2024-03-31"},
                "tradeable": false,
                "currency": "JPY"
            },
            "defaultKeyStatistics": {
                "52WeekChange": {"raw": 0.25, "fmt": "25.00%"},
                "sharesOutstanding": {"raw": 13_000_000_000_i64}
            },
            "price": {
                "regularMarketPrice": {"raw": 3540.0},
                "exchange": "JPX"
            }
        })
    }

    #[test]
    fn test_info_fields_unique() {
        let mut columns: Vec<&str> = INFO_FIELDS.iter().map(|f| f.column).collect();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), INFO_FIELDS.len());
    }

    #[test]
    fn test_merge_info_quote_overrides_summary() {
        let quote = json!({"regularMarketPrice": 3550.0, "marketState": "CLOSED", "allTimeHigh": null});
        let info = merge_info(&summary(), &quote);

        assert_eq!(info["regularMarketPrice"], json!(3550.0));
        assert_eq!(info["marketState"], json!("CLOSED"));
        assert!(info.get("maxAge").is_none());
        assert!(info.get("allTimeHigh").is_none());
    }

    #[test]
    fn test_stock_info_row_kinds() {
        let info = merge_info(&summary(), &Value::Null);
        let row = stock_info_row("7203.T", &info).unwrap();

        assert_eq!(row.get("symbol"), Some(&Cell::Text("7203.T".to_string())));
        assert_eq!(row.get("zip_code"), Some(&Cell::Text("471-8571".to_string())));
        assert_eq!(row.get("full_time_employees"), Some(&Cell::Integer(380_793)));
        assert_eq!(row.get("open_price"), Some(&Cell::Real(3520.0)));
        assert_eq!(row.get("fifty_two_week_change"), Some(&Cell::Real(0.25)));
        assert_eq!(row.get("audit_risk"), Some(&Cell::Integer(4)));
        assert_eq!(row.get("tradeable"), Some(&Cell::Text("false".to_string())));
        assert_eq!(
            row.get("ex_dividend_date"),
            Some(&Cell::Text("2024-03-31T00:00:00".to_string()))
        );
        assert_eq!(row.get("forward_pe"), Some(&Cell::Null));
        assert_eq!(row.len(), INFO_FIELDS.len() + 1);
    }

    #[test]
    fn test_empty_info_yields_no_row() {
        let info = merge_info(&json!({}), &Value::Null);
        assert!(stock_info_row("7203.T", &info).is_none());
    }
}
