//! Raw response dumps
//!
//! `sample <symbol>` saves the Yahoo Finance payloads each dataset reads, one
//! pretty-printed `<dataset>.json` per dataset, for inspecting field names
//! and building test fixtures.

use crate::error::Result;
use crate::ingest::calendar::CALENDAR_MODULES;
use crate::ingest::estimates::ESTIMATE_MODULES;
use crate::ingest::history::{DAILY_CHART, EVENTS_CHART, MINUTE_CHART};
use crate::ingest::holders::Ownership;
use crate::ingest::statements::{timeseries_types, Statement, TIMESERIES_START};
use crate::ingest::Dataset;
use crate::services::{YahooClient, INFO_MODULES};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use yfdb_common::time;

/// Payload read by one dataset; datasets with two sources get an object
/// keyed by source
pub async fn fetch_raw(yahoo: &YahooClient, dataset: Dataset, symbol: &str) -> Result<Value> {
    let value = match dataset {
        Dataset::Info => {
            let mut sources = Map::new();
            sources.insert("quote_summary".into(), yahoo.quote_summary(symbol, INFO_MODULES).await?);
            sources.insert("quote".into(), yahoo.quote(symbol).await?);
            Value::Object(sources)
        }
        Dataset::FastInfo => {
            let (range, interval) = DAILY_CHART;
            let mut sources = Map::new();
            sources.insert("chart".into(), yahoo.chart(symbol, range, interval).await?);
            sources.insert("quote".into(), yahoo.quote(symbol).await?);
            Value::Object(sources)
        }
        Dataset::History => yahoo.chart(symbol, DAILY_CHART.0, DAILY_CHART.1).await?,
        Dataset::History1Min => yahoo.chart(symbol, MINUTE_CHART.0, MINUTE_CHART.1).await?,
        Dataset::Dividends | Dataset::Actions => {
            yahoo.chart(symbol, EVENTS_CHART.0, EVENTS_CHART.1).await?
        }
        Dataset::BalanceSheet => statement_raw(yahoo, symbol, Statement::BalanceSheet).await?,
        Dataset::CashFlow => statement_raw(yahoo, symbol, Statement::CashFlow).await?,
        Dataset::IncomeStatement => statement_raw(yahoo, symbol, Statement::IncomeStatement).await?,
        Dataset::Financials => statement_raw(yahoo, symbol, Statement::Financials).await?,
        Dataset::Calendar => yahoo.quote_summary(symbol, CALENDAR_MODULES).await?,
        Dataset::EarningsDates => {
            yahoo
                .earnings_calendar(symbol, yahoo.settings().earnings_dates_limit)
                .await?
        }
        Dataset::EarningsHistory => yahoo.quote_summary(symbol, &["earningsHistory"]).await?,
        Dataset::EarningsEstimate
        | Dataset::RevenueEstimate
        | Dataset::EpsTrend
        | Dataset::EpsRevisions
        | Dataset::GrowthEstimates => yahoo.quote_summary(symbol, ESTIMATE_MODULES).await?,
        Dataset::Recommendations => yahoo.quote_summary(symbol, &["recommendationTrend"]).await?,
        Dataset::MajorHolders => yahoo.quote_summary(symbol, &["majorHoldersBreakdown"]).await?,
        Dataset::InstitutionalHolders => {
            yahoo
                .quote_summary(symbol, &[Ownership::Institutional.module()])
                .await?
        }
        Dataset::MutualfundHolders => {
            yahoo
                .quote_summary(symbol, &[Ownership::MutualFund.module()])
                .await?
        }
        Dataset::InsiderPurchases => {
            yahoo
                .quote_summary(symbol, &["netSharePurchaseActivity"])
                .await?
        }
        Dataset::News => yahoo.news(symbol, yahoo.settings().news_count).await?,
        Dataset::Sustainability => yahoo.quote_summary(symbol, &["esgScores"]).await?,
    };
    Ok(value)
}

/// Timeseries payloads keyed by period
async fn statement_raw(yahoo: &YahooClient, symbol: &str, statement: Statement) -> Result<Value> {
    let mut periods = Map::new();
    for period in statement.periods(yahoo.settings().quarterly_statements) {
        let types = timeseries_types(statement.fields(), period);
        let payload = yahoo
            .timeseries(symbol, &types, TIMESERIES_START, time::now().timestamp())
            .await?;
        periods.insert(period.as_str().to_string(), payload);
    }
    Ok(Value::Object(periods))
}

/// `<out>/<dataset>.json`
pub fn sample_path(out: &Path, dataset: Dataset) -> PathBuf {
    out.join(format!("{}.json", dataset.as_str()))
}

/// Write one file per dataset; a failing dataset is logged and skipped
pub async fn write_samples(
    yahoo: &YahooClient,
    symbol: &str,
    datasets: &[Dataset],
    out: &Path,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(out).await?;
    let mut written = Vec::new();

    for &dataset in datasets {
        let value = match fetch_raw(yahoo, dataset, symbol).await {
            Ok(value) => value,
            Err(e) => {
                warn!(symbol, dataset = dataset.as_str(), error = %e, "Sample fetch failed");
                continue;
            }
        };

        let path = sample_path(out, dataset);
        let json = serde_json::to_string_pretty(&value)?;
        tokio::fs::write(&path, json).await?;
        info!(symbol, dataset = dataset.as_str(), path = %path.display(), "Wrote sample");
        written.push(path);
    }

    Ok(written)
}
