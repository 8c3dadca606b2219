//! Dataset ingesters
//!
//! Each dataset fetches one Yahoo Finance resource for one symbol, converts
//! it to rows with a pure transform and upserts the rows by the table's
//! natural key.

pub mod calendar;
pub mod chart;
pub mod earnings;
pub mod estimates;
pub mod fast_info;
pub mod fields;
pub mod history;
pub mod holders;
pub mod json;
pub mod news;
pub mod recommendations;
pub mod statements;
pub mod stock_info;
pub mod sustainability;

use crate::db::{Database, Table};
use crate::error::{IngestError, Result};
use crate::services::YahooClient;
use clap::ValueEnum;
use estimates::Estimate;
use holders::Ownership;
use statements::Statement;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use yfdb_common::db::UpsertStats;

/// One Yahoo Finance data family, stored in one table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Dataset {
    #[value(name = "info")]
    Info,
    #[value(name = "fast_info")]
    FastInfo,
    #[value(name = "history")]
    History,
    #[value(name = "history_1m")]
    History1Min,
    #[value(name = "dividends")]
    Dividends,
    #[value(name = "actions")]
    Actions,
    #[value(name = "balancesheet")]
    BalanceSheet,
    #[value(name = "cashflow")]
    CashFlow,
    #[value(name = "income_stmt")]
    IncomeStatement,
    #[value(name = "financials")]
    Financials,
    #[value(name = "calendar")]
    Calendar,
    #[value(name = "earnings_dates")]
    EarningsDates,
    #[value(name = "earnings_history")]
    EarningsHistory,
    #[value(name = "earnings_estimate")]
    EarningsEstimate,
    #[value(name = "revenue_estimate")]
    RevenueEstimate,
    #[value(name = "eps_trend")]
    EpsTrend,
    #[value(name = "eps_revisions")]
    EpsRevisions,
    #[value(name = "growth_estimates")]
    GrowthEstimates,
    #[value(name = "recommendations")]
    Recommendations,
    #[value(name = "major_holders")]
    MajorHolders,
    #[value(name = "institutional_holders")]
    InstitutionalHolders,
    #[value(name = "mutualfund_holders")]
    MutualfundHolders,
    #[value(name = "insider_purchases")]
    InsiderPurchases,
    #[value(name = "news")]
    News,
    #[value(name = "sustainability")]
    Sustainability,
}

impl Dataset {
    pub const ALL: [Dataset; 25] = [
        Dataset::Info,
        Dataset::FastInfo,
        Dataset::History,
        Dataset::History1Min,
        Dataset::Dividends,
        Dataset::Actions,
        Dataset::BalanceSheet,
        Dataset::CashFlow,
        Dataset::IncomeStatement,
        Dataset::Financials,
        Dataset::Calendar,
        Dataset::EarningsDates,
        Dataset::EarningsHistory,
        Dataset::EarningsEstimate,
        Dataset::RevenueEstimate,
        Dataset::EpsTrend,
        Dataset::EpsRevisions,
        Dataset::GrowthEstimates,
        Dataset::Recommendations,
        Dataset::MajorHolders,
        Dataset::InstitutionalHolders,
        Dataset::MutualfundHolders,
        Dataset::InsiderPurchases,
        Dataset::News,
        Dataset::Sustainability,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Dataset::Info => "info",
            Dataset::FastInfo => "fast_info",
            Dataset::History => "history",
            Dataset::History1Min => "history_1m",
            Dataset::Dividends => "dividends",
            Dataset::Actions => "actions",
            Dataset::BalanceSheet => "balancesheet",
            Dataset::CashFlow => "cashflow",
            Dataset::IncomeStatement => "income_stmt",
            Dataset::Financials => "financials",
            Dataset::Calendar => "calendar",
            Dataset::EarningsDates => "earnings_dates",
            Dataset::EarningsHistory => "earnings_history",
            Dataset::EarningsEstimate => "earnings_estimate",
            Dataset::RevenueEstimate => "revenue_estimate",
            Dataset::EpsTrend => "eps_trend",
            Dataset::EpsRevisions => "eps_revisions",
            Dataset::GrowthEstimates => "growth_estimates",
            Dataset::Recommendations => "recommendations",
            Dataset::MajorHolders => "major_holders",
            Dataset::InstitutionalHolders => "institutional_holders",
            Dataset::MutualfundHolders => "mutualfund_holders",
            Dataset::InsiderPurchases => "insider_purchases",
            Dataset::News => "news",
            Dataset::Sustainability => "sustainability",
        }
    }

    /// Table written by this dataset
    pub fn table(self) -> Table {
        match self {
            Dataset::Info => Table::StockInfo,
            Dataset::FastInfo => Table::FastInfo,
            Dataset::History => Table::History,
            Dataset::History1Min => Table::History1Min,
            Dataset::Dividends => Table::Dividends,
            Dataset::Actions => Table::Actions,
            Dataset::BalanceSheet => Table::BalanceSheets,
            Dataset::CashFlow => Table::CashFlows,
            Dataset::IncomeStatement => Table::IncomeStatements,
            Dataset::Financials => Table::Financials,
            Dataset::Calendar => Table::Calendars,
            Dataset::EarningsDates => Table::EarningsDates,
            Dataset::EarningsHistory => Table::EarningsHistory,
            Dataset::EarningsEstimate => Table::EarningsEstimates,
            Dataset::RevenueEstimate => Table::RevenueEstimates,
            Dataset::EpsTrend => Table::EpsTrends,
            Dataset::EpsRevisions => Table::EpsRevisions,
            Dataset::GrowthEstimates => Table::GrowthEstimates,
            Dataset::Recommendations => Table::Recommendations,
            Dataset::MajorHolders => Table::MajorHolders,
            Dataset::InstitutionalHolders => Table::InstitutionalHolders,
            Dataset::MutualfundHolders => Table::MutualfundHolders,
            Dataset::InsiderPurchases => Table::InsiderPurchases,
            Dataset::News => Table::News,
            Dataset::Sustainability => Table::Sustainability,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dataset {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Dataset::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| IngestError::InvalidInput(format!("unknown dataset: {}", name)))
    }
}

/// Shared context of the dataset ingesters
#[derive(Clone)]
pub struct Ingestor {
    yahoo: Arc<YahooClient>,
    db: Database,
}

impl Ingestor {
    pub fn new(yahoo: Arc<YahooClient>, db: Database) -> Self {
        Self { yahoo, db }
    }

    pub fn yahoo(&self) -> &YahooClient {
        &self.yahoo
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Fetch and store one dataset for one symbol
    pub async fn ingest(&self, dataset: Dataset, symbol: &str) -> Result<UpsertStats> {
        let start = Instant::now();

        let stats = match dataset {
            Dataset::Info => stock_info::insert_stock_info(self, symbol).await?,
            Dataset::FastInfo => fast_info::insert_stock_fast_info(self, symbol).await?,
            Dataset::History => history::insert_stock_history(self, symbol).await?,
            Dataset::History1Min => history::insert_stock_history_1min(self, symbol).await?,
            Dataset::Dividends => history::insert_stock_dividends(self, symbol).await?,
            Dataset::Actions => history::insert_stock_actions(self, symbol).await?,
            Dataset::BalanceSheet => {
                statements::insert_statement(self, symbol, Statement::BalanceSheet).await?
            }
            Dataset::CashFlow => statements::insert_statement(self, symbol, Statement::CashFlow).await?,
            Dataset::IncomeStatement => {
                statements::insert_statement(self, symbol, Statement::IncomeStatement).await?
            }
            Dataset::Financials => {
                statements::insert_statement(self, symbol, Statement::Financials).await?
            }
            Dataset::Calendar => calendar::insert_stock_calendar(self, symbol).await?,
            Dataset::EarningsDates => earnings::insert_stock_earnings_dates(self, symbol).await?,
            Dataset::EarningsHistory => earnings::insert_stock_earnings_history(self, symbol).await?,
            Dataset::EarningsEstimate => {
                estimates::insert_estimate(self, symbol, Estimate::Earnings).await?
            }
            Dataset::RevenueEstimate => estimates::insert_estimate(self, symbol, Estimate::Revenue).await?,
            Dataset::EpsTrend => estimates::insert_estimate(self, symbol, Estimate::EpsTrend).await?,
            Dataset::EpsRevisions => {
                estimates::insert_estimate(self, symbol, Estimate::EpsRevisions).await?
            }
            Dataset::GrowthEstimates => estimates::insert_stock_growth_estimates(self, symbol).await?,
            Dataset::Recommendations => {
                recommendations::insert_stock_recommendations(self, symbol).await?
            }
            Dataset::MajorHolders => holders::insert_stock_major_holders(self, symbol).await?,
            Dataset::InstitutionalHolders => {
                holders::insert_holders(self, symbol, Ownership::Institutional).await?
            }
            Dataset::MutualfundHolders => {
                holders::insert_holders(self, symbol, Ownership::MutualFund).await?
            }
            Dataset::InsiderPurchases => holders::insert_stock_insider_purchases(self, symbol).await?,
            Dataset::News => news::insert_stock_news(self, symbol).await?,
            Dataset::Sustainability => sustainability::insert_stock_sustainability(self, symbol).await?,
        };

        info!(
            symbol,
            dataset = dataset.as_str(),
            inserted = stats.inserted,
            updated = stats.updated,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Processed {} rows",
            stats.processed()
        );
        Ok(stats)
    }
}
