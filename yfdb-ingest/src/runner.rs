//! Scheduled ingestion over a symbol universe
//!
//! Symbols run one after another with a short pause between them; datasets
//! of one symbol run in schedule order. A failing dataset is recorded in
//! the [`RunReport`] and the run moves on.

use crate::config::RunnerSettings;
use crate::ingest::{Dataset, Ingestor};
use clap::ValueEnum;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use yfdb_common::db::UpsertStats;

/// Named dataset lists run by the scheduled commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Schedule {
    /// Profile and price bars
    Daily,
    /// Summary, events, analyst and holder data
    Weekly,
    /// Financial statements and ESG scores
    Yearly,
    /// Every dataset
    All,
}

const DAILY: &[Dataset] = &[Dataset::Info, Dataset::History, Dataset::History1Min];

const WEEKLY: &[Dataset] = &[
    Dataset::Info,
    Dataset::FastInfo,
    Dataset::Calendar,
    Dataset::News,
    Dataset::Recommendations,
    Dataset::EarningsEstimate,
    Dataset::RevenueEstimate,
    Dataset::EpsTrend,
    Dataset::EpsRevisions,
    Dataset::GrowthEstimates,
    Dataset::MajorHolders,
    Dataset::InstitutionalHolders,
    Dataset::MutualfundHolders,
    Dataset::InsiderPurchases,
    Dataset::EarningsDates,
    Dataset::EarningsHistory,
    Dataset::Dividends,
    Dataset::Actions,
];

const YEARLY: &[Dataset] = &[
    Dataset::BalanceSheet,
    Dataset::CashFlow,
    Dataset::IncomeStatement,
    Dataset::Financials,
    Dataset::Sustainability,
];

impl Schedule {
    pub fn datasets(self) -> &'static [Dataset] {
        match self {
            Schedule::Daily => DAILY,
            Schedule::Weekly => WEEKLY,
            Schedule::Yearly => YEARLY,
            Schedule::All => &Dataset::ALL,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Schedule::Daily => "daily",
            Schedule::Weekly => "weekly",
            Schedule::Yearly => "yearly",
            Schedule::All => "all",
        }
    }
}

/// One failed step of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    pub symbol: String,
    /// `None` when the symbol could not be registered at all
    pub dataset: Option<Dataset>,
    pub message: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let step = self.dataset.map_or("stock_info", Dataset::as_str);
        write!(f, "{} {}: {}", self.symbol, step, self.message)
    }
}

/// Outcome of one run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Symbols attempted
    pub symbols: usize,
    /// Rows written per dataset
    pub rows: BTreeMap<Dataset, UpsertStats>,
    /// Failures, in the order they happened
    pub errors: Vec<RunError>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Rows inserted or updated across all datasets
    pub fn processed(&self) -> usize {
        self.rows.values().map(UpsertStats::processed).sum()
    }

    pub fn processed_for(&self, dataset: Dataset) -> usize {
        self.rows.get(&dataset).map_or(0, UpsertStats::processed)
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Log the summary, one line per dataset and per error
    pub fn log(&self) {
        for (dataset, stats) in &self.rows {
            info!(
                dataset = dataset.as_str(),
                inserted = stats.inserted,
                updated = stats.updated,
                "Dataset totals"
            );
        }
        for error in &self.errors {
            warn!("{}", error);
        }
        info!(
            symbols = self.symbols,
            processed = self.processed(),
            errors = self.errors.len(),
            elapsed_ms = self.elapsed.as_millis() as u64,
            "Run complete"
        );
    }
}

/// Runs datasets over symbols
pub struct IngestRunner {
    ingestor: Ingestor,
    symbol_delay: Duration,
}

impl IngestRunner {
    pub fn new(ingestor: Ingestor, settings: &RunnerSettings) -> Self {
        Self {
            ingestor,
            symbol_delay: Duration::from_millis(settings.symbol_delay_ms),
        }
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Ingest every dataset for every symbol, collecting failures
    pub async fn run(&self, symbols: &[String], datasets: &[Dataset]) -> RunReport {
        let start = Instant::now();
        let mut report = RunReport::default();

        info!(
            symbols = symbols.len(),
            datasets = datasets.len(),
            "Starting ingestion run"
        );

        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 && !self.symbol_delay.is_zero() {
                tokio::time::sleep(self.symbol_delay).await;
            }
            report.symbols += 1;

            if let Err(e) = self.ingestor.db().ensure_stock(symbol).await {
                warn!(symbol = %symbol, error = %e, "Cannot register symbol, skipping");
                report.errors.push(RunError {
                    symbol: symbol.clone(),
                    dataset: None,
                    message: e.to_string(),
                });
                continue;
            }

            for &dataset in datasets {
                match self.ingestor.ingest(dataset, symbol).await {
                    Ok(stats) => {
                        *report.rows.entry(dataset).or_default() += stats;
                    }
                    Err(e) => {
                        warn!(symbol = %symbol, dataset = dataset.as_str(), error = %e, "Dataset failed");
                        report.errors.push(RunError {
                            symbol: symbol.clone(),
                            dataset: Some(dataset),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        report.elapsed = start.elapsed();
        report
    }
}
