//! Table definitions for every dataset
//!
//! Single source of truth for the ingest schema. Column lists of the wide
//! tables (profile, statements, ESG) are generated from the same field maps
//! the transforms use, so a mapped column always exists in the table.

use crate::ingest::fields::Field;
use crate::ingest::statements::Statement;
use crate::ingest::{holders, stock_info, sustainability};
use std::sync::OnceLock;
use yfdb_common::db::{ColumnDefinition, TableDefinition};

/// Every table, parents first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    StockInfo,
    FastInfo,
    History,
    History1Min,
    Dividends,
    Actions,
    BalanceSheets,
    CashFlows,
    IncomeStatements,
    Financials,
    Calendars,
    EarningsDates,
    EarningsHistory,
    EarningsEstimates,
    RevenueEstimates,
    EpsTrends,
    EpsRevisions,
    GrowthEstimates,
    Recommendations,
    MajorHolders,
    InstitutionalHolders,
    MutualfundHolders,
    InsiderPurchases,
    News,
    Sustainability,
}

impl Table {
    /// Creation order; `stock_info` first since every other table references it
    pub const ALL: [Table; 25] = [
        Table::StockInfo,
        Table::FastInfo,
        Table::History,
        Table::History1Min,
        Table::Dividends,
        Table::Actions,
        Table::BalanceSheets,
        Table::CashFlows,
        Table::IncomeStatements,
        Table::Financials,
        Table::Calendars,
        Table::EarningsDates,
        Table::EarningsHistory,
        Table::EarningsEstimates,
        Table::RevenueEstimates,
        Table::EpsTrends,
        Table::EpsRevisions,
        Table::GrowthEstimates,
        Table::Recommendations,
        Table::MajorHolders,
        Table::InstitutionalHolders,
        Table::MutualfundHolders,
        Table::InsiderPurchases,
        Table::News,
        Table::Sustainability,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Table::StockInfo => "stock_info",
            Table::FastInfo => "fast_info",
            Table::History => "history",
            Table::History1Min => "history_1min",
            Table::Dividends => "dividends",
            Table::Actions => "actions",
            Table::BalanceSheets => "balancesheets",
            Table::CashFlows => "cash_flows",
            Table::IncomeStatements => "income_statements",
            Table::Financials => "financials",
            Table::Calendars => "calendars",
            Table::EarningsDates => "earnings_dates",
            Table::EarningsHistory => "earnings_history",
            Table::EarningsEstimates => "earnings_estimates",
            Table::RevenueEstimates => "revenue_estimates",
            Table::EpsTrends => "eps_trends",
            Table::EpsRevisions => "eps_revisions",
            Table::GrowthEstimates => "growth_estimates",
            Table::Recommendations => "recommendations",
            Table::MajorHolders => "major_holders",
            Table::InstitutionalHolders => "institutional_holders",
            Table::MutualfundHolders => "mutualfund_holders",
            Table::InsiderPurchases => "insider_purchases",
            Table::News => "news",
            Table::Sustainability => "sustainability",
        }
    }

    pub fn definition(self) -> &'static TableDefinition {
        &all_definitions()[self as usize]
    }
}

/// Definitions of [`Table::ALL`], in the same order
pub fn all_definitions() -> &'static [TableDefinition] {
    static DEFINITIONS: OnceLock<Vec<TableDefinition>> = OnceLock::new();
    DEFINITIONS.get_or_init(|| Table::ALL.iter().map(|t| build(*t)).collect())
}

fn symbol_ref() -> ColumnDefinition {
    ColumnDefinition::new("symbol", "TEXT")
        .not_null()
        .references("stock_info(symbol)")
}

fn key_text(name: &str) -> ColumnDefinition {
    ColumnDefinition::new(name, "TEXT").not_null()
}

fn real(name: &str) -> ColumnDefinition {
    ColumnDefinition::new(name, "REAL")
}

fn integer(name: &str) -> ColumnDefinition {
    ColumnDefinition::new(name, "INTEGER")
}

fn text(name: &str) -> ColumnDefinition {
    ColumnDefinition::new(name, "TEXT")
}

fn mapped(fields: &[Field]) -> Vec<ColumnDefinition> {
    fields
        .iter()
        .map(|f| ColumnDefinition::new(f.column, f.kind.sql_type()))
        .collect()
}

fn price_table(name: &str) -> TableDefinition {
    TableDefinition::with_id(name, &["symbol", "date"])
        .column(symbol_ref())
        .column(key_text("date"))
        .columns(["open", "high", "low", "close"].map(real))
        .column(integer("volume"))
}

fn statement_table(statement: Statement) -> TableDefinition {
    let key: &[&str] = if statement.has_period_type() {
        &["symbol", "date", "period_type"]
    } else {
        &["symbol", "date"]
    };
    let mut table = TableDefinition::with_id(statement.table().name(), key)
        .column(symbol_ref())
        .column(key_text("date"));
    if statement.has_period_type() {
        table = table.column(key_text("period_type"));
    }
    table.columns(statement.fields().iter().map(|f| real(f.column)))
}

fn estimate_table(name: &str) -> TableDefinition {
    TableDefinition::with_id(name, &["symbol", "period_type"])
        .column(symbol_ref())
        .column(integer("year"))
        .column(key_text("period_type"))
}

fn holder_table(name: &str) -> TableDefinition {
    TableDefinition::with_id(name, &["symbol", "date", "holder"])
        .column(symbol_ref())
        .column(key_text("date"))
        .column(key_text("holder"))
        .columns(["pct_held", "shares", "value", "pct_change"].map(real))
}

fn build(table: Table) -> TableDefinition {
    let definition = match table {
        Table::StockInfo => TableDefinition::with_id(table.name(), &["symbol"])
            .column(ColumnDefinition::new("symbol", "TEXT").not_null().unique())
            .columns(mapped(stock_info::INFO_FIELDS)),

        Table::FastInfo => TableDefinition::with_id(table.name(), &["symbol"])
            .column(symbol_ref())
            .columns(["currency", "exchange", "quote_type", "timezone"].map(text))
            .columns(
                [
                    "last_price",
                    "open_price",
                    "previous_close",
                    "regular_market_previous_close",
                    "day_high",
                    "day_low",
                    "year_high",
                    "year_low",
                    "year_change",
                ]
                .map(real),
            )
            .column(integer("last_volume"))
            .columns(
                [
                    "ten_day_average_volume",
                    "three_month_average_volume",
                    "fifty_day_average",
                    "two_hundred_day_average",
                    "market_cap",
                ]
                .map(real),
            )
            .column(integer("shares")),

        Table::History | Table::History1Min => price_table(table.name()),

        Table::Dividends => TableDefinition::with_id(table.name(), &["symbol", "date"])
            .column(symbol_ref())
            .column(key_text("date"))
            .column(real("dividends")),

        Table::Actions => TableDefinition::with_id(table.name(), &["symbol", "date"])
            .column(symbol_ref())
            .column(key_text("date"))
            .column(real("dividends"))
            .column(real("stock_splits")),

        Table::BalanceSheets => statement_table(Statement::BalanceSheet),
        Table::CashFlows => statement_table(Statement::CashFlow),
        Table::IncomeStatements => statement_table(Statement::IncomeStatement),
        Table::Financials => statement_table(Statement::Financials),

        Table::Calendars => TableDefinition::with_id(table.name(), &["symbol"])
            .column(symbol_ref())
            .columns(["ex_dividend_date", "earnings_date"].map(text))
            .columns(
                [
                    "earnings_high",
                    "earnings_low",
                    "earnings_average",
                    "revenue_high",
                    "revenue_low",
                    "revenue_average",
                ]
                .map(real),
            )
            .columns(
                [
                    "dividend_payment_date",
                    "fiscal_year_end",
                    "data_source",
                    "last_updated",
                ]
                .map(text),
            ),

        Table::EarningsDates => TableDefinition::with_id(table.name(), &["symbol", "date"])
            .column(symbol_ref())
            .column(key_text("date"))
            .columns(["eps_estimate", "reported_eps", "surprise_percent"].map(real)),

        Table::EarningsHistory => TableDefinition::with_id(table.name(), &["symbol", "date"])
            .column(symbol_ref())
            .column(key_text("date"))
            .columns(["eps_actual", "eps_estimate", "eps_difference", "surprise_percent"].map(real)),

        Table::EarningsEstimates => estimate_table(table.name())
            .columns(["avg_estimate", "low_estimate", "high_estimate", "year_ago_eps"].map(real))
            .column(integer("number_of_analysts"))
            .column(real("growth_rate")),

        Table::RevenueEstimates => estimate_table(table.name())
            .columns(["avg", "low", "high"].map(real))
            .column(integer("number_of_analysts"))
            .columns(["year_ago_revenue", "growth"].map(real)),

        Table::EpsTrends => estimate_table(table.name()).columns(
            ["current", "days_ago_7", "days_ago_30", "days_ago_60", "days_ago_90"].map(real),
        ),

        Table::EpsRevisions => estimate_table(table.name()).columns(
            [
                "up_last_7days",
                "up_last_30days",
                "down_last_7days",
                "down_last_30days",
            ]
            .map(|name| integer(name).default("0")),
        ),

        Table::GrowthEstimates => {
            estimate_table(table.name()).columns(["stock_trend", "index_trend"].map(real))
        }

        Table::Recommendations => TableDefinition::with_id(table.name(), &["symbol", "period"])
            .column(symbol_ref())
            .column(key_text("period"))
            .columns(
                [
                    "strong_buy",
                    "buy",
                    "hold",
                    "sell",
                    "strong_sell",
                    "total_analysts",
                ]
                .map(integer),
            ),

        Table::MajorHolders => TableDefinition::with_id(table.name(), &["symbol"])
            .column(symbol_ref())
            .columns(mapped(holders::MAJOR_HOLDER_FIELDS)),

        Table::InstitutionalHolders | Table::MutualfundHolders => holder_table(table.name()),

        Table::InsiderPurchases => {
            TableDefinition::with_id(table.name(), &["symbol", "insider_purchases_last_6m"])
                .column(symbol_ref())
                .column(key_text("insider_purchases_last_6m"))
                .column(real("shares"))
                .column(integer("trans"))
        }

        Table::News => TableDefinition::new(table.name(), &["id"])
            .column(ColumnDefinition::new("id", "TEXT").primary_key())
            .column(symbol_ref())
            .columns(
                [
                    "content_type",
                    "title",
                    "description",
                    "summary",
                    "pub_date",
                    "display_time",
                    "provider_name",
                    "provider_url",
                    "canonical_url",
                    "site",
                    "region",
                    "lang",
                    "click_through_url",
                    "preview_url",
                    "is_hosted",
                    "bypass_modal",
                    "editors_pick",
                    "is_premium_news",
                    "is_premium_free_news",
                ]
                .map(text),
            )
            .insert_only(&["symbol"])
            .keep_on_null(),

        Table::Sustainability => TableDefinition::with_id(table.name(), &["symbol"])
            .column(symbol_ref())
            .columns(mapped(sustainability::SCORE_FIELDS))
            .columns(sustainability::peer_range_columns().iter().map(|c| real(c)))
            .column(text("related_controversy"))
            .columns(mapped(sustainability::INVOLVEMENT_FIELDS)),
    };

    definition.with_timestamps()
}
