//! Financial statements from the fundamentals timeseries endpoint
//!
//! Each statement column maps to one or more timeseries keys; the first key
//! with a reported value for a period wins. Keys are requested with an
//! `annual` or `quarterly` prefix, and rows are keyed by the period's
//! `asOfDate`.

use super::json::{items, num};
use super::Ingestor;
use crate::db::schema::Table;
use crate::error::Result;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use yfdb_common::db::{Row, UpsertStats};
use yfdb_common::time;

/// First period requested (2016-12-31T00:00:00Z)
pub(crate) const TIMESERIES_START: i64 = 1_483_142_400;

/// One statement column and the timeseries keys that can fill it
#[derive(Debug, Clone, Copy)]
pub struct StatementField {
    pub column: &'static str,
    pub keys: &'static [&'static str],
}

const fn field(column: &'static str, keys: &'static [&'static str]) -> StatementField {
    StatementField { column, keys }
}

pub const BALANCE_SHEET_FIELDS: &[StatementField] = &[
    // Assets
    field("total_assets", &["TotalAssets"]),
    field("current_assets", &["CurrentAssets"]),
    field("non_current_assets", &["TotalNonCurrentAssets"]),
    field("cash_and_cash_equivalents", &["CashAndCashEquivalents"]),
    field("other_short_term_investments", &["OtherShortTermInvestments"]),
    field(
        "cash_cash_equivalents_and_short_term_investments",
        &["CashCashEquivalentsAndShortTermInvestments"],
    ),
    field("accounts_receivable", &["AccountsReceivable"]),
    field("gross_accounts_receivable", &["GrossAccountsReceivable"]),
    field("inventory", &["Inventory"]),
    field("other_current_assets", &["OtherCurrentAssets"]),
    field("net_ppe", &["NetPPE"]),
    field("gross_ppe", &["GrossPPE"]),
    field("land_and_improvements", &["LandAndImprovements"]),
    field("buildings_and_improvements", &["BuildingsAndImprovements"]),
    field("machinery_furniture_equipment", &["MachineryFurnitureEquipment"]),
    field("construction_in_progress", &["ConstructionInProgress"]),
    field("properties", &["Properties"]),
    field("goodwill_and_other_intangible_assets", &["GoodwillAndOtherIntangibleAssets"]),
    field("other_intangible_assets", &["OtherIntangibleAssets"]),
    field("investment_in_financial_assets", &["InvestmentinFinancialAssets"]),
    field("available_for_sale_securities", &["AvailableForSaleSecurities"]),
    field("non_current_deferred_taxes_assets", &["NonCurrentDeferredTaxesAssets"]),
    field("defined_pension_benefit", &["DefinedPensionBenefit"]),
    field("other_non_current_assets", &["OtherNonCurrentAssets"]),
    // Liabilities
    field(
        "total_liabilities_net_minority_interest",
        &["TotalLiabilitiesNetMinorityInterest"],
    ),
    field("current_liabilities", &["CurrentLiabilities"]),
    field(
        "total_non_current_liabilities_net_minority_interest",
        &["TotalNonCurrentLiabilitiesNetMinorityInterest"],
    ),
    field("accounts_payable", &["AccountsPayable"]),
    field("total_tax_payable", &["TotalTaxPayable"]),
    field("payables", &["Payables"]),
    field(
        "pension_and_other_post_retirement_benefit_plans_current",
        &["PensionandOtherPostRetirementBenefitPlansCurrent"],
    ),
    field("other_current_liabilities", &["OtherCurrentLiabilities"]),
    field("long_term_provisions", &["LongTermProvisions"]),
    field(
        "non_current_pension_and_other_postretirement_benefit_plans",
        &["NonCurrentPensionAndOtherPostretirementBenefitPlans"],
    ),
    field("other_non_current_liabilities", &["OtherNonCurrentLiabilities"]),
    // Equity
    field("stockholders_equity", &["StockholdersEquity"]),
    field("minority_interest", &["MinorityInterest"]),
    field("total_equity_gross_minority_interest", &["TotalEquityGrossMinorityInterest"]),
    field("total_capitalization", &["TotalCapitalization"]),
    field("common_stock_equity", &["CommonStockEquity"]),
    field("net_tangible_assets", &["NetTangibleAssets"]),
    field("working_capital", &["WorkingCapital"]),
    field("invested_capital", &["InvestedCapital"]),
    field("tangible_book_value", &["TangibleBookValue"]),
    // Shares and capital
    field("share_issued", &["ShareIssued"]),
    field("ordinary_shares_number", &["OrdinarySharesNumber"]),
    field("treasury_shares_number", &["TreasurySharesNumber"]),
    field("common_stock", &["CommonStock"]),
    field("capital_stock", &["CapitalStock"]),
    field("additional_paid_in_capital", &["AdditionalPaidInCapital"]),
    field("retained_earnings", &["RetainedEarnings"]),
    field("treasury_stock", &["TreasuryStock"]),
];

pub const CASH_FLOW_FIELDS: &[StatementField] = &[
    field("operating_cash_flow", &["OperatingCashFlow"]),
    field("investing_cash_flow", &["InvestingCashFlow"]),
    field("financing_cash_flow", &["FinancingCashFlow"]),
    field("free_cash_flow", &["FreeCashFlow"]),
    field("beginning_cash_position", &["BeginningCashPosition"]),
    field("end_cash_position", &["EndCashPosition"]),
    field("changes_in_cash", &["ChangesInCash"]),
    // Operating
    field(
        "net_income_from_continuing_operations",
        &["NetIncomeFromContinuingOperations"],
    ),
    field("depreciation_and_amortization", &["DepreciationAndAmortization"]),
    field("depreciation", &["Depreciation"]),
    field(
        "net_foreign_currency_exchange_gain_loss",
        &["NetForeignCurrencyExchangeGainLoss"],
    ),
    field("gain_loss_on_investment_securities", &["GainLossOnInvestmentSecurities"]),
    field("other_non_cash_items", &["OtherNonCashItems"]),
    field("change_in_working_capital", &["ChangeInWorkingCapital"]),
    field("change_in_receivables", &["ChangeInReceivables"]),
    field("change_in_inventory", &["ChangeInInventory"]),
    field("change_in_payable", &["ChangeInPayable"]),
    field("change_in_other_current_assets", &["ChangeInOtherCurrentAssets"]),
    field("change_in_other_current_liabilities", &["ChangeInOtherCurrentLiabilities"]),
    field("interest_paid_cfo", &["InterestPaidCFO"]),
    field("interest_received_cfo", &["InterestReceivedCFO"]),
    field("taxes_refund_paid", &["TaxesRefundPaid"]),
    // Investing
    field("capital_expenditure", &["CapitalExpenditure"]),
    field("purchase_of_ppe", &["PurchaseOfPPE"]),
    field("sale_of_ppe", &["SaleOfPPE"]),
    field("net_ppe_purchase_and_sale", &["NetPPEPurchaseAndSale"]),
    field("capital_expenditure_reported", &["CapitalExpenditureReported"]),
    field("purchase_of_investment", &["PurchaseOfInvestment"]),
    field("sale_of_investment", &["SaleOfInvestment"]),
    field("net_investment_purchase_and_sale", &["NetInvestmentPurchaseAndSale"]),
    field("net_other_investing_changes", &["NetOtherInvestingChanges"]),
    // Financing
    field("cash_dividends_paid", &["CashDividendsPaid"]),
    field("common_stock_dividend_paid", &["CommonStockDividendPaid"]),
    field("net_common_stock_issuance", &["NetCommonStockIssuance"]),
    field("common_stock_payments", &["CommonStockPayments"]),
    field("repurchase_of_capital_stock", &["RepurchaseOfCapitalStock"]),
    field("net_other_financing_charges", &["NetOtherFinancingCharges"]),
    field("effect_of_exchange_rate_changes", &["EffectOfExchangeRateChanges"]),
    field(
        "other_cash_adjustment_outside_change_in_cash",
        &["OtherCashAdjustmentOutsideChangeinCash"],
    ),
];

pub const INCOME_STATEMENT_FIELDS: &[StatementField] = &[
    field("total_revenue", &["TotalRevenue", "OperatingRevenue"]),
    field("operating_revenue", &["OperatingRevenue", "TotalRevenue"]),
    field("cost_of_revenue", &["CostOfRevenue"]),
    field("reconciled_cost_of_revenue", &["ReconciledCostOfRevenue"]),
    field("gross_profit", &["GrossProfit"]),
    field("operating_expense", &["OperatingExpense"]),
    field("operating_income", &["OperatingIncome"]),
    field("total_operating_income_as_reported", &["TotalOperatingIncomeAsReported"]),
    field("total_expenses", &["TotalExpenses"]),
    field("ebit", &["EBIT"]),
    field("ebitda", &["EBITDA"]),
    field("normalized_ebitda", &["NormalizedEBITDA"]),
    field("interest_income", &["InterestIncome"]),
    field("interest_expense", &["InterestExpense"]),
    field("net_interest_income", &["NetInterestIncome"]),
    field("interest_income_non_operating", &["InterestIncomeNonOperating"]),
    field("interest_expense_non_operating", &["InterestExpenseNonOperating"]),
    field(
        "net_non_operating_interest_income_expense",
        &["NetNonOperatingInterestIncomeExpense"],
    ),
    field("other_non_operating_income_expenses", &["OtherNonOperatingIncomeExpenses"]),
    field("special_income_charges", &["SpecialIncomeCharges"]),
    field("other_special_charges", &["OtherSpecialCharges"]),
    field("pretax_income", &["PretaxIncome"]),
    field("tax_provision", &["TaxProvision"]),
    field("net_income", &["NetIncome"]),
    field("net_income_common_stockholders", &["NetIncomeCommonStockholders"]),
    field("net_income_continuous_operations", &["NetIncomeContinuousOperations"]),
    field(
        "net_income_from_continuing_operation_net_minority_interest",
        &["NetIncomeFromContinuingOperationNetMinorityInterest"],
    ),
    field(
        "net_income_from_continuing_and_discontinued_operation",
        &["NetIncomeFromContinuingAndDiscontinuedOperation"],
    ),
    field(
        "net_income_including_noncontrolling_interests",
        &["NetIncomeIncludingNoncontrollingInterests"],
    ),
    field("normalized_income", &["NormalizedIncome"]),
    field("total_unusual_items", &["TotalUnusualItems"]),
    field("total_unusual_items_excluding_goodwill", &["TotalUnusualItemsExcludingGoodwill"]),
    field("tax_effect_of_unusual_items", &["TaxEffectOfUnusualItems"]),
    field("tax_rate_for_calcs", &["TaxRateForCalcs"]),
    field("reconciled_depreciation", &["ReconciledDepreciation"]),
    field("basic_average_shares", &["BasicAverageShares"]),
    field("diluted_average_shares", &["DilutedAverageShares"]),
    field("basic_eps", &["BasicEPS"]),
    field("diluted_eps", &["DilutedEPS"]),
    field(
        "diluted_ni_availto_com_stockholders",
        &["DilutedNIAvailtoComStockholders"],
    ),
    field("minority_interests", &["MinorityInterests"]),
    field("otherunder_preferred_stock_dividend", &["OtherunderPreferredStockDividend"]),
];

pub const FINANCIALS_FIELDS: &[StatementField] = &[
    field("total_revenue", &["TotalRevenue", "OperatingRevenue"]),
    field("operating_revenue", &["OperatingRevenue", "TotalRevenue"]),
    field("cost_of_revenue", &["CostOfRevenue", "ReconciledCostOfRevenue"]),
    field("reconciled_cost_of_revenue", &["ReconciledCostOfRevenue"]),
    field("gross_profit", &["GrossProfit"]),
    field("operating_expense", &["OperatingExpense"]),
    field("operating_income", &["OperatingIncome", "TotalOperatingIncomeAsReported"]),
    field("total_operating_income_as_reported", &["TotalOperatingIncomeAsReported"]),
    field("total_expenses", &["TotalExpenses"]),
    field("ebit", &["EBIT"]),
    field("ebitda", &["EBITDA"]),
    field("normalized_ebitda", &["NormalizedEBITDA"]),
    field("interest_income", &["InterestIncome"]),
    field("interest_expense", &["InterestExpense"]),
    field("net_interest_income", &["NetInterestIncome"]),
    field("interest_income_non_operating", &["InterestIncomeNonOperating"]),
    field("interest_expense_non_operating", &["InterestExpenseNonOperating"]),
    field(
        "net_non_operating_interest_income_expense",
        &["NetNonOperatingInterestIncomeExpense"],
    ),
    field("other_non_operating_income_expenses", &["OtherNonOperatingIncomeExpenses"]),
    field("special_income_charges", &["SpecialIncomeCharges"]),
    field("other_special_charges", &["OtherSpecialCharges"]),
    field("pretax_income", &["PretaxIncome"]),
    field("tax_provision", &["TaxProvision"]),
    field("net_income", &["NetIncome"]),
    field("net_income_common_stockholders", &["NetIncomeCommonStockholders"]),
    field("net_income_continuous_operations", &["NetIncomeContinuousOperations"]),
    field(
        "net_income_including_noncontrolling_interests",
        &["NetIncomeIncludingNoncontrollingInterests"],
    ),
    field("normalized_income", &["NormalizedIncome"]),
    field("total_unusual_items", &["TotalUnusualItems"]),
    field("total_unusual_items_excluding_goodwill", &["TotalUnusualItemsExcludingGoodwill"]),
    field("tax_effect_of_unusual_items", &["TaxEffectOfUnusualItems"]),
    field("tax_rate_for_calcs", &["TaxRateForCalcs"]),
    field("reconciled_depreciation", &["ReconciledDepreciation"]),
    field("basic_average_shares", &["BasicAverageShares"]),
    field("diluted_average_shares", &["DilutedAverageShares"]),
    field("basic_eps", &["BasicEPS"]),
    field("diluted_eps", &["DilutedEPS"]),
    field(
        "diluted_ni_availto_com_stockholders",
        &["DilutedNIAvailtoComStockholders"],
    ),
    field("minority_interests", &["MinorityInterests"]),
    field("otherunder_preferred_stock_dividend", &["OtherunderPreferredStockDividend"]),
];

/// Reporting frequency, stored in `period_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Annual,
    Quarterly,
}

impl Period {
    /// Timeseries key prefix and stored `period_type`
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Annual => "annual",
            Period::Quarterly => "quarterly",
        }
    }
}

/// The four statement datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    BalanceSheet,
    CashFlow,
    IncomeStatement,
    Financials,
}

impl Statement {
    pub fn fields(self) -> &'static [StatementField] {
        match self {
            Statement::BalanceSheet => BALANCE_SHEET_FIELDS,
            Statement::CashFlow => CASH_FLOW_FIELDS,
            Statement::IncomeStatement => INCOME_STATEMENT_FIELDS,
            Statement::Financials => FINANCIALS_FIELDS,
        }
    }

    pub fn table(self) -> Table {
        match self {
            Statement::BalanceSheet => Table::BalanceSheets,
            Statement::CashFlow => Table::CashFlows,
            Statement::IncomeStatement => Table::IncomeStatements,
            Statement::Financials => Table::Financials,
        }
    }

    /// `income_statements` is annual only and has no `period_type` column
    pub fn has_period_type(self) -> bool {
        !matches!(self, Statement::IncomeStatement)
    }

    /// Periods ingested for this statement
    pub fn periods(self, include_quarterly: bool) -> Vec<Period> {
        match self {
            Statement::IncomeStatement => vec![Period::Annual],
            Statement::CashFlow => vec![Period::Annual, Period::Quarterly],
            Statement::BalanceSheet | Statement::Financials if include_quarterly => {
                vec![Period::Annual, Period::Quarterly]
            }
            Statement::BalanceSheet | Statement::Financials => vec![Period::Annual],
        }
    }
}

/// Prefixed timeseries keys for a field map, without duplicates
pub fn timeseries_types(fields: &[StatementField], period: Period) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for key in fields.iter().flat_map(|f| f.keys.iter()) {
        let prefixed = format!("{}{}", period.as_str(), key);
        if !types.contains(&prefixed) {
            types.push(prefixed);
        }
    }
    types
}

/// Convert timeseries entries into one row per period end date
pub fn statement_rows(symbol: &str, payload: &Value, statement: Statement, period: Period) -> Vec<Row> {
    let prefix = period.as_str();

    // asOfDate -> key (without prefix) -> value
    let mut by_date: BTreeMap<String, HashMap<String, f64>> = BTreeMap::new();

    for entry in items(payload) {
        let Some(type_key) = entry["meta"]["type"][0].as_str() else {
            continue;
        };
        let Some(key) = type_key.strip_prefix(prefix) else {
            continue;
        };
        for point in items(&entry[type_key]) {
            let Some(date) = point["asOfDate"].as_str().and_then(time::date_part) else {
                continue;
            };
            if let Some(value) = num(&point["reportedValue"]) {
                by_date.entry(date).or_default().insert(key.to_string(), value);
            }
        }
    }

    by_date
        .into_iter()
        .map(|(date, values)| {
            let mut row = Row::new().with("symbol", symbol).with("date", date);
            if statement.has_period_type() {
                row.set("period_type", prefix);
            }
            for field in statement.fields() {
                let value = field.keys.iter().find_map(|key| values.get(*key).copied());
                row.set(field.column, value);
            }
            row
        })
        .collect()
}

/// Fetch and store one statement for all configured periods
pub async fn insert_statement(ingestor: &Ingestor, symbol: &str, statement: Statement) -> Result<UpsertStats> {
    let settings = ingestor.yahoo().settings();
    let mut stats = UpsertStats::default();

    for period in statement.periods(settings.quarterly_statements) {
        let types = timeseries_types(statement.fields(), period);
        let payload = ingestor
            .yahoo()
            .timeseries(symbol, &types, TIMESERIES_START, time::now().timestamp())
            .await?;

        let rows = statement_rows(symbol, &payload, statement, period);
        if rows.is_empty() {
            debug!(symbol, statement = ?statement, period = period.as_str(), "No statement data found");
            continue;
        }

        stats += ingestor.db().upsert(statement.table(), &rows).await?;
    }

    Ok(stats)
}
