use chrono::NaiveDate;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccountType {
    Taxable,
    TaxDeferred,
    NonTaxable,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DividendPolicy {
    Reinvest,
    Withdraw,
}

impl DividendPolicy {
    pub fn from_withdrawal(monthly_withdrawal: f64) -> Self {
        if monthly_withdrawal == 0.0 {
            DividendPolicy::Reinvest
        } else {
            DividendPolicy::Withdraw
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum OctoberSettlement {
    #[default]
    WaiveCurrentMonth,
    IncludeCurrentMonth,
}

#[derive(Debug, Clone)]
pub struct SimulationParameters {
    pub start_date: NaiveDate,
    pub initial_shares: f64,
    pub cost_basis: f64,
    pub holding_period_months: u32,
    pub monthly_dividend_per_share: f64,
    pub reinvestment_price: f64,
    pub account_type: AccountType,
    pub defer_taxes_to_october: bool,
    pub october_settlement: OctoberSettlement,
    pub federal_tax_rate_pct: f64,
    pub state_tax_rate_pct: f64,
    pub monthly_withdrawal: f64,
    pub dividend_policy: DividendPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRecord {
    pub month_index: u32,
    pub date: NaiveDate,
    pub shares_owned: f64,
    pub new_shares: f64,
    pub gross_dividend: f64,
    pub net_dividend: f64,
    pub reinvested_amount: f64,
    pub cash_distributed: f64,
    pub tax_paid: f64,
    pub cumulative_tax_owed: f64,
    pub deferred_tax_balance: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ProjectionView {
    Monthly,
    Yearly,
    Total,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlySummary {
    pub year: i32,
    pub shares_owned: f64,
    pub net_dividends: f64,
    pub reinvested: f64,
    pub taxes_paid: f64,
    pub cumulative_tax_owed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalSummary {
    pub shares_owned: f64,
    pub total_dividends: f64,
    pub total_reinvested: f64,
    pub total_taxes_paid: f64,
    pub cumulative_tax_owed: f64,
    pub deferred_tax_outstanding: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AggregatedProjection {
    Monthly(Vec<MonthlyRecord>),
    Yearly(Vec<YearlySummary>),
    Total(Option<TotalSummary>),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostLot {
    pub shares: f64,
    pub price_per_share: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSnapshot {
    pub shares: f64,
    pub price: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct LeveragedSimulationParameters {
    pub debt_amount: f64,
    pub monthly_payment: f64,
    pub cost_basis_per_share: f64,
    pub loan_duration_months: u32,
    pub compounding_duration_months: u32,
    pub reinvestment_price: f64,
    pub monthly_dividend_per_share: f64,
    // Display only; the fixed payment already prices the loan.
    pub annual_interest_rate_pct: f64,
    pub projected_future_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeveragedMonth {
    pub month: u32,
    pub dividends: f64,
    pub payment: f64,
    pub reinvestment: f64,
    pub new_shares: f64,
    pub shares_owned: f64,
    pub out_of_pocket: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeveragedResult {
    pub initial_shares: f64,
    pub final_shares: f64,
    pub total_interest: f64,
    pub portfolio_value: f64,
    pub monthly_dividends_post_loan: f64,
    pub net_value: f64,
    pub total_out_of_pocket: f64,
    pub schedule: Vec<LeveragedMonth>,
}
