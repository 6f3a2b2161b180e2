use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::net::TcpListener;

use crate::core::{
    AccountType, AggregatedProjection, CostBasisLedger, CostLot, DividendPolicy,
    LeveragedMonth, LeveragedSimulationParameters, LotSnapshot, MonthlyRecord,
    OctoberSettlement, ProjectionError, ProjectionView, SimulationParameters, TotalSummary,
    YearlySummary, aggregate, project_compounding, project_leveraged_return,
};

const MAX_HORIZON_MONTHS: u32 = 120;
const MAX_FEDERAL_TAX_RATE: f64 = 50.0;
const MAX_STATE_TAX_RATE: f64 = 15.0;
const MAX_SESSION_ID_LEN: usize = 64;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApiAccountType {
    Taxable,
    #[serde(alias = "taxDeferred", alias = "tax_deferred")]
    TaxDeferred,
    #[serde(alias = "nonTaxable", alias = "non_taxable")]
    NonTaxable,
}

impl From<ApiAccountType> for AccountType {
    fn from(value: ApiAccountType) -> Self {
        match value {
            ApiAccountType::Taxable => AccountType::Taxable,
            ApiAccountType::TaxDeferred => AccountType::TaxDeferred,
            ApiAccountType::NonTaxable => AccountType::NonTaxable,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApiDividendPolicy {
    Reinvest,
    Withdraw,
}

impl From<ApiDividendPolicy> for DividendPolicy {
    fn from(value: ApiDividendPolicy) -> Self {
        match value {
            ApiDividendPolicy::Reinvest => DividendPolicy::Reinvest,
            ApiDividendPolicy::Withdraw => DividendPolicy::Withdraw,
        }
    }
}

impl From<DividendPolicy> for ApiDividendPolicy {
    fn from(value: DividendPolicy) -> Self {
        match value {
            DividendPolicy::Reinvest => ApiDividendPolicy::Reinvest,
            DividendPolicy::Withdraw => ApiDividendPolicy::Withdraw,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ApiOctoberSettlement {
    #[serde(alias = "waive", alias = "waiveCurrentMonth")]
    WaiveCurrentMonth,
    #[serde(alias = "include", alias = "includeCurrentMonth")]
    IncludeCurrentMonth,
}

impl From<ApiOctoberSettlement> for OctoberSettlement {
    fn from(value: ApiOctoberSettlement) -> Self {
        match value {
            ApiOctoberSettlement::WaiveCurrentMonth => OctoberSettlement::WaiveCurrentMonth,
            ApiOctoberSettlement::IncludeCurrentMonth => OctoberSettlement::IncludeCurrentMonth,
        }
    }
}

impl From<OctoberSettlement> for ApiOctoberSettlement {
    fn from(value: OctoberSettlement) -> Self {
        match value {
            OctoberSettlement::WaiveCurrentMonth => ApiOctoberSettlement::WaiveCurrentMonth,
            OctoberSettlement::IncludeCurrentMonth => ApiOctoberSettlement::IncludeCurrentMonth,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ApiView {
    Monthly,
    Yearly,
    Total,
}

impl From<ApiView> for ProjectionView {
    fn from(value: ApiView) -> Self {
        match value {
            ApiView::Monthly => ProjectionView::Monthly,
            ApiView::Yearly => ProjectionView::Yearly,
            ApiView::Total => ProjectionView::Total,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CompoundingArgs {
    #[arg(long, default_value_t = 10_000.0, help = "Initial share count")]
    pub shares: f64,
    #[arg(long, default_value_t = 25.0, help = "Initial purchase cost basis per share")]
    pub cost_basis: f64,
    #[arg(long, default_value_t = 24, help = "Holding period in months (1-120)")]
    pub holding_period: u32,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_negative_numbers = true,
        help = "Average monthly dividend per share"
    )]
    pub dividend: f64,
    #[arg(long, default_value_t = 25.0, help = "Average reinvestment cost per share")]
    pub reinvest_price: f64,
    #[arg(long, value_enum, default_value_t = ApiAccountType::Taxable)]
    pub account_type: ApiAccountType,
    #[arg(long, help = "Defer taxes to the October settlement")]
    pub defer_taxes: bool,
    #[arg(long, value_enum, default_value_t = ApiOctoberSettlement::WaiveCurrentMonth)]
    pub october_settlement: ApiOctoberSettlement,
    #[arg(long, default_value_t = 20.0, help = "Federal tax rate in percent (0-50)")]
    pub federal_tax: f64,
    #[arg(long, default_value_t = 5.0, help = "State tax rate in percent (0-15)")]
    pub state_tax: f64,
    #[arg(long, default_value_t = 0.0, help = "Dollar amount withdrawn monthly")]
    pub withdraw: f64,
    #[arg(
        long,
        value_enum,
        help = "Dividend policy; defaults to reinvest when --withdraw is 0, withdraw otherwise"
    )]
    pub policy: Option<ApiDividendPolicy>,
    #[arg(long, help = "Date of the first simulated month (YYYY-MM-DD); defaults to today")]
    pub start_date: Option<NaiveDate>,
    #[arg(long, value_enum, default_value_t = ApiView::Monthly)]
    pub view: ApiView,
}

#[derive(Args, Debug, Clone)]
pub struct LeveragedArgs {
    #[arg(long, default_value_t = 100_000.0, help = "Total debt incurred")]
    pub debt: f64,
    #[arg(long, default_value_t = 2_500.0, help = "Monthly debt payment")]
    pub monthly_payment: f64,
    #[arg(long, default_value_t = 25.0, help = "Cost basis per share")]
    pub cost_basis: f64,
    #[arg(long, default_value_t = 48, help = "Loan duration in months (1-120)")]
    pub loan_months: u32,
    #[arg(long, default_value_t = 48, help = "Compounding duration in months (1-120)")]
    pub compounding_months: u32,
    #[arg(long, default_value_t = 25.0, help = "Average reinvestment share price")]
    pub reinvest_price: f64,
    #[arg(
        long,
        default_value_t = 2.0,
        allow_negative_numbers = true,
        help = "Average monthly dividend per share"
    )]
    pub dividend: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        help = "Annual interest rate in percent; reported only, the fixed payment drives the model"
    )]
    pub interest_rate: f64,
    #[arg(long, default_value_t = 40.0, help = "Projected share price after the loan period")]
    pub future_price: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompoundingPayload {
    shares: Option<f64>,
    cost_basis: Option<f64>,
    holding_period: Option<u32>,
    dividend: Option<f64>,
    reinvest_price: Option<f64>,
    account_type: Option<ApiAccountType>,
    defer_taxes: Option<bool>,
    october_settlement: Option<ApiOctoberSettlement>,
    federal_tax: Option<f64>,
    state_tax: Option<f64>,
    withdraw: Option<f64>,
    policy: Option<ApiDividendPolicy>,
    start_date: Option<NaiveDate>,
    view: Option<ApiView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeveragedPayload {
    debt: Option<f64>,
    monthly_payment: Option<f64>,
    cost_basis: Option<f64>,
    loan_months: Option<u32>,
    compounding_months: Option<u32>,
    reinvest_price: Option<f64>,
    dividend: Option<f64>,
    interest_rate: Option<f64>,
    future_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotPayload {
    shares: f64,
    #[serde(alias = "price")]
    price_per_share: f64,
}

#[derive(Debug, Serialize)]
#[serde(tag = "view", content = "rows", rename_all = "lowercase")]
pub enum CompoundingRows {
    Monthly(Vec<MonthlyRecord>),
    Yearly(Vec<YearlySummary>),
    Total(Option<TotalSummary>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompoundingResponse {
    start_date: NaiveDate,
    holding_period_months: u32,
    dividend_policy: ApiDividendPolicy,
    october_settlement: ApiOctoberSettlement,
    projection: CompoundingRows,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeveragedResponse {
    initial_shares: f64,
    final_shares: f64,
    total_interest: f64,
    portfolio_value: f64,
    monthly_dividends_post_loan: f64,
    net_value: f64,
    total_out_of_pocket: f64,
    annual_interest_rate_pct: f64,
    schedule: Vec<LeveragedMonth>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostBasisResponse {
    session: Option<String>,
    lots: Vec<LotSnapshot>,
    total_shares: f64,
    total_cost: f64,
    weighted_average_cost: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    ledgers: Arc<Mutex<HashMap<String, CostBasisLedger>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_lot(
        &self,
        session: &str,
        shares: f64,
        price_per_share: f64,
    ) -> Result<CostBasisLedger, ProjectionError> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ledger) = ledgers.get_mut(session) {
            ledger.add_lot(shares, price_per_share)?;
            return Ok(ledger.clone());
        }
        // Only a lot that passed validation opens a new session.
        let mut ledger = CostBasisLedger::new();
        ledger.add_lot(shares, price_per_share)?;
        ledgers.insert(session.to_string(), ledger.clone());
        Ok(ledger)
    }

    pub fn remove_lot(&self, session: &str, index: usize) -> Option<CostBasisLedger> {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        let ledger = ledgers.get_mut(session)?;
        ledger.remove_lot(index)?;
        Some(ledger.clone())
    }

    pub fn contains(&self, session: &str) -> bool {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers.contains_key(session)
    }

    pub fn snapshot(&self, session: &str) -> CostBasisLedger {
        let ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers.get(session).cloned().unwrap_or_default()
    }

    pub fn remove(&self, session: &str) -> bool {
        let mut ledgers = self.ledgers.lock().unwrap_or_else(PoisonError::into_inner);
        ledgers.remove(session).is_some()
    }
}

pub fn default_compounding_args() -> CompoundingArgs {
    CompoundingArgs {
        shares: 10_000.0,
        cost_basis: 25.0,
        holding_period: 24,
        dividend: 2.0,
        reinvest_price: 25.0,
        account_type: ApiAccountType::Taxable,
        defer_taxes: false,
        october_settlement: ApiOctoberSettlement::WaiveCurrentMonth,
        federal_tax: 20.0,
        state_tax: 5.0,
        withdraw: 0.0,
        policy: None,
        start_date: None,
        view: ApiView::Monthly,
    }
}

pub fn default_leveraged_args() -> LeveragedArgs {
    LeveragedArgs {
        debt: 100_000.0,
        monthly_payment: 2_500.0,
        cost_basis: 25.0,
        loan_months: 48,
        compounding_months: 48,
        reinvest_price: 25.0,
        dividend: 2.0,
        interest_rate: 10.0,
        future_price: 40.0,
    }
}

fn require_non_negative(flag: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{flag} must be >= 0"));
    }
    Ok(())
}

fn require_positive(flag: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value <= 0.0 {
        return Err(format!("{flag} must be > 0"));
    }
    Ok(())
}

fn require_months(flag: &str, value: u32) -> Result<(), String> {
    if !(1..=MAX_HORIZON_MONTHS).contains(&value) {
        return Err(format!("{flag} must be between 1 and {MAX_HORIZON_MONTHS}"));
    }
    Ok(())
}

pub fn build_compounding_parameters(args: &CompoundingArgs) -> Result<SimulationParameters, String> {
    require_non_negative("--shares", args.shares)?;
    require_non_negative("--cost-basis", args.cost_basis)?;
    require_months("--holding-period", args.holding_period)?;
    if !args.dividend.is_finite() {
        return Err("--dividend must be a finite number".to_string());
    }
    require_positive("--reinvest-price", args.reinvest_price)?;
    if !(0.0..=MAX_FEDERAL_TAX_RATE).contains(&args.federal_tax) {
        return Err(format!(
            "--federal-tax must be between 0 and {MAX_FEDERAL_TAX_RATE}"
        ));
    }
    if !(0.0..=MAX_STATE_TAX_RATE).contains(&args.state_tax) {
        return Err(format!("--state-tax must be between 0 and {MAX_STATE_TAX_RATE}"));
    }
    require_non_negative("--withdraw", args.withdraw)?;

    let dividend_policy = args
        .policy
        .map(DividendPolicy::from)
        .unwrap_or_else(|| DividendPolicy::from_withdrawal(args.withdraw));

    Ok(SimulationParameters {
        start_date: args
            .start_date
            .unwrap_or_else(|| Local::now().date_naive()),
        initial_shares: args.shares,
        cost_basis: args.cost_basis,
        holding_period_months: args.holding_period,
        monthly_dividend_per_share: args.dividend,
        reinvestment_price: args.reinvest_price,
        account_type: args.account_type.into(),
        defer_taxes_to_october: args.defer_taxes,
        october_settlement: args.october_settlement.into(),
        federal_tax_rate_pct: args.federal_tax,
        state_tax_rate_pct: args.state_tax,
        monthly_withdrawal: args.withdraw,
        dividend_policy,
    })
}

pub fn build_leveraged_parameters(
    args: &LeveragedArgs,
) -> Result<LeveragedSimulationParameters, String> {
    require_non_negative("--debt", args.debt)?;
    require_non_negative("--monthly-payment", args.monthly_payment)?;
    require_positive("--cost-basis", args.cost_basis)?;
    require_months("--loan-months", args.loan_months)?;
    require_months("--compounding-months", args.compounding_months)?;
    require_positive("--reinvest-price", args.reinvest_price)?;
    if !args.dividend.is_finite() {
        return Err("--dividend must be a finite number".to_string());
    }
    if !args.interest_rate.is_finite() {
        return Err("--interest-rate must be a finite number".to_string());
    }
    require_non_negative("--future-price", args.future_price)?;

    Ok(LeveragedSimulationParameters {
        debt_amount: args.debt,
        monthly_payment: args.monthly_payment,
        cost_basis_per_share: args.cost_basis,
        loan_duration_months: args.loan_months,
        compounding_duration_months: args.compounding_months,
        reinvestment_price: args.reinvest_price,
        monthly_dividend_per_share: args.dividend,
        annual_interest_rate_pct: args.interest_rate,
        projected_future_price: args.future_price,
    })
}

pub fn compounding_args_from_payload(payload: CompoundingPayload) -> CompoundingArgs {
    let mut args = default_compounding_args();
    if let Some(v) = payload.shares {
        args.shares = v;
    }
    if let Some(v) = payload.cost_basis {
        args.cost_basis = v;
    }
    if let Some(v) = payload.holding_period {
        args.holding_period = v;
    }
    if let Some(v) = payload.dividend {
        args.dividend = v;
    }
    if let Some(v) = payload.reinvest_price {
        args.reinvest_price = v;
    }
    if let Some(v) = payload.account_type {
        args.account_type = v;
    }
    if let Some(v) = payload.defer_taxes {
        args.defer_taxes = v;
    }
    if let Some(v) = payload.october_settlement {
        args.october_settlement = v;
    }
    if let Some(v) = payload.federal_tax {
        args.federal_tax = v;
    }
    if let Some(v) = payload.state_tax {
        args.state_tax = v;
    }
    if let Some(v) = payload.withdraw {
        args.withdraw = v;
    }
    if let Some(v) = payload.policy {
        args.policy = Some(v);
    }
    if let Some(v) = payload.start_date {
        args.start_date = Some(v);
    }
    if let Some(v) = payload.view {
        args.view = v;
    }
    args
}

pub fn leveraged_args_from_payload(payload: LeveragedPayload) -> LeveragedArgs {
    let mut args = default_leveraged_args();
    if let Some(v) = payload.debt {
        args.debt = v;
    }
    if let Some(v) = payload.monthly_payment {
        args.monthly_payment = v;
    }
    if let Some(v) = payload.cost_basis {
        args.cost_basis = v;
    }
    if let Some(v) = payload.loan_months {
        args.loan_months = v;
    }
    if let Some(v) = payload.compounding_months {
        args.compounding_months = v;
    }
    if let Some(v) = payload.reinvest_price {
        args.reinvest_price = v;
    }
    if let Some(v) = payload.dividend {
        args.dividend = v;
    }
    if let Some(v) = payload.interest_rate {
        args.interest_rate = v;
    }
    if let Some(v) = payload.future_price {
        args.future_price = v;
    }
    args
}

pub fn compounding_response(args: &CompoundingArgs) -> Result<CompoundingResponse, String> {
    let params = build_compounding_parameters(args)?;
    let records = project_compounding(&params).map_err(|e| e.to_string())?;
    tracing::debug!(
        months = records.len(),
        view = ?args.view,
        policy = ?params.dividend_policy,
        "compounding projection finished"
    );

    let projection = match aggregate(&records, args.view.into()) {
        AggregatedProjection::Monthly(rows) => {
            CompoundingRows::Monthly(rows.iter().map(round_monthly_record).collect())
        }
        AggregatedProjection::Yearly(rows) => {
            CompoundingRows::Yearly(rows.iter().map(round_yearly_summary).collect())
        }
        AggregatedProjection::Total(total) => {
            CompoundingRows::Total(total.as_ref().map(round_total_summary))
        }
    };

    Ok(CompoundingResponse {
        start_date: params.start_date,
        holding_period_months: params.holding_period_months,
        dividend_policy: params.dividend_policy.into(),
        october_settlement: params.october_settlement.into(),
        projection,
    })
}

pub fn leveraged_response(args: &LeveragedArgs) -> Result<LeveragedResponse, String> {
    let params = build_leveraged_parameters(args)?;
    let result = project_leveraged_return(&params).map_err(|e| e.to_string())?;
    tracing::debug!(
        months = result.schedule.len(),
        final_shares = result.final_shares,
        "leveraged projection finished"
    );

    Ok(LeveragedResponse {
        initial_shares: round_cents(result.initial_shares),
        final_shares: round_cents(result.final_shares),
        total_interest: round_cents(result.total_interest),
        portfolio_value: round_cents(result.portfolio_value),
        monthly_dividends_post_loan: round_cents(result.monthly_dividends_post_loan),
        net_value: round_cents(result.net_value),
        total_out_of_pocket: round_cents(result.total_out_of_pocket),
        annual_interest_rate_pct: params.annual_interest_rate_pct,
        schedule: result.schedule.iter().map(round_leveraged_month).collect(),
    })
}

pub fn cost_basis_response(session: Option<&str>, ledger: &CostBasisLedger) -> CostBasisResponse {
    CostBasisResponse {
        session: session.map(str::to_string),
        lots: ledger
            .snapshot()
            .into_iter()
            .map(|lot| LotSnapshot {
                shares: round_cents(lot.shares),
                price: round_cents(lot.price),
                total: round_cents(lot.total),
            })
            .collect(),
        total_shares: round_cents(ledger.total_shares()),
        total_cost: round_cents(ledger.total_cost()),
        weighted_average_cost: round_cents(ledger.weighted_average_cost()),
    }
}

// SHARES@PRICE, e.g. 100@25.50
pub fn parse_lot(raw: &str) -> Result<CostLot, String> {
    let (shares, price) = raw
        .split_once('@')
        .ok_or_else(|| format!("lot `{raw}` must look like SHARES@PRICE"))?;
    let shares = shares
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("lot `{raw}` has invalid shares: {e}"))?;
    let price_per_share = price
        .trim()
        .trim_start_matches('$')
        .parse::<f64>()
        .map_err(|e| format!("lot `{raw}` has invalid price: {e}"))?;
    Ok(CostLot {
        shares,
        price_per_share,
    })
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round_monthly_record(record: &MonthlyRecord) -> MonthlyRecord {
    MonthlyRecord {
        month_index: record.month_index,
        date: record.date,
        shares_owned: round_cents(record.shares_owned),
        new_shares: round_cents(record.new_shares),
        gross_dividend: round_cents(record.gross_dividend),
        net_dividend: round_cents(record.net_dividend),
        reinvested_amount: round_cents(record.reinvested_amount),
        cash_distributed: round_cents(record.cash_distributed),
        tax_paid: round_cents(record.tax_paid),
        cumulative_tax_owed: round_cents(record.cumulative_tax_owed),
        deferred_tax_balance: round_cents(record.deferred_tax_balance),
    }
}

fn round_yearly_summary(summary: &YearlySummary) -> YearlySummary {
    YearlySummary {
        year: summary.year,
        shares_owned: round_cents(summary.shares_owned),
        net_dividends: round_cents(summary.net_dividends),
        reinvested: round_cents(summary.reinvested),
        taxes_paid: round_cents(summary.taxes_paid),
        cumulative_tax_owed: round_cents(summary.cumulative_tax_owed),
    }
}

fn round_total_summary(total: &TotalSummary) -> TotalSummary {
    TotalSummary {
        shares_owned: round_cents(total.shares_owned),
        total_dividends: round_cents(total.total_dividends),
        total_reinvested: round_cents(total.total_reinvested),
        total_taxes_paid: round_cents(total.total_taxes_paid),
        cumulative_tax_owed: round_cents(total.cumulative_tax_owed),
        deferred_tax_outstanding: round_cents(total.deferred_tax_outstanding),
    }
}

fn round_leveraged_month(month: &LeveragedMonth) -> LeveragedMonth {
    LeveragedMonth {
        month: month.month,
        dividends: round_cents(month.dividends),
        payment: round_cents(month.payment),
        reinvestment: round_cents(month.reinvestment),
        new_shares: round_cents(month.new_shares),
        shares_owned: round_cents(month.shares_owned),
        out_of_pocket: round_cents(month.out_of_pocket),
    }
}

fn validate_session_id(session: &str) -> Result<(), String> {
    if session.is_empty() || session.len() > MAX_SESSION_ID_LEN {
        return Err(format!(
            "session id must be 1 to {MAX_SESSION_ID_LEN} characters"
        ));
    }
    if !session
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("session id may only contain letters, digits, '-' and '_'".to_string());
    }
    Ok(())
}

pub fn router(sessions: SessionStore) -> Router {
    Router::new()
        .route(
            "/api/compounding",
            get(compounding_get_handler).post(compounding_post_handler),
        )
        .route(
            "/api/leveraged",
            get(leveraged_get_handler).post(leveraged_post_handler),
        )
        .route(
            "/api/cost-basis/:session",
            get(cost_basis_get_handler).delete(cost_basis_clear_handler),
        )
        .route("/api/cost-basis/:session/lots", post(cost_basis_add_handler))
        .route(
            "/api/cost-basis/:session/lots/:index",
            delete(cost_basis_remove_handler),
        )
        .fallback(not_found_handler)
        .with_state(sessions)
}

pub async fn run_http_server(host: IpAddr, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from((host, port));
    let app = router(SessionStore::new());

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dividend tools HTTP API listening");

    axum::serve(listener, app).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn compounding_get_handler(Query(payload): Query<CompoundingPayload>) -> Response {
    compounding_handler_impl(payload)
}

async fn compounding_post_handler(Json(payload): Json<CompoundingPayload>) -> Response {
    compounding_handler_impl(payload)
}

fn compounding_handler_impl(payload: CompoundingPayload) -> Response {
    let args = compounding_args_from_payload(payload);
    match compounding_response(&args) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected compounding request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn leveraged_get_handler(Query(payload): Query<LeveragedPayload>) -> Response {
    leveraged_handler_impl(payload)
}

async fn leveraged_post_handler(Json(payload): Json<LeveragedPayload>) -> Response {
    leveraged_handler_impl(payload)
}

fn leveraged_handler_impl(payload: LeveragedPayload) -> Response {
    let args = leveraged_args_from_payload(payload);
    match leveraged_response(&args) {
        Ok(response) => json_response(StatusCode::OK, response),
        Err(msg) => {
            tracing::warn!(error = %msg, "rejected leveraged request");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
    }
}

async fn cost_basis_get_handler(
    State(sessions): State<SessionStore>,
    Path(session): Path<String>,
) -> Response {
    if let Err(msg) = validate_session_id(&session) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    let ledger = sessions.snapshot(&session);
    json_response(StatusCode::OK, cost_basis_response(Some(session.as_str()), &ledger))
}

async fn cost_basis_add_handler(
    State(sessions): State<SessionStore>,
    Path(session): Path<String>,
    Json(lot): Json<LotPayload>,
) -> Response {
    if let Err(msg) = validate_session_id(&session) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    match sessions.add_lot(&session, lot.shares, lot.price_per_share) {
        Ok(ledger) => {
            let response = cost_basis_response(Some(session.as_str()), &ledger);
            tracing::debug!(%session, lots = response.lots.len(), "lot added");
            json_response(StatusCode::OK, response)
        }
        Err(err) => error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    }
}

async fn cost_basis_remove_handler(
    State(sessions): State<SessionStore>,
    Path((session, index)): Path<(String, usize)>,
) -> Response {
    if let Err(msg) = validate_session_id(&session) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    match sessions.remove_lot(&session, index) {
        Some(ledger) => json_response(
            StatusCode::OK,
            cost_basis_response(Some(session.as_str()), &ledger),
        ),
        None => error_response(StatusCode::NOT_FOUND, &format!("no lot at index {index}")),
    }
}

async fn cost_basis_clear_handler(
    State(sessions): State<SessionStore>,
    Path(session): Path<String>,
) -> Response {
    if let Err(msg) = validate_session_id(&session) {
        return error_response(StatusCode::BAD_REQUEST, &msg);
    }
    sessions.remove(&session);
    json_response(
        StatusCode::OK,
        cost_basis_response(Some(session.as_str()), &CostBasisLedger::new()),
    )
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
