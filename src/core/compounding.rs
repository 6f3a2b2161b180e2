use chrono::{Datelike, Months, NaiveDate};

use super::error::{
    ProjectionError, require_finite, require_horizon, require_non_negative, require_percent,
    require_positive,
};
use super::types::{
    AccountType, AggregatedProjection, DividendPolicy, MonthlyRecord, OctoberSettlement,
    ProjectionView, SimulationParameters, TotalSummary, YearlySummary,
};

const SETTLEMENT_MONTH: u32 = 10;

#[derive(Debug, Default)]
struct DeferredTaxBucket {
    balance: f64,
}

impl DeferredTaxBucket {
    fn defer(&mut self, tax: f64) {
        self.balance += tax;
    }

    fn flush(&mut self) -> f64 {
        std::mem::take(&mut self.balance)
    }
}

pub fn project_compounding(
    params: &SimulationParameters,
) -> Result<Vec<MonthlyRecord>, ProjectionError> {
    if params.holding_period_months == 0 {
        return Ok(Vec::new());
    }
    validate_parameters(params)?;

    let deferring = params.account_type == AccountType::Taxable && params.defer_taxes_to_october;
    let mut shares_owned = params.initial_shares;
    let mut bucket = DeferredTaxBucket::default();
    let mut cumulative_tax = 0.0;
    let mut records = Vec::with_capacity(params.holding_period_months as usize);

    for month_index in 0..params.holding_period_months {
        let date = month_date(params.start_date, month_index)?;
        let gross_dividend = shares_owned * params.monthly_dividend_per_share;
        let tax = month_tax(params, gross_dividend);

        let tax_paid = if !deferring {
            tax
        } else if date.month() == SETTLEMENT_MONTH {
            if params.october_settlement == OctoberSettlement::IncludeCurrentMonth {
                bucket.defer(tax);
            }
            bucket.flush()
        } else {
            bucket.defer(tax);
            0.0
        };

        let net_dividend = gross_dividend - tax_paid;
        let reinvested_amount = match params.dividend_policy {
            DividendPolicy::Reinvest => (net_dividend - params.monthly_withdrawal).max(0.0),
            DividendPolicy::Withdraw => 0.0,
        };
        let new_shares = reinvested_amount / params.reinvestment_price;
        shares_owned += new_shares;
        cumulative_tax += tax_paid;

        records.push(MonthlyRecord {
            month_index,
            date,
            shares_owned,
            new_shares,
            gross_dividend,
            net_dividend,
            reinvested_amount,
            cash_distributed: net_dividend - reinvested_amount,
            tax_paid,
            cumulative_tax_owed: cumulative_tax,
            deferred_tax_balance: bucket.balance,
        });
    }

    Ok(records)
}

pub fn aggregate(records: &[MonthlyRecord], view: ProjectionView) -> AggregatedProjection {
    match view {
        ProjectionView::Monthly => AggregatedProjection::Monthly(records.to_vec()),
        ProjectionView::Yearly => AggregatedProjection::Yearly(yearly_summaries(records)),
        ProjectionView::Total => AggregatedProjection::Total(total_summary(records)),
    }
}

pub fn yearly_summaries(records: &[MonthlyRecord]) -> Vec<YearlySummary> {
    let mut years: Vec<YearlySummary> = Vec::new();
    for record in records {
        let year = record.date.year();
        match years.last_mut() {
            Some(summary) if summary.year == year => {
                summary.shares_owned = record.shares_owned;
                summary.net_dividends += record.net_dividend;
                summary.reinvested += record.reinvested_amount;
                summary.taxes_paid += record.tax_paid;
                summary.cumulative_tax_owed = record.cumulative_tax_owed;
            }
            _ => years.push(YearlySummary {
                year,
                shares_owned: record.shares_owned,
                net_dividends: record.net_dividend,
                reinvested: record.reinvested_amount,
                taxes_paid: record.tax_paid,
                cumulative_tax_owed: record.cumulative_tax_owed,
            }),
        }
    }
    years
}

pub fn total_summary(records: &[MonthlyRecord]) -> Option<TotalSummary> {
    let last = records.last()?;
    Some(TotalSummary {
        shares_owned: last.shares_owned,
        total_dividends: records.iter().map(|r| r.net_dividend).sum(),
        total_reinvested: records.iter().map(|r| r.reinvested_amount).sum(),
        total_taxes_paid: records.iter().map(|r| r.tax_paid).sum(),
        cumulative_tax_owed: last.cumulative_tax_owed,
        deferred_tax_outstanding: last.deferred_tax_balance,
    })
}

fn validate_parameters(params: &SimulationParameters) -> Result<(), ProjectionError> {
    require_horizon("holding_period_months", params.holding_period_months)?;
    require_non_negative("initial_shares", params.initial_shares)?;
    require_non_negative("cost_basis", params.cost_basis)?;
    require_finite("monthly_dividend_per_share", params.monthly_dividend_per_share)?;
    require_positive("reinvestment_price", params.reinvestment_price)?;
    require_percent("federal_tax_rate_pct", params.federal_tax_rate_pct)?;
    require_percent("state_tax_rate_pct", params.state_tax_rate_pct)?;
    require_non_negative("monthly_withdrawal", params.monthly_withdrawal)?;
    Ok(())
}

fn month_tax(params: &SimulationParameters, gross_dividend: f64) -> f64 {
    match params.account_type {
        AccountType::Taxable => {
            gross_dividend * (params.federal_tax_rate_pct + params.state_tax_rate_pct) / 100.0
        }
        AccountType::TaxDeferred | AccountType::NonTaxable => 0.0,
    }
}

fn month_date(start: NaiveDate, offset: u32) -> Result<NaiveDate, ProjectionError> {
    start.checked_add_months(Months::new(offset)).ok_or_else(|| {
        ProjectionError::invalid(
            "start_date",
            format!("{start} plus {offset} months is outside the supported calendar"),
        )
    })
}
