use super::error::{
    ProjectionError, require_finite, require_horizon, require_non_negative, require_positive,
};
use super::types::{LeveragedMonth, LeveragedResult, LeveragedSimulationParameters};

pub fn project_leveraged_return(
    params: &LeveragedSimulationParameters,
) -> Result<LeveragedResult, ProjectionError> {
    validate_parameters(params)?;

    let initial_shares = params.debt_amount / params.cost_basis_per_share;
    let mut shares_owned = initial_shares;
    let mut total_out_of_pocket = 0.0;
    let mut schedule = Vec::with_capacity(params.compounding_duration_months as usize);

    for month in 1..=params.compounding_duration_months {
        let dividends = shares_owned * params.monthly_dividend_per_share;
        let payment = if loan_active(params.loan_duration_months, month) {
            params.monthly_payment
        } else {
            0.0
        };
        let reinvestment = (dividends - payment).max(0.0);
        let out_of_pocket = (payment - dividends).max(0.0);
        let new_shares = reinvestment / params.reinvestment_price;
        shares_owned += new_shares;
        total_out_of_pocket += out_of_pocket;

        schedule.push(LeveragedMonth {
            month,
            dividends,
            payment,
            reinvestment,
            new_shares,
            shares_owned,
            out_of_pocket,
        });
    }

    let total_interest =
        params.monthly_payment * f64::from(params.loan_duration_months) - params.debt_amount;
    let portfolio_value = shares_owned * params.projected_future_price;

    Ok(LeveragedResult {
        initial_shares,
        final_shares: shares_owned,
        total_interest,
        portfolio_value,
        monthly_dividends_post_loan: shares_owned * params.monthly_dividend_per_share,
        net_value: portfolio_value - params.debt_amount - total_interest,
        total_out_of_pocket,
        schedule,
    })
}

// The final month of the loan term is not charged.
fn loan_active(loan_duration_months: u32, month: u32) -> bool {
    loan_duration_months.saturating_sub(month) > 0
}

fn validate_parameters(params: &LeveragedSimulationParameters) -> Result<(), ProjectionError> {
    require_horizon("compounding_duration_months", params.compounding_duration_months)?;
    require_non_negative("debt_amount", params.debt_amount)?;
    require_non_negative("monthly_payment", params.monthly_payment)?;
    require_positive("cost_basis_per_share", params.cost_basis_per_share)?;
    require_positive("reinvestment_price", params.reinvestment_price)?;
    require_finite("monthly_dividend_per_share", params.monthly_dividend_per_share)?;
    require_finite("annual_interest_rate_pct", params.annual_interest_rate_pct)?;
    require_non_negative("projected_future_price", params.projected_future_price)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn reference_params() -> LeveragedSimulationParameters {
        LeveragedSimulationParameters {
            debt_amount: 100_000.0,
            monthly_payment: 2_500.0,
            cost_basis_per_share: 25.0,
            loan_duration_months: 48,
            compounding_duration_months: 48,
            reinvestment_price: 25.0,
            monthly_dividend_per_share: 2.0,
            annual_interest_rate_pct: 10.0,
            projected_future_price: 40.0,
        }
    }

    fn replay_final_shares(p: &LeveragedSimulationParameters) -> f64 {
        let mut shares = p.debt_amount / p.cost_basis_per_share;
        for month in 1..=p.compounding_duration_months {
            let dividends = shares * p.monthly_dividend_per_share;
            let remaining = i64::from(p.loan_duration_months) - i64::from(month);
            let payment = if remaining > 0 { p.monthly_payment } else { 0.0 };
            let reinvestment = (dividends - payment).max(0.0);
            shares += reinvestment / p.reinvestment_price;
        }
        shares
    }

    #[test]
    fn reference_example_golden_values() {
        let params = reference_params();
        let result = project_leveraged_return(&params).expect("valid params");

        assert_eq!(result.initial_shares, 4_000.0);
        assert_eq!(result.total_interest, 20_000.0);
        assert_approx(result.final_shares, 111_929.076_141_448_65);
        assert_approx(result.portfolio_value, 4_477_163.045_657_946);
        assert_approx(result.monthly_dividends_post_loan, 223_858.152_282_897_3);
        assert_approx(result.net_value, 4_357_163.045_657_946);
        assert_eq!(result.schedule.len(), 48);
    }

    #[test]
    fn reference_example_is_bit_for_bit_reproducible() {
        let params = reference_params();
        let result = project_leveraged_return(&params).expect("valid params");
        let shares = replay_final_shares(&params);

        assert_eq!(result.final_shares, shares);
        assert_eq!(result.portfolio_value, shares * params.projected_future_price);
        assert_eq!(
            result.net_value,
            shares * params.projected_future_price - params.debt_amount - result.total_interest
        );
        assert_eq!(
            result,
            project_leveraged_return(&params).expect("valid params")
        );
    }

    #[test]
    fn final_loan_month_is_not_charged() {
        let params = LeveragedSimulationParameters {
            debt_amount: 1_000.0,
            monthly_payment: 100.0,
            cost_basis_per_share: 10.0,
            loan_duration_months: 3,
            compounding_duration_months: 3,
            reinvestment_price: 10.0,
            monthly_dividend_per_share: 0.5,
            annual_interest_rate_pct: 8.0,
            projected_future_price: 12.0,
        };
        let result = project_leveraged_return(&params).expect("valid params");
        let payments: Vec<f64> = result.schedule.iter().map(|m| m.payment).collect();
        assert_eq!(payments, vec![100.0, 100.0, 0.0]);

        // Dividends of 50 cannot cover the 100 payment in the first two months.
        assert_approx(result.schedule[0].out_of_pocket, 50.0);
        assert_approx(result.total_out_of_pocket, 100.0);
        assert_approx(result.schedule[2].reinvestment, 50.0);
        assert_approx(result.final_shares, 105.0);
        assert_approx(result.total_interest, -700.0);
    }

    #[test]
    fn compounding_past_the_loan_term_reinvests_everything() {
        let mut params = reference_params();
        params.loan_duration_months = 12;
        params.compounding_duration_months = 24;
        let result = project_leveraged_return(&params).expect("valid params");
        for month in &result.schedule[11..] {
            assert_eq!(month.payment, 0.0);
            assert_eq!(month.reinvestment, month.dividends);
        }
    }

    #[test]
    fn zero_compounding_months_keeps_initial_position() {
        let mut params = reference_params();
        params.compounding_duration_months = 0;
        let result = project_leveraged_return(&params).expect("valid params");
        assert!(result.schedule.is_empty());
        assert_eq!(result.final_shares, result.initial_shares);
        assert_approx(result.portfolio_value, 160_000.0);
    }

    #[test]
    fn interest_rate_does_not_change_the_projection() {
        let base = project_leveraged_return(&reference_params()).expect("valid params");
        let mut params = reference_params();
        params.annual_interest_rate_pct = 25.0;
        let changed = project_leveraged_return(&params).expect("valid params");
        assert_eq!(base, changed);
    }

    #[test]
    fn rejects_non_positive_denominators() {
        let mut params = reference_params();
        params.cost_basis_per_share = 0.0;
        assert_eq!(
            project_leveraged_return(&params)
                .expect_err("zero cost basis")
                .parameter(),
            "cost_basis_per_share"
        );

        let mut params = reference_params();
        params.reinvestment_price = -1.0;
        assert_eq!(
            project_leveraged_return(&params)
                .expect_err("negative price")
                .parameter(),
            "reinvestment_price"
        );
    }

    #[test]
    fn rejects_compounding_horizon_beyond_supported_range() {
        let mut params = reference_params();
        params.compounding_duration_months = u32::MAX;
        assert_eq!(
            project_leveraged_return(&params)
                .expect_err("u32::MAX months must be rejected")
                .parameter(),
            "compounding_duration_months"
        );

        let mut params = reference_params();
        params.loan_duration_months = u32::MAX;
        let result = project_leveraged_return(&params).expect("loan term does not allocate");
        assert_eq!(result.schedule.len(), 48);
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_scaling_debt_and_payment_scales_outputs(
            debt in 1_000u32..500_000,
            payment in 0u32..10_000,
            loan in 1u32..121,
            compounding in 0u32..121,
            dividend_cents in 0u32..400
        ) {
            let mut base = reference_params();
            base.debt_amount = debt as f64;
            base.monthly_payment = payment as f64;
            base.loan_duration_months = loan;
            base.compounding_duration_months = compounding;
            base.monthly_dividend_per_share = dividend_cents as f64 / 100.0;
            let mut doubled = base.clone();
            doubled.debt_amount *= 2.0;
            doubled.monthly_payment *= 2.0;

            let a = project_leveraged_return(&base).expect("valid params");
            let b = project_leveraged_return(&doubled).expect("valid params");
            for (x, y) in [
                (a.initial_shares, b.initial_shares),
                (a.final_shares, b.final_shares),
                (a.total_interest, b.total_interest),
                (a.portfolio_value, b.portfolio_value),
                (a.monthly_dividends_post_loan, b.monthly_dividends_post_loan),
                (a.net_value, b.net_value),
            ] {
                prop_assert!((y - 2.0 * x).abs() <= 1e-9 * y.abs().max(1.0));
            }
        }

        #[test]
        fn prop_shares_never_decrease(
            payment in 0u32..10_000,
            loan in 1u32..121,
            compounding in 1u32..121,
            dividend_cents in 0u32..400
        ) {
            let mut params = reference_params();
            params.monthly_payment = payment as f64;
            params.loan_duration_months = loan;
            params.compounding_duration_months = compounding;
            params.monthly_dividend_per_share = dividend_cents as f64 / 100.0;

            let result = project_leveraged_return(&params).expect("valid params");
            let mut previous = result.initial_shares;
            for month in &result.schedule {
                prop_assert!(month.shares_owned >= previous);
                previous = month.shares_owned;
            }
        }
    }
}
