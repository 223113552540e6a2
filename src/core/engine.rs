use serde::Serialize;
use tracing::{debug, info};

use super::constants::TARGET_YEAR;
use super::error::{
    EngineError, ValidationError, ensure_finite, ensure_non_negative, simulation_error_fields,
};
use super::days::days_at_year_start;
use super::model::{PriceProjector, median_price};
use super::types::{
    AccumulationForm, AccumulationInputs, AccumulationRow, InitialHolding, PhaseLabel,
    SimulationOutcome, WithdrawalForm, WithdrawalInputs, WithdrawalPlan, WithdrawalRow,
};
use super::validation::{validate_accumulation, validate_withdrawal};

#[derive(Debug)]
struct FiatPricer {
    projector: PriceProjector,
    base_year: i32,
    exchange_rate: f64,
    inflation_rate: f64,
}

impl FiatPricer {
    fn price_for_year(&mut self, year: i32) -> Result<f64, EngineError> {
        let usd = self.projector.median_usd_for_year(year)?;
        let effective_fx =
            self.exchange_rate * (1.0 + self.inflation_rate).powi(year - self.base_year);
        ensure_finite(usd * effective_fx, "fiat price", year)
    }
}

pub fn simulate_accumulation(inputs: &AccumulationInputs) -> Result<Vec<AccumulationRow>, EngineError> {
    let start_year = inputs.start_year;
    let contribution_end = start_year + inputs.duration_years as i32;
    let end_year = TARGET_YEAR.max(contribution_end);

    let mut pricer = FiatPricer {
        projector: PriceProjector::new(inputs.price_model),
        base_year: start_year,
        exchange_rate: inputs.exchange_rate,
        inflation_rate: inputs.inflation_rate,
    };

    let mut btc_held = match inputs.initial_holding {
        InitialHolding::Coin(btc) => ensure_non_negative(btc, "initial holding")?,
        InitialHolding::Fiat(amount) => {
            let amount = ensure_non_negative(amount, "initial fiat amount")?;
            // Raw first-year median, before taper and inflation.
            let day0 = days_at_year_start(start_year)
                .ok_or(EngineError::YearOutOfRange(start_year))?;
            let initial_price = median_price(day0) * inputs.exchange_rate;
            ensure_finite(amount / initial_price, "initial holding", start_year)?
        }
    };

    let mut rows = Vec::with_capacity((end_year - start_year + 1).max(0) as usize);
    for year in start_year..=end_year {
        let is_contribution_period = year < contribution_end;
        let btc_price_fiat = pricer.price_for_year(year)?;
        let annual_contribution_fiat = if is_contribution_period {
            inputs.monthly_contribution * 12.0
        } else {
            0.0
        };
        let btc_purchased = ensure_finite(
            annual_contribution_fiat / btc_price_fiat,
            "coins purchased",
            year,
        )?;

        btc_held += btc_purchased;
        rows.push(AccumulationRow {
            year,
            btc_price_fiat,
            annual_contribution_fiat,
            btc_purchased,
            cumulative_btc_held: btc_held,
            total_value_fiat: ensure_finite(btc_held * btc_price_fiat, "total value", year)?,
            is_contribution_period,
        });
    }

    debug!(
        start_year,
        end_year,
        final_btc = btc_held,
        "accumulation simulated"
    );
    Ok(rows)
}

fn active_phase(inputs: &WithdrawalInputs, year: i32) -> (PhaseLabel, WithdrawalPlan) {
    match inputs.second_phase {
        Some(phase) if year >= phase.start_year => (PhaseLabel::Second, phase.plan),
        _ => (PhaseLabel::First, inputs.plan),
    }
}

/// Gross fiat to withdraw this year before clamping to the balance.
fn gross_withdrawal(plan: WithdrawalPlan, balance_fiat: f64, tax_rate: f64) -> f64 {
    match plan {
        WithdrawalPlan::FixedMonthly(monthly) => monthly * 12.0 / (1.0 - tax_rate / 100.0),
        WithdrawalPlan::PercentOfBalance(rate) => balance_fiat * rate / 100.0,
    }
}

pub fn simulate_drawdown(inputs: &WithdrawalInputs) -> Result<Vec<WithdrawalRow>, EngineError> {
    let mut pricer = FiatPricer {
        projector: PriceProjector::new(inputs.price_model),
        base_year: inputs.base_year,
        exchange_rate: inputs.exchange_rate,
        inflation_rate: inputs.inflation_rate,
    };

    let mut remaining_btc = ensure_non_negative(inputs.initial_btc, "initial holding")?;
    let mut rows = Vec::with_capacity((TARGET_YEAR - inputs.start_year + 1).max(0) as usize);
    for year in inputs.start_year..=TARGET_YEAR {
        let (phase_label, plan) = active_phase(inputs, year);
        let btc_price_fiat = pricer.price_for_year(year)?;
        let balance_fiat = remaining_btc * btc_price_fiat;

        let requested_fiat = gross_withdrawal(plan, balance_fiat, inputs.tax_rate);
        let requested_btc = ensure_finite(requested_fiat / btc_price_fiat, "withdrawal", year)?;
        let withdrawal_btc = requested_btc.max(0.0).min(remaining_btc.max(0.0));
        let withdrawal_fiat = withdrawal_btc * btc_price_fiat;

        let effective_rate = match plan {
            WithdrawalPlan::PercentOfBalance(rate) => Some(rate),
            WithdrawalPlan::FixedMonthly(_) if balance_fiat > 0.0 => {
                Some(requested_fiat / balance_fiat * 100.0)
            }
            WithdrawalPlan::FixedMonthly(_) => None,
        };

        remaining_btc = if withdrawal_btc >= remaining_btc {
            0.0
        } else {
            remaining_btc - withdrawal_btc
        };

        rows.push(WithdrawalRow {
            year,
            btc_price_fiat,
            phase_label,
            mode: plan.mode(),
            effective_rate,
            withdrawal_fiat,
            withdrawal_btc,
            remaining_btc,
            total_value_fiat: remaining_btc * btc_price_fiat,
        });
    }

    debug!(
        start_year = inputs.start_year,
        rows = rows.len(),
        final_btc = remaining_btc,
        "drawdown simulated"
    );
    Ok(rows)
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawdownSummary {
    pub depletion_year: Option<i32>,
    /// Full years withdrawn before the depletion year; `None` if the balance
    /// outlasts the horizon.
    pub years_lasted: Option<i32>,
    pub value_after_five_years: Option<f64>,
}

impl DrawdownSummary {
    pub fn from_rows(rows: &[WithdrawalRow], base_year: i32) -> Self {
        let first_year = rows.first().map(|row| row.year);
        let depletion_year = rows
            .iter()
            .find(|row| row.remaining_btc <= 0.0)
            .map(|row| row.year);
        let years_lasted = match (depletion_year, first_year) {
            (Some(depleted), Some(first)) => Some(depleted - first),
            _ => None,
        };
        let value_after_five_years = rows
            .iter()
            .find(|row| row.year == base_year + 5)
            .map(|row| row.total_value_fiat);
        Self {
            depletion_year,
            years_lasted,
            value_after_five_years,
        }
    }
}

fn into_outcome<R>(
    result: Result<Result<Vec<R>, EngineError>, ValidationError>,
    kind: &'static str,
) -> SimulationOutcome<R> {
    match result {
        Ok(Ok(rows)) => {
            info!(kind, rows = rows.len(), "simulation completed");
            SimulationOutcome::success(rows)
        }
        Ok(Err(err)) => {
            info!(kind, error = %err, "simulation aborted");
            SimulationOutcome::failure(simulation_error_fields(&err))
        }
        Err(err) => {
            info!(kind, fields = err.0.len(), "simulation inputs rejected");
            SimulationOutcome::failure(err.into_fields())
        }
    }
}

pub fn run_accumulation(form: &AccumulationForm, current_year: i32) -> SimulationOutcome<AccumulationRow> {
    let result = validate_accumulation(form, current_year).map(|inputs| simulate_accumulation(&inputs));
    into_outcome(result, "accumulation")
}

pub fn run_drawdown(form: &WithdrawalForm, current_year: i32) -> SimulationOutcome<WithdrawalRow> {
    let result = validate_withdrawal(form, current_year).map(|inputs| simulate_drawdown(&inputs));
    into_outcome(result, "drawdown")
}
