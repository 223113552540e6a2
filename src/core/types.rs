use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::FieldErrors;
use super::model::PriceModel;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    #[serde(alias = "date")]
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InitialHoldingKind {
    /// A fiat amount converted at the first year's median price.
    #[serde(alias = "jpy")]
    Fiat,
    #[default]
    #[serde(alias = "btc")]
    Coin,
}

/// Accumulation form as submitted; every numeric field is raw text.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccumulationForm {
    pub initial_holding_kind: InitialHoldingKind,
    pub initial_fiat_amount: String,
    pub initial_btc_holding: String,
    pub monthly_contribution: String,
    pub years: String,
    pub price_model: Option<PriceModel>,
    pub exchange_rate: String,
    pub inflation_rate: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InitialHolding {
    Fiat(f64),
    Coin(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AccumulationInputs {
    pub start_year: i32,
    pub initial_holding: InitialHolding,
    pub monthly_contribution: f64,
    pub duration_years: u32,
    pub price_model: PriceModel,
    pub exchange_rate: f64,
    /// Annual inflation as a fraction, e.g. 0.02.
    pub inflation_rate: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccumulationRow {
    pub year: i32,
    pub btc_price_fiat: f64,
    pub annual_contribution_fiat: f64,
    pub btc_purchased: f64,
    pub cumulative_btc_held: f64,
    pub total_value_fiat: f64,
    pub is_contribution_period: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WithdrawalMode {
    #[default]
    Fixed,
    Percentage,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WithdrawalForm {
    #[serde(alias = "initialBTC")]
    pub initial_btc: String,
    pub start_year: String,
    pub price_model: Option<PriceModel>,
    #[serde(alias = "withdrawalType")]
    pub withdrawal_mode: WithdrawalMode,
    pub withdrawal_amount: String,
    pub withdrawal_rate: String,
    #[serde(alias = "showSecondPhase")]
    pub second_phase_enabled: bool,
    #[serde(alias = "secondPhaseYear")]
    pub second_phase_start_year: String,
    #[serde(alias = "secondPhaseType")]
    pub second_phase_mode: WithdrawalMode,
    pub second_phase_amount: String,
    pub second_phase_rate: String,
    pub tax_rate: String,
    pub exchange_rate: String,
    pub inflation_rate: String,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WithdrawalPlan {
    FixedMonthly(f64),
    /// Annual percentage of the fiat balance, e.g. 4.0.
    PercentOfBalance(f64),
}

impl WithdrawalPlan {
    pub fn mode(self) -> WithdrawalMode {
        match self {
            WithdrawalPlan::FixedMonthly(_) => WithdrawalMode::Fixed,
            WithdrawalPlan::PercentOfBalance(_) => WithdrawalMode::Percentage,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SecondPhase {
    pub start_year: i32,
    pub plan: WithdrawalPlan,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithdrawalInputs {
    pub base_year: i32,
    pub initial_btc: f64,
    pub start_year: i32,
    pub price_model: PriceModel,
    pub plan: WithdrawalPlan,
    pub second_phase: Option<SecondPhase>,
    /// Tax rate in percent applied to fixed withdrawals.
    pub tax_rate: f64,
    pub exchange_rate: f64,
    /// Annual inflation as a fraction.
    pub inflation_rate: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum PhaseLabel {
    #[serde(rename = "phase-1")]
    First,
    #[serde(rename = "phase-2")]
    Second,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRow {
    pub year: i32,
    pub btc_price_fiat: f64,
    pub phase_label: PhaseLabel,
    pub mode: WithdrawalMode,
    /// Share of the fiat balance withdrawn this year, in percent.
    pub effective_rate: Option<f64>,
    pub withdrawal_fiat: f64,
    pub withdrawal_btc: f64,
    pub remaining_btc: f64,
    pub total_value_fiat: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome<R> {
    pub rows: Vec<R>,
    pub errors: FieldErrors,
}

impl<R> SimulationOutcome<R> {
    pub fn success(rows: Vec<R>) -> Self {
        Self {
            rows,
            errors: FieldErrors::new(),
        }
    }

    pub fn failure(errors: FieldErrors) -> Self {
        Self {
            rows: Vec::new(),
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
