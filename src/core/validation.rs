use super::constants::{DEFAULT_PRICE_MODEL, MAX_DURATION_YEARS, MIN_DURATION_YEARS, TARGET_YEAR};
use super::error::{FieldErrors, ValidationError};
use super::types::{
    AccumulationForm, AccumulationInputs, InitialHolding, InitialHoldingKind, SecondPhase,
    WithdrawalForm, WithdrawalInputs, WithdrawalMode, WithdrawalPlan,
};

const NON_NEGATIVE_MSG: &str = "Enter a value of 0 or greater";
const POSITIVE_MSG: &str = "Enter a value greater than 0";

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_year(raw: &str) -> Option<i32> {
    raw.trim().parse::<i32>().ok()
}

struct FieldCheck {
    errors: FieldErrors,
}

impl FieldCheck {
    fn new() -> Self {
        Self {
            errors: FieldErrors::new(),
        }
    }

    fn number(
        &mut self,
        field: &'static str,
        raw: &str,
        accept: impl Fn(f64) -> bool,
        message: &str,
    ) -> Option<f64> {
        match parse_number(raw).filter(|&v| accept(v)) {
            Some(v) => Some(v),
            None => {
                self.errors.insert(field, message.to_string());
                None
            }
        }
    }

    fn year(&mut self, field: &'static str, raw: &str, min: i32, max: i32) -> Option<i32> {
        match parse_year(raw).filter(|y| (min..=max).contains(y)) {
            Some(y) => Some(y),
            None => {
                self.errors
                    .insert(field, format!("Enter a year between {min} and {max}"));
                None
            }
        }
    }

    fn into_error(self) -> ValidationError {
        ValidationError(self.errors)
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.into_error())
        }
    }
}

pub fn validate_accumulation(
    form: &AccumulationForm,
    start_year: i32,
) -> Result<AccumulationInputs, ValidationError> {
    let mut check = FieldCheck::new();

    let initial_holding = match form.initial_holding_kind {
        InitialHoldingKind::Fiat => check
            .number(
                "initialFiatAmount",
                &form.initial_fiat_amount,
                |v| v >= 0.0,
                NON_NEGATIVE_MSG,
            )
            .map(InitialHolding::Fiat),
        InitialHoldingKind::Coin => check
            .number(
                "initialBtcHolding",
                &form.initial_btc_holding,
                |v| v >= 0.0,
                NON_NEGATIVE_MSG,
            )
            .map(InitialHolding::Coin),
    };
    let monthly = check.number(
        "monthlyContribution",
        &form.monthly_contribution,
        |v| v >= 0.0,
        NON_NEGATIVE_MSG,
    );
    let years = match form
        .years
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|y| (MIN_DURATION_YEARS..=MAX_DURATION_YEARS).contains(y))
    {
        Some(y) => Some(y),
        None => {
            check.errors.insert(
                "years",
                format!("Enter between {MIN_DURATION_YEARS} and {MAX_DURATION_YEARS} years"),
            );
            None
        }
    };
    let fx = check.number("exchangeRate", &form.exchange_rate, |v| v > 0.0, POSITIVE_MSG);
    let inflation = check.number(
        "inflationRate",
        &form.inflation_rate,
        |v| v >= 0.0,
        NON_NEGATIVE_MSG,
    );

    let (Some(initial_holding), Some(monthly), Some(years), Some(fx), Some(inflation)) =
        (initial_holding, monthly, years, fx, inflation)
    else {
        return Err(check.into_error());
    };
    check.finish(AccumulationInputs {
        start_year,
        initial_holding,
        monthly_contribution: monthly,
        duration_years: years,
        price_model: form.price_model.unwrap_or(DEFAULT_PRICE_MODEL),
        exchange_rate: fx,
        inflation_rate: inflation / 100.0,
    })
}

fn plan_for(
    check: &mut FieldCheck,
    mode: WithdrawalMode,
    amount: (&'static str, &str),
    rate: (&'static str, &str),
) -> Option<WithdrawalPlan> {
    match mode {
        WithdrawalMode::Fixed => check
            .number(amount.0, amount.1, |v| v > 0.0, POSITIVE_MSG)
            .map(WithdrawalPlan::FixedMonthly),
        WithdrawalMode::Percentage => check
            .number(
                rate.0,
                rate.1,
                |v| v > 0.0 && v <= 100.0,
                "Enter a rate greater than 0 and at most 100",
            )
            .map(WithdrawalPlan::PercentOfBalance),
    }
}

pub fn validate_withdrawal(
    form: &WithdrawalForm,
    base_year: i32,
) -> Result<WithdrawalInputs, ValidationError> {
    let mut check = FieldCheck::new();

    let initial_btc = check.number("initialBtc", &form.initial_btc, |v| v > 0.0, POSITIVE_MSG);
    let start_year = check.year("startYear", &form.start_year, base_year, TARGET_YEAR);
    let plan = plan_for(
        &mut check,
        form.withdrawal_mode,
        ("withdrawalAmount", &form.withdrawal_amount),
        ("withdrawalRate", &form.withdrawal_rate),
    );

    let second_phase = if form.second_phase_enabled {
        let min_year = start_year.map_or(base_year, |y| y + 1);
        let year = check.year(
            "secondPhaseStartYear",
            &form.second_phase_start_year,
            min_year,
            TARGET_YEAR,
        );
        let plan = plan_for(
            &mut check,
            form.second_phase_mode,
            ("secondPhaseAmount", &form.second_phase_amount),
            ("secondPhaseRate", &form.second_phase_rate),
        );
        match (year, plan) {
            (Some(start_year), Some(plan)) => Some(Some(SecondPhase { start_year, plan })),
            _ => None,
        }
    } else {
        Some(None)
    };

    let tax_rate = check.number(
        "taxRate",
        &form.tax_rate,
        |v| (0.0..100.0).contains(&v),
        "Enter a rate of at least 0 and below 100",
    );
    let fx = check.number("exchangeRate", &form.exchange_rate, |v| v > 0.0, POSITIVE_MSG);
    let inflation = check.number(
        "inflationRate",
        &form.inflation_rate,
        |v| v >= 0.0,
        NON_NEGATIVE_MSG,
    );

    let (
        Some(initial_btc),
        Some(start_year),
        Some(plan),
        Some(second_phase),
        Some(tax_rate),
        Some(fx),
        Some(inflation),
    ) = (
        initial_btc,
        start_year,
        plan,
        second_phase,
        tax_rate,
        fx,
        inflation,
    )
    else {
        return Err(check.into_error());
    };
    check.finish(WithdrawalInputs {
        base_year,
        initial_btc,
        start_year,
        price_model: form.price_model.unwrap_or(DEFAULT_PRICE_MODEL),
        plan,
        second_phase,
        tax_rate,
        exchange_rate: fx,
        inflation_rate: inflation / 100.0,
    })
}
