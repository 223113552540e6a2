use std::collections::BTreeMap;

use thiserror::Error;

/// Per-field validation messages keyed by the camelCase input name.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub const SIMULATION_ERROR_KEY: &str = "simulation";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("year {0} cannot be represented as a calendar date")]
    YearOutOfRange(i32),

    #[error("non-finite {quantity} in year {year}")]
    NonFinite { quantity: &'static str, year: i32 },

    #[error("{quantity} must be a finite amount of at least 0, got {value}")]
    NegativeAmount { quantity: &'static str, value: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} invalid input field(s)", .0.len())]
pub struct ValidationError(pub FieldErrors);

impl ValidationError {
    pub fn into_fields(self) -> FieldErrors {
        self.0
    }
}

pub(crate) fn ensure_finite(value: f64, quantity: &'static str, year: i32) -> Result<f64, EngineError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFinite { quantity, year })
    }
}

pub(crate) fn ensure_non_negative(value: f64, quantity: &'static str) -> Result<f64, EngineError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(EngineError::NegativeAmount { quantity, value })
    }
}

pub(crate) fn simulation_error_fields(err: &EngineError) -> FieldErrors {
    let mut fields = FieldErrors::new();
    fields.insert(SIMULATION_ERROR_KEY, format!("Simulation error: {err}"));
    fields
}
