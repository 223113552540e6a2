use serde::{Deserialize, Serialize};

use super::constants::{
    MEDIAN_INTERCEPT, MEDIAN_SLOPE, SUPPORT_INTERCEPT, SUPPORT_SLOPE, TRANSITION_START_YEAR,
};
use super::days::days_at_year_start;
use super::error::EngineError;
use super::numeric::{from_log10, log10_days};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceModel {
    #[serde(alias = "STANDARD")]
    Standard,
    #[serde(alias = "CONSERVATIVE")]
    Conservative,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecayProfile {
    pub target_scale: f64,
    pub decay_rate: f64,
}

impl PriceModel {
    pub fn decay_profile(self) -> DecayProfile {
        match self {
            PriceModel::Standard => DecayProfile {
                target_scale: 0.41,
                decay_rate: 0.2,
            },
            PriceModel::Conservative => DecayProfile {
                target_scale: 0.5,
                decay_rate: 0.25,
            },
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelOutput {
    #[serde(rename = "medianUSD")]
    pub median_usd: f64,
    #[serde(rename = "supportUSD")]
    pub support_usd: f64,
}

pub fn median_price(days: i64) -> f64 {
    from_log10(MEDIAN_INTERCEPT + MEDIAN_SLOPE * log10_days(days))
}

pub fn support_price(days: i64) -> f64 {
    from_log10(SUPPORT_INTERCEPT + SUPPORT_SLOPE * log10_days(days))
}

pub fn model_output(days: i64) -> ModelOutput {
    ModelOutput {
        median_usd: median_price(days),
        support_usd: support_price(days),
    }
}

/// Median price per calendar year with the post-transition taper applied.
///
/// The reference point at `TRANSITION_START_YEAR - 1` is resolved on the first
/// year that crosses the transition and reused for the rest of the run, so a
/// projector must not be shared between runs with different variants.
#[derive(Debug)]
pub struct PriceProjector {
    model: PriceModel,
    reference_usd: Option<f64>,
}

impl PriceProjector {
    pub fn new(model: PriceModel) -> Self {
        Self {
            model,
            reference_usd: None,
        }
    }

    pub fn median_usd_for_year(&mut self, year: i32) -> Result<f64, EngineError> {
        let days = days_at_year_start(year).ok_or(EngineError::YearOutOfRange(year))?;
        let raw = median_price(days);
        if year < TRANSITION_START_YEAR {
            return Ok(raw);
        }

        let reference = match self.reference_usd {
            Some(reference) => reference,
            None => {
                let reference_year = TRANSITION_START_YEAR - 1;
                let reference_days = days_at_year_start(reference_year)
                    .ok_or(EngineError::YearOutOfRange(reference_year))?;
                let reference = median_price(reference_days);
                self.reference_usd = Some(reference);
                reference
            }
        };

        let profile = self.model.decay_profile();
        let elapsed = f64::from(year - (TRANSITION_START_YEAR - 1));
        let scale = profile.target_scale
            + (1.0 - profile.target_scale) * (-profile.decay_rate * elapsed).exp();
        Ok(reference * (raw / reference).powf(scale))
    }
}
