use serde::Serialize;

use super::constants::{
    CAUTION_UP_TO, FAIR_UP_TO, NEAR_SUPPORT_BELOW, OVERHEATED_UP_TO, SLIGHTLY_UNDERVALUED_BELOW,
    STRONG_BUY_BELOW, UNDERVALUED_BELOW,
};
use super::model::ModelOutput;

const INCALCULABLE_LABEL: &str = "Incalculable";
const NEAR_SUPPORT_SUFFIX: &str = " - near support floor";

const NEUTRAL_COLOR: &str = "#888888";
const BUY_COLOR: &str = "#1565C0";
const DANGER_COLOR: &str = "#B71C1C";
const NEAR_SUPPORT_COLOR: &str = "#D81B60";
const FALLBACK_COLOR: &str = "#FFFFFF";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionZone {
    StrongBuy,
    Undervalued,
    SlightlyUndervalued,
    Fair,
    Caution,
    Overheated,
    PeakWarning,
}

impl PositionZone {
    /// Buckets a position percentage; `None` for NaN.
    pub fn classify(position: f64) -> Option<Self> {
        if position.is_nan() {
            return None;
        }
        let zone = if position < STRONG_BUY_BELOW {
            PositionZone::StrongBuy
        } else if position < UNDERVALUED_BELOW {
            PositionZone::Undervalued
        } else if position < SLIGHTLY_UNDERVALUED_BELOW {
            PositionZone::SlightlyUndervalued
        } else if position <= FAIR_UP_TO {
            PositionZone::Fair
        } else if position <= CAUTION_UP_TO {
            PositionZone::Caution
        } else if position <= OVERHEATED_UP_TO {
            PositionZone::Overheated
        } else {
            PositionZone::PeakWarning
        };
        Some(zone)
    }

    pub fn label(self) -> &'static str {
        match self {
            PositionZone::StrongBuy => "Strong buy zone",
            PositionZone::Undervalued => "Undervalued",
            PositionZone::SlightlyUndervalued => "Slightly undervalued",
            PositionZone::Fair => "Fair range",
            PositionZone::Caution => "Rising (caution)",
            PositionZone::Overheated => "Overheated",
            PositionZone::PeakWarning => "Peak warning (consider selling)",
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            PositionZone::StrongBuy => BUY_COLOR,
            PositionZone::Undervalued => "#2196F3",
            PositionZone::SlightlyUndervalued => "#4CAF50",
            PositionZone::Fair => "#8BC34A",
            PositionZone::Caution => "#FF9800",
            PositionZone::Overheated => "#F44336",
            PositionZone::PeakWarning => DANGER_COLOR,
        }
    }
}

fn is_unavailable(value: f64) -> bool {
    value == 0.0 || value.is_nan()
}

pub fn relative_position(price: f64, median: f64) -> Option<f64> {
    if is_unavailable(price) || is_unavailable(median) {
        return None;
    }
    Some((price - median) / median * 100.0)
}

pub fn support_deviation(price: f64, support: f64) -> Option<f64> {
    if is_unavailable(price) || is_unavailable(support) {
        return None;
    }
    Some((price - support) / support * 100.0)
}

fn near_support(support_deviation: Option<f64>) -> bool {
    support_deviation.is_some_and(|d| d < NEAR_SUPPORT_BELOW)
}

pub fn position_label(position: Option<f64>, support_deviation: Option<f64>) -> String {
    let Some(zone) = position.and_then(PositionZone::classify) else {
        return INCALCULABLE_LABEL.to_string();
    };
    if near_support(support_deviation) {
        format!("{}{NEAR_SUPPORT_SUFFIX}", zone.label())
    } else {
        zone.label().to_string()
    }
}

pub fn position_color(position: Option<f64>, support_deviation: Option<f64>) -> &'static str {
    let Some(position) = position else {
        return NEUTRAL_COLOR;
    };
    // Extremes win over the support override.
    if position < STRONG_BUY_BELOW {
        return BUY_COLOR;
    }
    if position > OVERHEATED_UP_TO {
        return DANGER_COLOR;
    }
    if near_support(support_deviation) && (STRONG_BUY_BELOW..=OVERHEATED_UP_TO).contains(&position)
    {
        return NEAR_SUPPORT_COLOR;
    }
    PositionZone::classify(position).map_or(FALLBACK_COLOR, PositionZone::color)
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionMetric {
    pub relative_position_pct: Option<f64>,
    pub support_deviation_pct: Option<f64>,
    pub zone: Option<PositionZone>,
    pub label: String,
    pub color: &'static str,
}

pub fn assess_position(price_usd: f64, model: ModelOutput) -> PositionMetric {
    let position = relative_position(price_usd, model.median_usd);
    let deviation = support_deviation(price_usd, model.support_usd);
    PositionMetric {
        relative_position_pct: position,
        support_deviation_pct: deviation,
        zone: position.and_then(PositionZone::classify),
        label: position_label(position, deviation),
        color: position_color(position, deviation),
    }
}
