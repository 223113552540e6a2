use chrono::NaiveDate;
use serde::Serialize;

use super::days::days_since_genesis;
use super::fit::r_squared;
use super::model::{ModelOutput, model_output};
use super::position::{PositionMetric, assess_position};
use super::types::PricePoint;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub days_since_genesis: i64,
    pub current_price_usd: f64,
    pub model: ModelOutput,
    pub median_fiat: f64,
    pub support_fiat: f64,
    pub position: PositionMetric,
    pub change_24h_pct: Option<f64>,
    pub r_squared: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SnapshotOutcome {
    Ready(MarketSnapshot),
    NoData,
}

/// Percentage move from the second-most-recent daily sample to `current_usd`.
pub fn change_since_previous_close(daily: &[PricePoint], current_usd: f64) -> Option<f64> {
    if daily.len() < 2 {
        return None;
    }
    let mut by_recency: Vec<&PricePoint> = daily.iter().collect();
    by_recency.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let previous = by_recency[1].price;
    if previous == 0.0 || previous.is_nan() || current_usd == 0.0 {
        return None;
    }
    Some((current_usd - previous) / previous * 100.0)
}

/// The 24h change reads `daily`; the fit reads `weekly`.
pub fn market_snapshot(
    daily: &[PricePoint],
    weekly: &[PricePoint],
    current_usd: f64,
    fx_rate: f64,
    today: NaiveDate,
) -> SnapshotOutcome {
    if daily.is_empty() && weekly.is_empty() {
        return SnapshotOutcome::NoData;
    }

    let days = days_since_genesis(today);
    let model = model_output(days);
    SnapshotOutcome::Ready(MarketSnapshot {
        date: today,
        days_since_genesis: days,
        current_price_usd: current_usd,
        model,
        median_fiat: model.median_usd * fx_rate,
        support_fiat: model.support_usd * fx_rate,
        position: assess_position(current_usd, model),
        change_24h_pct: change_since_previous_close(daily, current_usd),
        r_squared: r_squared(weekly),
    })
}
