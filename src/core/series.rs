use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::constants::TARGET_YEAR;
use super::days::{date_at_day, days_since_genesis, days_since_genesis_at};
use super::model::{median_price, support_price};
use super::types::PricePoint;

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSeriesPoint {
    pub date: NaiveDate,
    pub days_since_genesis: i64,
    pub price: Option<f64>,
    pub median_model: f64,
    pub support_model: f64,
    pub is_future: bool,
}

impl ModelSeriesPoint {
    fn at_day(days: i64, date: NaiveDate, price: Option<f64>, is_future: bool) -> Self {
        Self {
            date,
            days_since_genesis: days,
            price,
            median_model: median_price(days),
            support_model: support_price(days),
            is_future,
        }
    }
}

/// Observed samples (one per day, last sample wins) followed by projected
/// points every `step_days` up to and including `until`, never past the
/// last day of `TARGET_YEAR`.
pub fn build_model_series(
    history: &[PricePoint],
    until: NaiveDate,
    step_days: u32,
) -> Vec<ModelSeriesPoint> {
    let mut by_day: BTreeMap<i64, f64> = BTreeMap::new();
    for point in history {
        by_day.insert(days_since_genesis_at(point.timestamp), point.price);
    }

    let mut series = Vec::with_capacity(by_day.len());
    for (&days, &price) in &by_day {
        if let Some(date) = date_at_day(days) {
            series.push(ModelSeriesPoint::at_day(days, date, Some(price), false));
        }
    }

    let step = i64::from(step_days.max(1));
    let last_observed = by_day.keys().next_back().copied();
    let until_days = days_since_genesis(until.min(series_horizon()));
    let mut days = last_observed.map_or(0, |d| d + step);
    while days <= until_days {
        if let Some(date) = date_at_day(days) {
            series.push(ModelSeriesPoint::at_day(days, date, None, true));
        }
        days += step;
    }

    debug!(
        observed = by_day.len(),
        total = series.len(),
        "built model series"
    );
    series
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct SeriesKey {
    samples: usize,
    first: Option<(DateTime<Utc>, u64)>,
    last: Option<(DateTime<Utc>, u64)>,
    until: NaiveDate,
    step_days: u32,
}

impl SeriesKey {
    fn new(history: &[PricePoint], until: NaiveDate, step_days: u32) -> Self {
        let fingerprint = |p: &PricePoint| (p.timestamp, p.price.to_bits());
        Self {
            samples: history.len(),
            first: history.first().map(fingerprint),
            last: history.last().map(fingerprint),
            until,
            step_days,
        }
    }
}

#[derive(Debug, Default)]
pub struct SeriesCache {
    entry: Option<(SeriesKey, Vec<ModelSeriesPoint>)>,
}

impl SeriesCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(
        &mut self,
        history: &[PricePoint],
        until: NaiveDate,
        step_days: u32,
    ) -> &[ModelSeriesPoint] {
        let key = SeriesKey::new(history, until, step_days);
        let stale = !matches!(&self.entry, Some((cached, _)) if *cached == key);
        if stale {
            let series = build_model_series(history, until, step_days);
            self.entry = Some((key, series));
        }
        match &self.entry {
            Some((_, series)) => series,
            None => &[],
        }
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn is_cached(&self) -> bool {
        self.entry.is_some()
    }
}

/// Last date a projected series point can fall on.
pub fn series_horizon() -> NaiveDate {
    NaiveDate::from_ymd_opt(TARGET_YEAR, 12, 31).unwrap_or(NaiveDate::MAX)
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn sample(date: NaiveDate, price: f64) -> PricePoint {
        PricePoint {
            timestamp: midnight_utc(date),
            price,
        }
    }

    #[test]
    fn observed_points_precede_projected_points() {
        let history = vec![
            sample(ymd(2024, 1, 2), 45_000.0),
            sample(ymd(2024, 1, 1), 44_000.0),
        ];
        let series = build_model_series(&history, ymd(2024, 1, 31), 7);

        assert_eq!(series[0].date, ymd(2024, 1, 1));
        assert_eq!(series[0].price, Some(44_000.0));
        assert!(!series[1].is_future);
        let future: Vec<_> = series.iter().filter(|p| p.is_future).collect();
        assert_eq!(future.len(), 4);
        assert_eq!(future[0].date, ymd(2024, 1, 9));
        assert!(future.iter().all(|p| p.price.is_none()));
        assert!(series.windows(2).all(|w| w[0].days_since_genesis < w[1].days_since_genesis));
    }

    #[test]
    fn duplicate_days_keep_the_last_sample() {
        let history = vec![
            sample(ymd(2023, 5, 1), 1.0),
            PricePoint {
                timestamp: midnight_utc(ymd(2023, 5, 1)) + chrono::Duration::hours(6),
                price: 2.0,
            },
        ];
        let series = build_model_series(&history, ymd(2023, 5, 1), 1);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].price, Some(2.0));
    }

    #[test]
    fn model_curves_are_attached_to_every_point() {
        let series = build_model_series(&[sample(ymd(2020, 1, 1), 7_000.0)], ymd(2020, 3, 1), 30);
        for point in &series {
            assert_eq!(point.median_model, median_price(point.days_since_genesis));
            assert!(point.median_model > point.support_model);
        }
    }

    #[test]
    fn projection_stops_at_the_horizon() {
        let series = build_model_series(&[], ymd(9999, 12, 31), 1);
        let last = series.last().expect("points");
        assert_eq!(last.date, ymd(TARGET_YEAR, 12, 31));
        let horizon_days = days_since_genesis(series_horizon());
        assert_eq!(series.len() as i64, horizon_days + 1);
    }

    #[test]
    fn cache_rebuilds_only_when_inputs_change() {
        let mut cache = SeriesCache::new();
        let history = vec![sample(ymd(2024, 1, 1), 44_000.0)];
        let first_len = cache.get_or_build(&history, ymd(2024, 2, 1), 7).len();
        assert!(cache.is_cached());

        let again_len = cache.get_or_build(&history, ymd(2024, 2, 1), 7).len();
        assert_eq!(first_len, again_len);

        let extended = vec![
            sample(ymd(2024, 1, 1), 44_000.0),
            sample(ymd(2024, 1, 2), 45_000.0),
        ];
        let rebuilt = cache.get_or_build(&extended, ymd(2024, 2, 1), 7);
        assert_eq!(rebuilt[1].price, Some(45_000.0));

        cache.invalidate();
        assert!(!cache.is_cached());
    }
}
