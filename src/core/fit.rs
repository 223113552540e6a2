use tracing::debug;

use super::days::days_since_genesis_at;
use super::numeric::{log10_days, safe_log10};
use super::types::PricePoint;

const SPREAD_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Default)]
struct LogLogSums {
    n: f64,
    x: f64,
    y: f64,
    xy: f64,
    x2: f64,
    y2: f64,
}

impl LogLogSums {
    fn push(&mut self, x: f64, y: f64) {
        self.n += 1.0;
        self.x += x;
        self.y += y;
        self.xy += x * y;
        self.x2 += x * x;
        self.y2 += y * y;
    }

    fn r_squared(&self) -> f64 {
        let spread_x = self.n * self.x2 - self.x * self.x;
        let spread_y = self.n * self.y2 - self.y * self.y;
        // Cancellation leaves tiny residues for constant columns.
        if is_degenerate(spread_x, self.n * self.x2) || is_degenerate(spread_y, self.n * self.y2) {
            return 0.0;
        }
        let denominator = (spread_x * spread_y).sqrt();
        if denominator == 0.0 || !denominator.is_finite() {
            return 0.0;
        }
        let r = (self.n * self.xy - self.x * self.y) / denominator;
        let result = r * r;
        if result.is_finite() { result.min(1.0) } else { 0.0 }
    }
}

fn is_degenerate(spread: f64, scale: f64) -> bool {
    spread <= SPREAD_TOLERANCE * scale.abs().max(1.0)
}

/// Coefficient of determination of log10(price) against log10(days since genesis).
///
/// Degenerate input (empty, constant or non-finite series) yields `0.0`.
pub fn r_squared(series: &[PricePoint]) -> f64 {
    if series.is_empty() {
        debug!("r_squared called with an empty series");
        return 0.0;
    }

    let mut sums = LogLogSums::default();
    for point in series {
        let x = log10_days(days_since_genesis_at(point.timestamp));
        let y = safe_log10(point.price);
        if !x.is_finite() || !y.is_finite() {
            debug!(timestamp = %point.timestamp, price = point.price, "non-finite log value");
            return 0.0;
        }
        sums.push(x, y);
    }
    sums.r_squared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::days::date_at_day;
    use crate::core::model::median_price;
    use chrono::{NaiveTime, TimeZone, Utc};
    use proptest::prelude::{prop_assert, proptest};

    fn point_at_day(days: i64, price: f64) -> PricePoint {
        let date = date_at_day(days).expect("in range");
        PricePoint {
            timestamp: date.and_time(NaiveTime::MIN).and_utc(),
            price,
        }
    }

    #[test]
    fn empty_series_has_zero_fit() {
        assert_eq!(r_squared(&[]), 0.0);
    }

    #[test]
    fn synthetic_power_law_series_fits_almost_perfectly() {
        let series: Vec<_> = [500, 1_000, 2_000, 3_500, 5_000, 7_500, 10_000]
            .into_iter()
            .map(|days| point_at_day(days, median_price(days)))
            .collect();
        assert!(r_squared(&series) >= 0.999);
    }

    #[test]
    fn constant_series_degrades_to_zero() {
        let series: Vec<_> = (0..5).map(|_| point_at_day(1_000, 20_000.0)).collect();
        assert_eq!(r_squared(&series), 0.0);

        let flat_price: Vec<_> = [100, 200, 300]
            .into_iter()
            .map(|days| point_at_day(days, 5.0))
            .collect();
        assert_eq!(r_squared(&flat_price), 0.0);
    }

    #[test]
    fn non_positive_prices_do_not_poison_the_fit() {
        let series = vec![
            point_at_day(100, 0.0),
            point_at_day(1_000, -3.0),
            point_at_day(4_000, 30_000.0),
        ];
        let r2 = r_squared(&series);
        assert!(r2.is_finite());
        assert!((0.0..=1.0).contains(&r2));
    }

    #[test]
    fn pre_genesis_timestamps_clamp_to_day_one() {
        let early = PricePoint {
            timestamp: Utc.with_ymd_and_hms(2008, 6, 1, 0, 0, 0).single().expect("valid"),
            price: 1.0,
        };
        let series = vec![early, point_at_day(3_000, 5_000.0), point_at_day(6_000, 60_000.0)];
        let r2 = r_squared(&series);
        assert!((0.0..=1.0).contains(&r2));
    }

    proptest! {
        #[test]
        fn prop_r_squared_is_a_probability(prices in proptest::collection::vec(0.01f64..1e6, 1..40)) {
            let series: Vec<_> = prices
                .iter()
                .enumerate()
                .map(|(i, &p)| point_at_day(100 + 37 * i as i64, p))
                .collect();
            let r2 = r_squared(&series);
            prop_assert!((0.0..=1.0).contains(&r2));
        }
    }
}
