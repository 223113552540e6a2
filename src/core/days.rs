use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::constants::{GENESIS_DAY, GENESIS_MONTH, GENESIS_YEAR};

const MS_PER_DAY: i64 = 86_400_000;

pub fn genesis_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(GENESIS_YEAR, GENESIS_MONTH, GENESIS_DAY).unwrap_or(NaiveDate::MIN)
}

pub fn days_since_genesis(date: NaiveDate) -> i64 {
    date.signed_duration_since(genesis_date()).num_days()
}

/// Day index of an instant, floored toward negative infinity.
pub fn days_since_genesis_at(instant: DateTime<Utc>) -> i64 {
    let genesis_ms = genesis_date()
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp_millis();
    (instant.timestamp_millis() - genesis_ms).div_euclid(MS_PER_DAY)
}

pub fn days_at_year_start(year: i32) -> Option<i64> {
    NaiveDate::from_ymd_opt(year, 1, 1).map(days_since_genesis)
}

pub fn date_at_day(days: i64) -> Option<NaiveDate> {
    genesis_date().checked_add_signed(chrono::Duration::try_days(days)?)
}
