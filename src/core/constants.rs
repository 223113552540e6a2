use super::model::PriceModel;

pub const GENESIS_YEAR: i32 = 2009;
pub const GENESIS_MONTH: u32 = 1;
pub const GENESIS_DAY: u32 = 3;

pub const MEDIAN_INTERCEPT: f64 = -17.015_933_13;
pub const MEDIAN_SLOPE: f64 = 5.845_093_76;
pub const SUPPORT_INTERCEPT: f64 = -17.668;
pub const SUPPORT_SLOPE: f64 = 5.926;

/// Floor applied to every logarithm argument.
pub const LOG_EPSILON: f64 = 1e-7;

pub const TRANSITION_START_YEAR: i32 = 2039;
pub const TARGET_YEAR: i32 = 2050;

pub const MIN_DURATION_YEARS: u32 = 1;
pub const MAX_DURATION_YEARS: u32 = 50;

pub const DEFAULT_EXCHANGE_RATE: f64 = 150.0;
pub const DEFAULT_INFLATION_RATE: f64 = 0.0;
pub const DEFAULT_TAX_RATE: f64 = 20.315;
pub const DEFAULT_PRICE_MODEL: PriceModel = PriceModel::Standard;

pub const STRONG_BUY_BELOW: f64 = -50.0;
pub const UNDERVALUED_BELOW: f64 = -30.0;
pub const SLIGHTLY_UNDERVALUED_BELOW: f64 = -10.0;
pub const FAIR_UP_TO: f64 = 10.0;
pub const CAUTION_UP_TO: f64 = 30.0;
pub const OVERHEATED_UP_TO: f64 = 70.0;
pub const NEAR_SUPPORT_BELOW: f64 = 10.0;
