use super::constants::LOG_EPSILON;

/// Base-10 logarithm that never sees a non-positive argument.
pub fn safe_log10(value: f64) -> f64 {
    // f64::max ignores NaN, so NaN also collapses to the floor.
    value.max(LOG_EPSILON).log10()
}

pub fn from_log10(log_value: f64) -> f64 {
    10f64.powf(log_value)
}

pub fn log10_days(days: i64) -> f64 {
    safe_log10(days.max(1) as f64)
}

/// Formats a signed percentage, e.g. `+1.5%`; `-` when unavailable.
pub fn format_percentage(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => {
            let sign = if v >= 0.0 { "+" } else { "" };
            format!("{sign}{v:.decimals$}%")
        }
        _ => "-".to_string(),
    }
}
