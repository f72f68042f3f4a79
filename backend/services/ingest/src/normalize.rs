//! Numeric helpers shared by every platform's normalization step.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `numerator / denominator`, or 0 when the denominator is 0.
///
/// Never returns NaN or infinity.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Arithmetic mean, 0 for an empty input.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    safe_div(sum, count as f64)
}

/// Keep the `n` highest-ranked items, highest first.
///
/// The sort is stable, so ties stay in the order they were first seen.
pub fn top_n_by<T, F>(mut items: Vec<T>, n: usize, rank: F) -> Vec<T>
where
    F: Fn(&T) -> f64,
{
    items.sort_by(|a, b| rank(b).total_cmp(&rank(a)));
    items.truncate(n);
    items
}

/// Round to cents for currency totals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Deserialize a number that may arrive as a JSON number, a numeric string or null.
/// Anything unparseable counts as 0.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(value_to_f64).unwrap_or(0.0))
}

/// Like [`lenient_f64`], for counts. Negative or fractional inputs are clamped and rounded.
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_f64(deserializer)?;
    Ok(value.max(0.0).round() as u64)
}

fn value_to_f64(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}
