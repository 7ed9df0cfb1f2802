//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Formats an amount in minor units as a decimal string, e.g. `1998` as `19.98`.
///
/// Usage in templates: `{{ snapshot.total_amount()|minor_units }}`
#[askama::filter_fn]
pub fn minor_units(amount: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_minor_units(&amount.to_string()))
}

fn format_minor_units(raw: &str) -> String {
    let Ok(amount) = raw.parse::<i64>() else {
        return raw.to_string();
    };
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}
