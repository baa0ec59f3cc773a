use crate::error::{Result, SettlementError};
use chrono::NaiveDate;

pub const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

pub const UNDEFINED_DISPLAY: &str = "-";

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Rounds an unrounded minor-unit amount to whole cents.
pub fn round_minor_units(amount: f64) -> i64 {
    amount.round() as i64
}

pub fn minor_to_major(amount: f64) -> f64 {
    amount / MINOR_UNITS_PER_MAJOR
}

/// Renders a minor-unit amount in major units with two decimals, or a dash when undefined.
pub fn format_major_units(amount: Option<f64>) -> String {
    match amount {
        Some(amount) => format!("{:.2}", round_to(minor_to_major(amount), 2)),
        None => UNDEFINED_DISPLAY.to_string(),
    }
}

/// Renders a coefficient with four decimals, or a dash when undefined.
pub fn format_coefficient(coefficient: Option<f64>) -> String {
    match coefficient {
        Some(c) => format!("{:.4}", round_to(c, 4)),
        None => UNDEFINED_DISPLAY.to_string(),
    }
}

/// Cost per thousand views in major units, rounded to two decimals. Zero views give zero.
pub fn cpm(amount_minor: f64, views: u64) -> f64 {
    if views == 0 {
        return 0.0;
    }
    round_to(minor_to_major(amount_minor) / views as f64 * 1000.0, 2)
}

/// `numerator / denominator` as a percentage rounded to two decimals. Zero denominator gives zero.
pub fn percentage(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    round_to(numerator / denominator * 100.0, 2)
}

/// Parses a "YYYY-MM-DD" date
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        SettlementError::DateError(format!("Invalid date: {}. Expected YYYY-MM-DD", value))
    })
}
