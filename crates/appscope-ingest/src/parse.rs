//! Field coercion for the raw export columns.
//!
//! Every parser distinguishes a recognised missing value (`Ok(None)` or the
//! field's neutral default) from a value that is present but unusable
//! (`Err(ParseError)`), so callers can count recovered errors separately
//! from honest gaps.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ParseError;

const MISSING_TOKENS: &[&str] = &["", "nan", "n/a", "na", "null", "none"];

/// Returns `true` for blank cells and the spreadsheet spellings of "no value".
#[must_use]
pub fn is_missing(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    MISSING_TOKENS.contains(&lower.as_str())
}

/// Parses a star rating in `[0, 5]`.
///
/// # Errors
///
/// Returns [`ParseError`] for non-numeric or out-of-range values.
pub fn parse_rating(raw: &str) -> Result<Option<f64>, ParseError> {
    if is_missing(raw) {
        return Ok(None);
    }
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ParseError::new("rating", raw, "not a number"))?;
    if !(0.0..=5.0).contains(&value) {
        return Err(ParseError::new("rating", raw, "outside 0-5"));
    }
    Ok(Some(value))
}

/// Parses a review count such as `"159"`, `"1,234"`, `"3.0M"` or `"12k"`.
///
/// # Errors
///
/// Returns [`ParseError`] when the value is not a non-negative count.
pub fn parse_reviews(raw: &str) -> Result<u64, ParseError> {
    if is_missing(raw) {
        return Ok(0);
    }
    let cleaned = raw.trim().replace(',', "");
    let (digits, multiplier) = match cleaned.chars().last() {
        Some('M' | 'm') => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        Some('K' | 'k') => (&cleaned[..cleaned.len() - 1], 1_000.0),
        _ => (cleaned.as_str(), 1.0),
    };
    let value: f64 = digits
        .parse()
        .map_err(|_| ParseError::new("reviews", raw, "not a count"))?;
    to_count("reviews", raw, value * multiplier)
}

/// Parses an app size into megabytes.
///
/// `"19M"` is 19 MB, `"201k"` is 201/1024 MB, a bare `"19"` is taken as
/// megabytes and `"Varies with device"` is absent.
///
/// # Errors
///
/// Returns [`ParseError`] for any other unit or a non-numeric amount.
pub fn parse_size_mb(raw: &str) -> Result<Option<f64>, ParseError> {
    let trimmed = raw.trim();
    if is_missing(trimmed) || trimmed.eq_ignore_ascii_case("varies with device") {
        return Ok(None);
    }
    let (digits, divisor) = match trimmed.chars().last() {
        Some('M' | 'm') => (&trimmed[..trimmed.len() - 1], 1.0),
        Some('K' | 'k') => (&trimmed[..trimmed.len() - 1], 1024.0),
        _ => (trimmed, 1.0),
    };
    let value: f64 = digits
        .trim()
        .parse()
        .map_err(|_| ParseError::new("size", raw, "not a number"))?;
    if value < 0.0 || !value.is_finite() {
        return Err(ParseError::new("size", raw, "negative size"));
    }
    Ok(Some(value / divisor))
}

/// Parses an install bucket such as `"10,000+"` into its lower bound.
///
/// # Errors
///
/// Returns [`ParseError`] when the bucket has no numeric lower bound.
pub fn parse_installs(raw: &str) -> Result<u64, ParseError> {
    if is_missing(raw) {
        return Ok(0);
    }
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '+')
        .collect();
    cleaned
        .parse::<u64>()
        .map_err(|_| ParseError::new("installs", raw, "not an install bucket"))
}

/// Parses a list price. `"0"`, `"Free"` and blanks are zero.
///
/// # Errors
///
/// Returns [`ParseError`] when the value is not a non-negative amount
/// (for example `"$N/A"`).
pub fn parse_price(raw: &str) -> Result<Decimal, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("free") {
        return Ok(Decimal::ZERO);
    }
    parse_amount("price", raw)
}

/// Parses a currency amount, stripping `$`, thousands separators and whitespace.
///
/// # Errors
///
/// Returns [`ParseError`] for non-numeric or negative amounts.
pub fn parse_amount(field: &'static str, raw: &str) -> Result<Decimal, ParseError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();
    let value: Decimal = cleaned
        .parse()
        .map_err(|_| ParseError::new(field, raw, "not an amount"))?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ParseError::new(field, raw, "negative amount"));
    }
    Ok(value)
}

/// Parses a non-negative integer count. Spreadsheet exports sometimes write
/// whole numbers as `"1200.0"`; those are accepted.
///
/// # Errors
///
/// Returns [`ParseError`] for blanks, fractions and negative values.
pub fn parse_count(field: &'static str, raw: &str) -> Result<u64, ParseError> {
    let cleaned = raw.trim().replace(',', "");
    if let Ok(value) = cleaned.parse::<u64>() {
        return Ok(value);
    }
    let value: f64 = cleaned
        .parse()
        .map_err(|_| ParseError::new(field, raw, "not a count"))?;
    if value.fract() != 0.0 {
        return Err(ParseError::new(field, raw, "not a whole number"));
    }
    to_count(field, raw, value)
}

/// Parses a date written as `"January 7, 2018"` or `"2018-01-07"`.
///
/// # Errors
///
/// Returns [`ParseError`] when neither format matches.
pub fn parse_date(field: &'static str, raw: &str) -> Result<Option<NaiveDate>, ParseError> {
    if is_missing(raw) {
        return Ok(None);
    }
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%B %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S"))
        .map(Some)
        .map_err(|_| ParseError::new(field, raw, "unrecognised date"))
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn to_count(field: &'static str, raw: &str, value: f64) -> Result<u64, ParseError> {
    if !value.is_finite() || value < 0.0 || value > u64::MAX as f64 {
        return Err(ParseError::new(field, raw, "not a non-negative count"));
    }
    Ok(value.round() as u64)
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
