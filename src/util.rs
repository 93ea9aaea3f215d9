// Utility helpers for parsing, calendar checks and basic statistics.
//
// This module centralizes the "dirty" CSV/number/date handling so the
// rest of the code can assume clean, typed values.
use crate::error::DataError;
use crate::types::YearMonth;
use num_format::{Locale, ToFormattedString};

/// Checks whether `date` lies between `start` and `end`, inclusive on both
/// ends. All three are compared as the first day of their month, so the
/// order is correct across year boundaries.
///
/// A month outside 1..=12 in any argument is rejected with
/// [`DataError::InvalidMonth`].
pub fn check_date_in_range(
    start: YearMonth,
    end: YearMonth,
    date: YearMonth,
) -> Result<bool, DataError> {
    let start = start.to_date()?;
    let end = end.to_date()?;
    let date = date.to_date()?;
    Ok(start <= date && date <= end)
}

/// Parse a `YYYY-MM` (or `YYYY/MM`) string into a validated [`YearMonth`].
pub fn parse_year_month(s: &str) -> Result<YearMonth, DataError> {
    let invalid = || DataError::InvalidYearMonth(s.to_string());
    let trimmed = s.trim();
    let (year, month) = trimmed
        .split_once(['-', '/'])
        .ok_or_else(invalid)?;
    let year: i32 = year.trim().parse().map_err(|_| invalid())?;
    let month: u32 = month.trim().parse().map_err(|_| invalid())?;
    let ym = YearMonth::new(year, month);
    ym.to_date()?;
    Ok(ym)
}

/// Parse an integer cell. Accepts surrounding whitespace and a trailing
/// `.0` (spreadsheet exports often write whole numbers as floats); anything
/// with a real fractional part is rejected.
pub fn parse_int_field<T>(field: &'static str, s: &str) -> Result<T, DataError>
where
    T: std::str::FromStr,
{
    let s = s.trim();
    let digits = s.strip_suffix(".0").unwrap_or(s);
    digits.parse::<T>().map_err(|_| DataError::InvalidNumber {
        field,
        value: s.to_string(),
    })
}

pub fn average(v: &[f64]) -> f64 {
    // Standard arithmetic mean; returns 0 for an empty slice to avoid NaNs.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

pub fn median(mut v: Vec<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimal places plus locale-aware thousands separators
    // (e.g., `1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: u64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Used for counts in console messages (e.g., `9,855 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
