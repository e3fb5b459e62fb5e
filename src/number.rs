//! Locale-independent numeric text codec for cell values.
//!
//! Cell values are written with at most 15 significant digits, which is the
//! precision spreadsheet applications themselves serialize. Rust's float
//! formatting and parsing never consult the process locale, so `.` is always the
//! decimal separator.

use crate::error::{Error, Result};

/// Upper bound on significant digits written for a cell value.
pub const MAX_SIGNIFICANT_DIGITS: usize = 15;

/// Longest text a formatted number may occupy.
const FORMAT_BUFFER_LEN: usize = 32;

/// Format a double as the shortest decimal text that parses back to the same
/// value, capped at 15 significant digits.
///
/// Negative zero is written as `0`. Integral values have no trailing `.0`.
/// Very large or very small magnitudes switch to `1.5E+20` notation.
pub fn format_number(value: f64) -> Result<String> {
    if !value.is_finite() {
        return Err(Error::FormattingOverflow(value));
    }
    if value == 0.0 {
        return Ok("0".into());
    }

    let (digits, exponent) = significant_digits(value.abs());

    let mut out = String::with_capacity(FORMAT_BUFFER_LEN);
    if value < 0.0 {
        out.push('-');
    }

    if !(-4..MAX_SIGNIFICANT_DIGITS as i32).contains(&exponent) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push('E');
        out.push(if exponent < 0 { '-' } else { '+' });
        let magnitude = exponent.unsigned_abs();
        if magnitude < 10 {
            out.push('0');
        }
        out.push_str(&magnitude.to_string());
    } else if exponent < 0 {
        out.push_str("0.");
        for _ in 0..(-exponent - 1) {
            out.push('0');
        }
        out.push_str(&digits);
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(&digits);
            for _ in digits.len()..int_len {
                out.push('0');
            }
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    }

    if out.len() > FORMAT_BUFFER_LEN {
        return Err(Error::FormattingOverflow(value));
    }
    Ok(out)
}

/// Decimal digits (no leading or trailing zeros) and base-10 exponent of a
/// positive finite value.
fn significant_digits(value: f64) -> (String, i32) {
    // `{:e}` yields the shortest digits that round-trip
    let shortest = format!("{:e}", value);
    let (mut digits, mut exponent) = split_scientific(&shortest);

    if digits.len() > MAX_SIGNIFICANT_DIGITS {
        let rounded = format!("{:.*e}", MAX_SIGNIFICANT_DIGITS - 1, value);
        (digits, exponent) = split_scientific(&rounded);
    }

    let trimmed = digits.trim_end_matches('0');
    if trimmed.is_empty() {
        ("0".into(), exponent)
    } else {
        (trimmed.to_string(), exponent)
    }
}

fn split_scientific(text: &str) -> (String, i32) {
    let (mantissa, exponent) = text.split_once('e').unwrap_or((text, "0"));
    let digits = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits, exponent.parse().unwrap_or(0))
}

/// Parse numeric cell text written by [`format_number`] (or by a spreadsheet
/// application).
///
/// Only digits, sign characters, `.` and an `e`/`E` exponent marker are accepted;
/// locale-specific separators, `inf` and `NaN` are rejected.
pub fn parse_number(text: &str) -> Result<f64> {
    let text = text.trim();
    if text.is_empty()
        || !text
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return Err(Error::InvalidNumber(text.to_string()));
    }

    text.parse::<f64>()
        .map_err(|_| Error::InvalidNumber(text.to_string()))
}
