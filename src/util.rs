use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

/// Format a decimal amount with thousand separators and 2 decimal places.
/// e.g. `1234567.89` → `"1,234,567.89"`
pub(crate) fn format_amount(val: Decimal) -> String {
    let abs = val.abs();
    let formatted = format!("{abs:.2}");
    let mut parts = formatted.split('.');
    let int_part = parts.next().unwrap_or("0");
    let dec_part = parts.next().unwrap_or("00");

    let with_commas: String = int_part
        .as_bytes()
        .rchunks(3)
        .rev()
        .map(|chunk| std::str::from_utf8(chunk).unwrap_or(""))
        .collect::<Vec<_>>()
        .join(",");

    if val < Decimal::ZERO {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

/// Truncate a string to `max` visible characters, appending "…" if truncated.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }
    let truncated: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{truncated}…")
}

/// Parse a user-typed amount such as `500`, `-42.50` or `$1,200`.
pub(crate) fn parse_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
    Decimal::from_str(cleaned.trim()).with_context(|| format!("Invalid amount: {s}"))
}

/// Parse "YYYY-MM" into (year, month).
pub(crate) fn parse_month(s: &str) -> Result<(i32, u32)> {
    let Some((year, month)) = s.split_once('-') else {
        bail!("Invalid month '{s}', expected YYYY-MM");
    };
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in '{s}'"))?;
    let month: u32 = month
        .parse()
        .with_context(|| format!("Invalid month in '{s}'"))?;
    if !(1..=12).contains(&month) {
        bail!("Month out of range in '{s}'");
    }
    Ok((year, month))
}
