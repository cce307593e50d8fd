#![allow(clippy::unwrap_used)]

use rust_decimal_macros::dec;

use super::util::*;

// ── truncate ──────────────────────────────────────────────────

#[test]
fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
}

#[test]
fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 5), "hell…");
}

#[test]
fn test_truncate_zero_max() {
    assert_eq!(truncate("hello", 0), "");
}

#[test]
fn test_truncate_unicode() {
    assert_eq!(truncate("café résumé", 5), "café…");
}

// ── format_amount ──────────────────────────────────────────

#[test]
fn test_format_amount_basic() {
    assert_eq!(format_amount(dec!(1234.56)), "$1,234.56");
}

#[test]
fn test_format_amount_zero() {
    assert_eq!(format_amount(dec!(0)), "$0.00");
}

#[test]
fn test_format_amount_negative() {
    assert_eq!(format_amount(dec!(-42.50)), "-$42.50");
}

#[test]
fn test_format_amount_large() {
    assert_eq!(format_amount(dec!(1234567.89)), "$1,234,567.89");
}

#[test]
fn test_format_amount_single_digit() {
    assert_eq!(format_amount(dec!(5)), "$5.00");
}

// ── parse_amount ──────────────────────────────────────────

#[test]
fn test_parse_amount_plain() {
    assert_eq!(parse_amount("500").unwrap(), dec!(500));
    assert_eq!(parse_amount("-42.50").unwrap(), dec!(-42.50));
}

#[test]
fn test_parse_amount_with_symbols() {
    assert_eq!(parse_amount("$1,200.75").unwrap(), dec!(1200.75));
}

#[test]
fn test_parse_amount_rejects_garbage() {
    assert!(parse_amount("lots").is_err());
    assert!(parse_amount("").is_err());
}

// ── parse_month ──────────────────────────────────────────

#[test]
fn test_parse_month_valid() {
    assert_eq!(parse_month("2024-06").unwrap(), (2024, 6));
    assert_eq!(parse_month("2023-12").unwrap(), (2023, 12));
}

#[test]
fn test_parse_month_out_of_range() {
    assert!(parse_month("2024-13").is_err());
    assert!(parse_month("2024-00").is_err());
}

#[test]
fn test_parse_month_malformed() {
    assert!(parse_month("202406").is_err());
    assert!(parse_month("June-2024").is_err());
}
