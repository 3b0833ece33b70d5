//! Display formatting for dashboard figures.
//!
//! All functions here are total and deterministic: the same input always
//! yields the same string and nothing is read from the environment.

use chrono::{DateTime, TimeZone};
use std::fmt;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Symbol prefix for a currency code, following en-US display conventions.
///
/// Codes without a dedicated symbol render as the code itself followed by a
/// non-breaking space.
pub fn currency_prefix(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    match code.as_str() {
        "USD" => "$".to_string(),
        "GBP" => "£".to_string(),
        "EUR" => "€".to_string(),
        "JPY" => "¥".to_string(),
        "INR" => "₹".to_string(),
        "CAD" => "CA$".to_string(),
        "AUD" => "A$".to_string(),
        "NZD" => "NZ$".to_string(),
        "HKD" => "HK$".to_string(),
        "MXN" => "MX$".to_string(),
        _ => format!("{}\u{a0}", code),
    }
}

/// Group the digits of a magnitude in threes with `,`.
pub fn group_thousands(magnitude: u64) -> String {
    let digits = magnitude.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Whole-unit currency string: symbol prefix, thousands separators, no
/// decimals. Negative amounts carry a leading `-`.
pub fn format_currency(amount: i64, currency: &str) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    format!(
        "{}{}{}",
        sign,
        currency_prefix(currency),
        group_thousands(amount.unsigned_abs())
    )
}

/// Percentage with the shortest decimal representation (`19.4%`, `68%`).
pub fn format_percent(value: f64) -> String {
    format!("{}%", value)
}

/// en-US wall-clock label used for the "last updated" header, in whatever
/// zone `ts` carries. Callers convert to local time before formatting.
pub fn format_updated_at<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    ts.format("%-I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn test_zero_usd() {
        assert_eq!(format_currency(0, "USD"), "$0");
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(format_currency(19217, "USD"), "$19,217");
        assert_eq!(format_currency(231212, "USD"), "$231,212");
        assert_eq!(format_currency(1_000_000, "USD"), "$1,000,000");
        assert_eq!(format_currency(999, "USD"), "$999");
    }

    #[test]
    fn test_gbp_differs_from_usd() {
        let gbp = format_currency(29808, "GBP");
        assert_eq!(gbp, "£29,808");
        assert_ne!(gbp, format_currency(29808, "USD"));
    }

    #[test]
    fn test_prefixed_dollar_variants() {
        assert_eq!(format_currency(56123, "CAD"), "CA$56,123");
        assert_eq!(format_currency(42966, "AUD"), "A$42,966");
    }

    #[test]
    fn test_unknown_code_falls_back_to_code_prefix() {
        assert_eq!(format_currency(1500, "CHF"), "CHF\u{a0}1,500");
    }

    #[test]
    fn test_lowercase_code_is_normalized() {
        assert_eq!(format_currency(1500, "usd"), "$1,500");
    }

    #[test]
    fn test_negative_amount() {
        assert_eq!(format_currency(-1400, "USD"), "-$1,400");
        assert_eq!(format_currency(i64::MIN, "USD"), "-$9,223,372,036,854,775,808");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(format_currency(4601, "EUR"), format_currency(4601, "EUR"));
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(19.4), "19.4%");
        assert_eq!(format_percent(68.0), "68%");
    }

    #[test]
    fn test_updated_at_label() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        assert_eq!(format_updated_at(&ts), "2:07:09 PM");
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 0, 30, 0).unwrap();
        assert_eq!(format_updated_at(&ts), "12:30:00 AM");
    }

    #[test]
    fn test_updated_at_follows_offset() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let pacific = FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(format_updated_at(&ts.with_timezone(&pacific)), "6:07:09 AM");
    }
}
