//! Locale-formatted numbers.
//!
//! Bank exports and statements write amounts as `2 454,4500`, `-1.234,56`,
//! `42 124 Kč` or `$0.15`. Parsing is exact (`Decimal`) and returns `None`
//! instead of a zero sentinel when the text is not a number.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Characters dropped wherever they appear in an amount.
const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DecimalSeparator {
    #[serde(rename = ",")]
    Comma,
    #[default]
    #[serde(rename = ".")]
    Period,
}

impl DecimalSeparator {
    pub fn as_char(self) -> char {
        match self {
            DecimalSeparator::Comma => ',',
            DecimalSeparator::Period => '.',
        }
    }

    /// The punctuation treated as a thousands separator under this convention.
    pub fn thousands(self) -> char {
        match self {
            DecimalSeparator::Comma => '.',
            DecimalSeparator::Period => ',',
        }
    }
}

/// Parses a locale-formatted number.
///
/// Whitespace (including no-break spaces) and the thousands punctuation are
/// dropped, the decimal separator becomes `.`, and a trailing alphabetic unit
/// such as `Kč` or `USD` is ignored when it is separated by whitespace.
pub fn parse_locale_number(input: &str, separator: DecimalSeparator) -> Option<Decimal> {
    let text = strip_unit(input.trim());

    let mut cleaned = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            c if c.is_whitespace() => {}
            c if CURRENCY_SYMBOLS.contains(&c) => {}
            '\u{2212}' => cleaned.push('-'),
            c if c == separator.thousands() => {}
            c if c == separator.as_char() => cleaned.push('.'),
            c => cleaned.push(c),
        }
    }

    let cleaned = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if cleaned.is_empty() || cleaned.contains('_') {
        return None;
    }
    Decimal::from_str(cleaned).ok()
}

/// Formats a value the way Czech statements print it: space-grouped thousands
/// and the given decimal separator. Inverse of [`parse_locale_number`].
pub fn format_locale_number(value: Decimal, separator: DecimalSeparator) -> String {
    let digits = value.abs().to_string();
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + int_part.len() / 3 + 1);
    if value.is_sign_negative() && !value.is_zero() {
        out.push('-');
    }
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    if let Some(frac_part) = frac_part {
        out.push(separator.as_char());
        out.push_str(frac_part);
    }
    out
}

fn strip_unit(text: &str) -> &str {
    match text.rsplit_once(char::is_whitespace) {
        Some((head, unit)) if !unit.is_empty() && unit.chars().all(char::is_alphabetic) => {
            head.trim_end()
        }
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[rstest]
    #[case("2 454,4500", DecimalSeparator::Comma, "2454.45")]
    #[case("7,2420", DecimalSeparator::Comma, "7.242")]
    #[case("42 124 Kč", DecimalSeparator::Comma, "42124")]
    #[case("-1.234,56", DecimalSeparator::Comma, "-1234.56")]
    #[case("\u{2212}1 200 Kč", DecimalSeparator::Comma, "-1200")]
    #[case("1\u{a0}500,00", DecimalSeparator::Comma, "1500")]
    #[case("-150.00", DecimalSeparator::Period, "-150")]
    #[case("+150.00", DecimalSeparator::Period, "150")]
    #[case("1,234.56", DecimalSeparator::Period, "1234.56")]
    #[case("$0.15", DecimalSeparator::Period, "0.15")]
    #[case("12.40 CZK", DecimalSeparator::Period, "12.40")]
    #[case("  0.02  ", DecimalSeparator::Period, "0.02")]
    fn test_parse_locale_number(
        #[case] input: &str,
        #[case] separator: DecimalSeparator,
        #[case] expected: &str,
    ) {
        assert_eq!(parse_locale_number(input, separator), Some(dec(expected)));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("abc")]
    #[case("12abc")]
    #[case("Kč")]
    #[case("1.2.3")]
    #[case("-")]
    fn test_parse_locale_number_rejects_residue(#[case] input: &str) {
        assert_eq!(parse_locale_number(input, DecimalSeparator::Period), None);
    }

    #[test]
    fn test_zero_is_a_value_not_a_failure() {
        assert_eq!(
            parse_locale_number("0,00", DecimalSeparator::Comma),
            Some(Decimal::ZERO)
        );
    }

    #[rstest]
    #[case("2454.45", DecimalSeparator::Comma, "2 454,45")]
    #[case("42124", DecimalSeparator::Comma, "42 124")]
    #[case("-1234567.5", DecimalSeparator::Period, "-1 234 567.5")]
    #[case("999", DecimalSeparator::Period, "999")]
    fn test_format_locale_number(
        #[case] value: &str,
        #[case] separator: DecimalSeparator,
        #[case] expected: &str,
    ) {
        assert_eq!(format_locale_number(dec(value), separator), expected);
    }

    #[rstest]
    #[case("2454.4500")]
    #[case("0.01")]
    #[case("-120500")]
    #[case("1000000.25")]
    fn test_locale_round_trip(#[case] value: &str) {
        for separator in [DecimalSeparator::Comma, DecimalSeparator::Period] {
            let text = format_locale_number(dec(value), separator);
            assert_eq!(parse_locale_number(&text, separator), Some(dec(value)));
        }
    }

    #[test]
    fn test_separator_serialization() {
        assert_eq!(serde_json::to_string(&DecimalSeparator::Comma).unwrap(), "\",\"");
        let parsed: DecimalSeparator = serde_json::from_str("\".\"").unwrap();
        assert_eq!(parsed, DecimalSeparator::Period);
    }
}
