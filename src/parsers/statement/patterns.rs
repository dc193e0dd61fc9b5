//! Tokenizers shared by the text statement parsers.
//!
//! Every function returns `Option`: `None` means "not present", never zero.

use chrono::NaiveDate;
use regex::Regex;
use rust_decimal::Decimal;

use crate::errors::StatementResult;
use crate::number::{parse_locale_number, DecimalSeparator};

/// A Czech-formatted number: space (or no-break space) thousands, comma decimals.
pub const CZECH_NUMBER: &str = r"(?:\d{1,3}(?:[ \x{A0}]\d{3})+|\d+)(?:,\d+)?";

const CZK_AMOUNT: &str = r"([-−]?\b\d{1,3}(?:[ \x{A0}]\d{3})+(?:,\d+)?|[-−]?\b\d+(?:,\d+)?)\s*Kč";

/// Finds `<number> Kč` amounts such as `42 124 Kč` or `-1 250,50 Kč`.
///
/// The leading word boundary keeps a preceding date or counter from being
/// read as part of the amount.
#[derive(Debug, Clone)]
pub struct CzkAmount {
    re: Regex,
}

impl CzkAmount {
    pub fn new() -> StatementResult<Self> {
        Ok(Self {
            re: Regex::new(CZK_AMOUNT)?,
        })
    }

    /// First amount on the line.
    pub fn find(&self, text: &str) -> Option<Decimal> {
        self.re
            .captures_iter(text)
            .find_map(|caps| parse_czech_number(&caps[1]))
    }

    /// First amount within `window` lines starting at the first occurrence of `label`.
    pub fn find_after(&self, text: &str, label: &str, window: usize) -> Option<Decimal> {
        let start = text.find(label)?;
        text[start..]
            .lines()
            .take(window)
            .find_map(|line| self.find(line))
    }
}

pub fn parse_czech_number(text: &str) -> Option<Decimal> {
    parse_locale_number(text, DecimalSeparator::Comma)
}

/// `31.12.2025`
pub fn parse_dotted_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), "%d.%m.%Y").ok()
}

/// `1. 1. 2026` (spaces after the dots are optional).
pub fn parse_spaced_date(text: &str) -> Option<NaiveDate> {
    let cleaned = text.replace('.', " ");
    let mut parts = cleaned.split_whitespace();
    let day = parts.next()?.parse().ok()?;
    let month = parts.next()?.parse().ok()?;
    let year = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Splits `start – end` on the first en dash, em dash or hyphen.
pub fn split_period(text: &str) -> Option<(&str, &str)> {
    let (start, end) = text.split_once(['–', '—', '-'])?;
    Some((start.trim(), end.trim()))
}

/// Value after a label: `Název portfolia     Vyvážený` gives `Vyvážený`.
pub fn value_after<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let index = line.find(label)?;
    Some(line[index + label.len()..].trim()).filter(|value| !value.is_empty())
}

/// Text up to the first run of two or more spaces, as laid out in extracted PDF text.
pub fn first_column(text: &str) -> &str {
    let text = text.trim();
    text.find("  ").map_or(text, |end| &text[..end]).trim_end()
}
