//! Statements whose holdings table wraps long fund names over several lines.
//!
//! A holding is anchored on its data line (`<category> <units> <price> <date>
//! <value> [<currency>]`). Up to two lines above it and one line below it may
//! carry the rest of the name; which neighbours belong to which holding is
//! decided purely by their position relative to other data lines.

use regex::Regex;
use rust_decimal::Decimal;

use super::patterns::{first_column, parse_czech_number, parse_dotted_date, value_after, CzkAmount, CZECH_NUMBER};
use super::types::{Holding, ParsedStatement, PortfolioSnapshot, Provider};
use super::{finish, has_text_extension};
use crate::errors::StatementResult;
use crate::parsers::traits::StatementParser;

#[derive(Debug, Clone, Copy)]
pub struct PositionalLayout {
    pub provider: Provider,
    pub currency: &'static str,
    pub portfolio_name: &'static str,
    pub markers: &'static [&'static str],
    pub contract_labels: &'static [&'static str],
    pub report_date_label: &'static str,
    pub period_label: &'static str,
    /// Tried in order; the first label followed by an amount wins
    pub end_value_labels: &'static [&'static str],
    pub invested_labels: &'static [&'static str],
    pub gain_loss_labels: &'static [&'static str],
    /// Lines searched for an amount, counting the label line
    pub total_window: usize,
    pub section_start: &'static str,
    pub section_end: &'static str,
    /// A line containing all of these is the table header
    pub column_header: &'static [&'static str],
    pub subtotal_marker: &'static str,
    /// Lines containing any of these are never part of a fund name
    pub skip_markers: &'static [&'static str],
    pub categories: &'static [&'static str],
    pub currencies: &'static [&'static str],
    pub identifier_section: &'static str,
    pub identifier_window: usize,
    /// Words too generic to match a fund name against the identifier list
    pub stopwords: &'static [&'static str],
}

pub const AMUNDI: PositionalLayout = PositionalLayout {
    provider: Provider::Amundi,
    currency: "CZK",
    portfolio_name: "Fondy",
    markers: &["STAVOVÝ VÝPIS"],
    contract_labels: &["Číslo účtu/smlouvy:", "Číslo smlouvy:"],
    report_date_label: "k datu",
    period_label: "Období výpisu:",
    end_value_labels: &[
        "CELKOVÁ HODNOTA MAJETKU",
        "CELKOVÁ HODNOTA PORTFOLIA",
        "CELKOVÁ HODNOTA",
    ],
    invested_labels: &["Celková investovaná částka", "Investovaná částka"],
    gain_loss_labels: &["Zisk / ztráta"],
    total_window: 11,
    section_start: "STAVOVÝ VÝPIS",
    section_end: "ZMĚNOVÝ VÝPIS",
    column_header: &["Měna", "Název fondu"],
    subtotal_marker: "CELKEM",
    skip_markers: &[
        "Název fondu",
        "CELKEM",
        "Měna",
        "Klient:",
        "Kategorie",
        "Stavový výpis",
        "STAVOVÝ VÝPIS",
        "ZMĚNOVÝ VÝPIS",
    ],
    categories: &[
        "Akciový fond",
        "Smíšený fond",
        "Dluhopisový fond",
        "Fond fondů",
        "Peněžní fond",
    ],
    currencies: &["CZK", "EUR", "USD"],
    identifier_section: "Seznam ISIN",
    identifier_window: 30,
    stopwords: &["Fund", "Invest", "UCITS"],
};

/// ISIN to fund name pairs in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentifierMap {
    entries: Vec<(String, String)>,
}

impl IdentifierMap {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifier whose name contains, or is contained in, `name`.
    pub fn lookup_exact(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, listed)| name.contains(listed.as_str()) || listed.contains(name))
            .map(|(isin, _)| isin.as_str())
    }

    /// Identifier whose name contains any significant word of `name`.
    pub fn lookup_by_words(&self, name: &str, stopwords: &[&str]) -> Option<&str> {
        let words = significant_words(name, stopwords);
        self.entries
            .iter()
            .find(|(_, listed)| words.iter().any(|word| listed.contains(word)))
            .map(|(isin, _)| isin.as_str())
    }

    /// Fills `isin` on every holding: exact pass first, then word matching for the rest.
    pub fn resolve(&self, holdings: &mut [Holding], stopwords: &[&str]) {
        if self.is_empty() {
            return;
        }

        for holding in holdings.iter_mut() {
            holding.isin = self.lookup_exact(&holding.name).map(str::to_string);
        }

        for holding in holdings.iter_mut().filter(|h| h.isin.is_none()) {
            holding.isin = self.lookup_by_words(&holding.name, stopwords).map(str::to_string);
            if holding.isin.is_none() {
                log::warn!("no ISIN found for holding '{}'", holding.name);
            }
        }
    }
}

fn significant_words<'a>(name: &'a str, stopwords: &[&str]) -> Vec<&'a str> {
    name.split_whitespace()
        .map(|word| word.trim_matches(|c| matches!(c, '(' | ')' | '-' | '.' | ',')))
        .filter(|word| word.chars().count() > 3 && !stopwords.contains(word))
        .collect()
}

pub struct PositionalStatementParser {
    layout: &'static PositionalLayout,
    data_line: Regex,
    subtotal_currency: Regex,
    identifier: Regex,
    report_date: Regex,
    period: Regex,
    amount: CzkAmount,
}

impl PositionalStatementParser {
    pub fn new(layout: &'static PositionalLayout) -> StatementResult<Self> {
        const DATE: &str = r"\d{2}\.\d{2}\.\d{4}";

        let categories = alternation(layout.categories);
        let currencies = alternation(layout.currencies);

        Ok(Self {
            layout,
            data_line: Regex::new(&format!(
                r"({categories})\s+({num})\s+({num})\s+({DATE})\s+({num})(?:\s+({currencies}))?",
                num = CZECH_NUMBER,
            ))?,
            subtotal_currency: Regex::new(&format!(r"({currencies})\s*$"))?,
            identifier: Regex::new(r"\b([A-Z]{2}[A-Z0-9]{9}\d)\s+(.+?)(?:\s{2,}|$)")?,
            report_date: Regex::new(&format!(
                r"{}\s+({DATE})",
                regex::escape(layout.report_date_label)
            ))?,
            period: Regex::new(&format!(
                r"{}\s*({DATE})\s*[–—-]\s*({DATE})",
                regex::escape(layout.period_label)
            ))?,
            amount: CzkAmount::new()?,
        })
    }

    pub fn amundi() -> StatementResult<Self> {
        Self::new(&AMUNDI)
    }

    fn is_data_line(&self, line: &str) -> bool {
        self.data_line.is_match(line)
    }

    fn is_skip_line(&self, line: &str) -> bool {
        line.is_empty() || self.layout.skip_markers.iter().any(|m| line.contains(m))
    }

    /// Rebuilds the holding whose data line is at `cursor`.
    ///
    /// Returns the holding and the number of lines it occupies from `cursor`
    /// on (2 when a name suffix follows the data line). `value_currency` is
    /// empty when the data line does not print one.
    pub fn reconstruct_holding(&self, lines: &[&str], cursor: usize) -> Option<(Holding, usize)> {
        let line = lines.get(cursor)?.trim();
        let caps = self.data_line.captures(line)?;
        let category = caps.get(1)?;

        let mut prefix = Vec::with_capacity(2);
        for back in 1..=2 {
            let Some(index) = cursor.checked_sub(back) else {
                break;
            };
            let candidate = lines[index].trim();
            if self.is_skip_line(candidate) || self.is_data_line(candidate) {
                break;
            }
            // a data line right above means the candidate is that holding's suffix
            if index > 0 && self.is_data_line(lines[index - 1].trim()) {
                break;
            }
            prefix.push(candidate);
        }

        let mut fragments: Vec<&str> = prefix.into_iter().rev().collect();
        let same_line = line[..category.start()].trim();
        if !same_line.is_empty() {
            fragments.push(same_line);
        }

        let mut consumed = 1;
        if let Some(next) = lines.get(cursor + 1).map(|l| l.trim()) {
            let next_starts_holding = lines
                .get(cursor + 2)
                .is_some_and(|after| self.is_data_line(after.trim()));
            if !self.is_skip_line(next) && !self.is_data_line(next) && !next_starts_holding {
                fragments.push(next);
                consumed = 2;
            }
        }

        let name = fragments.join(" ").trim().to_string();
        if name.is_empty() {
            return None;
        }

        let units = parse_czech_number(&caps[2]);
        let price_per_unit = parse_czech_number(&caps[3]);
        let total_value = parse_czech_number(&caps[5])?;
        let currency = caps.get(6).map(|m| m.as_str().to_string());

        Some((
            Holding {
                name,
                isin: None,
                category: category.as_str().to_string(),
                units,
                price_per_unit,
                price_currency: currency.clone(),
                total_value,
                value_currency: currency.unwrap_or_default(),
                price_date: parse_dotted_date(&caps[4]),
            },
            consumed,
        ))
    }

    /// Holdings between the section markers, currencies filled from subtotal lines.
    pub fn holdings(&self, lines: &[&str]) -> Vec<Holding> {
        let layout = self.layout;
        let Some(start) = lines.iter().position(|l| l.contains(layout.section_start)) else {
            return Vec::new();
        };
        let end = lines[start + 1..]
            .iter()
            .position(|l| l.contains(layout.section_end))
            .map_or(lines.len(), |offset| start + 1 + offset);

        let mut holdings = Vec::new();
        let mut current_currency: Option<&str> = None;
        let mut cursor = start + 1;

        while cursor < end {
            let line = lines[cursor].trim();

            if layout.column_header.iter().all(|h| line.contains(h)) {
                cursor += 1;
                continue;
            }

            if line.contains(layout.subtotal_marker) {
                if let Some(caps) = self.subtotal_currency.captures(line) {
                    current_currency = caps.get(1).map(|m| m.as_str());
                }
                cursor += 1;
                continue;
            }

            match self.reconstruct_holding(lines, cursor) {
                Some((mut holding, consumed)) => {
                    if holding.value_currency.is_empty() {
                        holding.value_currency = current_currency.unwrap_or(layout.currency).to_string();
                    }
                    if holding.price_currency.is_none() {
                        holding.price_currency = Some(holding.value_currency.clone());
                    }
                    holdings.push(holding);
                    cursor += consumed;
                }
                None => cursor += 1,
            }
        }

        holdings
    }

    pub fn identifier_map(&self, lines: &[&str]) -> IdentifierMap {
        let Some(start) = lines
            .iter()
            .position(|l| l.contains(self.layout.identifier_section))
        else {
            return IdentifierMap::default();
        };

        let entries = lines[start..]
            .iter()
            .take(self.layout.identifier_window)
            .flat_map(|line| self.identifier.captures_iter(line.trim()))
            .map(|caps| (caps[1].to_string(), caps[2].trim().to_string()))
            .collect();

        IdentifierMap::new(entries)
    }

    fn contract_id(&self, lines: &[&str]) -> Option<String> {
        lines.iter().map(|l| l.trim()).find_map(|line| {
            self.layout
                .contract_labels
                .iter()
                .find(|label| line.starts_with(*label))
                .and_then(|label| value_after(line, label))
                .map(|value| first_column(value).to_string())
        })
    }

    fn first_total(&self, text: &str, labels: &[&str]) -> Option<Decimal> {
        labels
            .iter()
            .find_map(|label| self.amount.find_after(text, label, self.layout.total_window))
    }
}

impl StatementParser for PositionalStatementParser {
    fn provider(&self) -> Provider {
        self.layout.provider
    }

    fn is_supported(&self, filename: Option<&str>, content: &str) -> bool {
        let looks_like_statement = self.layout.markers.iter().all(|m| content.contains(m));
        match filename {
            Some(name) => has_text_extension(name) && looks_like_statement,
            None => looks_like_statement,
        }
    }

    fn parse(&self, content: &str) -> StatementResult<ParsedStatement> {
        let layout = self.layout;
        let lines: Vec<&str> = content.lines().collect();

        let mut snapshot = PortfolioSnapshot::new(layout.provider, layout.currency);
        snapshot.portfolio_name = Some(layout.portfolio_name.to_string());
        snapshot.contract_id = self.contract_id(&lines);

        if let Some(caps) = self.report_date.captures(content) {
            snapshot.report_date = parse_dotted_date(&caps[1]);
            snapshot.period_end = snapshot.report_date;
        }
        if let Some(caps) = self.period.captures(content) {
            snapshot.period_start = parse_dotted_date(&caps[1]);
            snapshot.period_end = parse_dotted_date(&caps[2]).or(snapshot.period_end);
        }

        snapshot.end_value = self.first_total(content, layout.end_value_labels);
        snapshot.invested = self.first_total(content, layout.invested_labels);
        snapshot.gain_loss = self.first_total(content, layout.gain_loss_labels);
        snapshot.derive_gain_loss();

        let identifiers = self.identifier_map(&lines);
        let mut holdings = self.holdings(&lines);
        identifiers.resolve(&mut holdings, layout.stopwords);
        snapshot.holdings = holdings;

        finish(snapshot, Vec::new())
    }
}

fn alternation(words: &[&str]) -> String {
    words
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|")
}
