//! Fixed-format statements where every figure sits on its own labeled line.

use super::patterns::{parse_spaced_date, split_period, value_after, CzkAmount};
use super::types::{ParsedStatement, PortfolioSnapshot, Provider};
use super::finish;
use crate::errors::StatementResult;
use crate::parsers::traits::StatementParser;

/// Labels of a key/value statement. Each label starts its line.
#[derive(Debug, Clone, Copy)]
pub struct KeyValueLayout {
    pub provider: Provider,
    pub currency: &'static str,
    /// Text that must appear for content detection
    pub markers: &'static [&'static str],
    pub portfolio_name: &'static str,
    pub period: &'static str,
    pub start_value: &'static str,
    pub end_value: &'static str,
    pub gain_loss: &'static str,
    pub fees: &'static str,
    /// A fee line containing any of these is an itemized sub-fee, not the total
    pub fee_exclusions: &'static [&'static str],
}

pub const FONDEE: KeyValueLayout = KeyValueLayout {
    provider: Provider::Fondee,
    currency: "CZK",
    markers: &["Název portfolia", "Koncová hodnota:"],
    portfolio_name: "Název portfolia",
    period: "Období",
    start_value: "Počáteční hodnota:",
    end_value: "Koncová hodnota:",
    gain_loss: "Zhodnocení:",
    fees: "Poplatek:",
    fee_exclusions: &["dodatečný", "ETF"],
};

/// Single-pass line scan over a [`KeyValueLayout`].
pub struct KeyValueStatementParser {
    layout: &'static KeyValueLayout,
    amount: CzkAmount,
}

impl KeyValueStatementParser {
    pub fn new(layout: &'static KeyValueLayout) -> StatementResult<Self> {
        Ok(Self {
            layout,
            amount: CzkAmount::new()?,
        })
    }

    pub fn fondee() -> StatementResult<Self> {
        Self::new(&FONDEE)
    }
}

impl StatementParser for KeyValueStatementParser {
    fn provider(&self) -> Provider {
        self.layout.provider
    }

    fn is_supported(&self, filename: Option<&str>, content: &str) -> bool {
        let looks_like_statement = self.layout.markers.iter().all(|m| content.contains(m));
        match filename {
            Some(name) => super::has_text_extension(name) && looks_like_statement,
            None => looks_like_statement,
        }
    }

    fn parse(&self, content: &str) -> StatementResult<ParsedStatement> {
        let layout = self.layout;
        let mut snapshot = PortfolioSnapshot::new(layout.provider, layout.currency);

        for line in content.lines().map(str::trim) {
            if line.starts_with(layout.portfolio_name) {
                snapshot.portfolio_name = value_after(line, layout.portfolio_name).map(str::to_string);
            } else if line.starts_with(layout.period) {
                let period = value_after(line, layout.period).and_then(split_period);
                match period.map(|(start, end)| (parse_spaced_date(start), parse_spaced_date(end))) {
                    Some((Some(start), Some(end))) => {
                        snapshot.period_start = Some(start);
                        snapshot.period_end = Some(end);
                        snapshot.report_date = Some(end);
                    }
                    _ => log::warn!("{}: unreadable period line '{}'", layout.provider, line),
                }
            } else if line.starts_with(layout.start_value) {
                snapshot.start_value = self.amount.find(line);
            } else if line.starts_with(layout.end_value) {
                snapshot.end_value = self.amount.find(line);
            } else if line.starts_with(layout.gain_loss) {
                snapshot.gain_loss = self.amount.find(line);
            } else if line.starts_with(layout.fees)
                && !layout.fee_exclusions.iter().any(|word| line.contains(word))
            {
                snapshot.fees = self.amount.find(line);
            }
        }

        snapshot.derive_invested();
        finish(snapshot, Vec::new())
    }
}
