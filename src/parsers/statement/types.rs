use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::StatementParseError;
use crate::types::ImportError;

/// Source of an investment statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provider {
    Fondee,
    Amundi,
    RevolutStocks,
    RevolutCrypto,
}

impl Provider {
    pub const ALL: [Provider; 4] = [
        Provider::Fondee,
        Provider::Amundi,
        Provider::RevolutStocks,
        Provider::RevolutCrypto,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Provider::Fondee => "fondee",
            Provider::Amundi => "amundi",
            Provider::RevolutStocks => "revolut-stocks",
            Provider::RevolutCrypto => "revolut-crypto",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Provider {
    type Err = StatementParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Provider::ALL
            .into_iter()
            .find(|provider| provider.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| StatementParseError::UnknownProvider(code.to_string()))
    }
}

/// One instrument position within a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,
    pub isin: Option<String>,
    /// Fund type or asset class
    pub category: String,
    pub units: Option<Decimal>,
    pub price_per_unit: Option<Decimal>,
    pub price_currency: Option<String>,
    pub total_value: Decimal,
    pub value_currency: String,
    pub price_date: Option<NaiveDate>,
}

/// Point-in-time state of one portfolio as printed on a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub provider: Provider,
    pub portfolio_name: Option<String>,
    pub contract_id: Option<String>,
    /// Reference currency of the totals
    pub currency: String,
    pub report_date: Option<NaiveDate>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub start_value: Option<Decimal>,
    pub end_value: Option<Decimal>,
    pub invested: Option<Decimal>,
    pub gain_loss: Option<Decimal>,
    pub fees: Option<Decimal>,
    pub holdings: Vec<Holding>,
}

impl PortfolioSnapshot {
    pub fn new(provider: Provider, currency: &str) -> Self {
        Self {
            provider,
            portfolio_name: None,
            contract_id: None,
            currency: currency.to_string(),
            report_date: None,
            period_start: None,
            period_end: None,
            start_value: None,
            end_value: None,
            invested: None,
            gain_loss: None,
            fees: None,
            holdings: Vec::new(),
        }
    }

    pub fn has_totals(&self) -> bool {
        [
            self.start_value,
            self.end_value,
            self.invested,
            self.gain_loss,
            self.fees,
        ]
        .iter()
        .any(Option::is_some)
    }

    /// Anything at all was recovered; otherwise the wrong provider was chosen.
    pub fn has_data(&self) -> bool {
        self.has_totals() || !self.holdings.is_empty()
    }

    /// `gain_loss = end_value - invested` when the statement omits it.
    pub fn derive_gain_loss(&mut self) {
        if self.gain_loss.is_none() {
            if let (Some(end), Some(invested)) = (self.end_value, self.invested) {
                self.gain_loss = Some(end - invested);
            }
        }
    }

    /// `invested = end_value - gain_loss` when the statement omits it.
    pub fn derive_invested(&mut self) {
        if self.invested.is_none() {
            if let (Some(end), Some(gain)) = (self.end_value, self.gain_loss) {
                self.invested = Some(end - gain);
            }
        }
    }
}

/// Output of a statement parser: the snapshot plus rows that could not be used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedStatement {
    pub snapshot: PortfolioSnapshot,
    pub errors: Vec<ImportError>,
}

/// A parsed statement with the provider-specific completeness checks applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementPreview {
    pub snapshot: PortfolioSnapshot,
    pub errors: Vec<ImportError>,
    pub validation_errors: Vec<String>,
}

impl StatementPreview {
    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    #[rstest]
    #[case("fondee", Provider::Fondee)]
    #[case("amundi", Provider::Amundi)]
    #[case("revolut-stocks", Provider::RevolutStocks)]
    #[case(" Revolut-Crypto ", Provider::RevolutCrypto)]
    fn test_provider_from_str(#[case] input: &str, #[case] expected: Provider) {
        assert_eq!(input.parse::<Provider>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            "trading212".parse::<Provider>(),
            Err(StatementParseError::UnknownProvider(code)) if code == "trading212"
        ));
    }

    #[test]
    fn test_provider_serde_matches_display() {
        for provider in Provider::ALL {
            let json = serde_json::to_string(&provider).unwrap();
            assert_eq!(json, format!("\"{}\"", provider));
        }
    }

    #[test]
    fn test_gain_fallback() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Amundi, "CZK");
        snapshot.end_value = Some(dec(120_500));
        snapshot.invested = Some(dec(105_000));
        snapshot.derive_gain_loss();
        assert_eq!(snapshot.gain_loss, Some(dec(15_500)));
    }

    #[test]
    fn test_explicit_gain_is_kept() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Amundi, "CZK");
        snapshot.end_value = Some(dec(120_500));
        snapshot.invested = Some(dec(105_000));
        snapshot.gain_loss = Some(dec(15_000));
        snapshot.derive_gain_loss();
        assert_eq!(snapshot.gain_loss, Some(dec(15_000)));
    }

    #[test]
    fn test_invested_fallback() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Fondee, "CZK");
        snapshot.end_value = Some(dec(153_200));
        snapshot.gain_loss = Some(dec(3_200));
        snapshot.derive_invested();
        assert_eq!(snapshot.invested, Some(dec(150_000)));
    }

    #[test]
    fn test_has_data() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Fondee, "CZK");
        assert!(!snapshot.has_data());

        snapshot.fees = Some(Decimal::ZERO);
        assert!(snapshot.has_totals());
        assert!(snapshot.has_data());
    }
}
