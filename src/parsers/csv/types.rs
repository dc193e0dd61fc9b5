use crate::errors::RowError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Formats tried, in order, when the template's own format does not match.
pub const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Raw date cell of a bank CSV row.
///
/// The template format may carry a time (`%Y-%m-%d %H:%M:%S`); the time is
/// kept separately because most exports only have a calendar date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsvDate(String);

impl CsvDate {
    /// Parses with the template format first, then the fallback list.
    pub fn parse_with(&self, primary: &str) -> Result<(NaiveDate, Option<NaiveTime>), RowError> {
        let s = self.0.trim();

        if let Ok(datetime) = NaiveDateTime::parse_from_str(s, primary) {
            return Ok((datetime.date(), Some(datetime.time())));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, primary) {
            return Ok((date, None));
        }

        self.parse().map(|date| (date, None))
    }

    /// Parses with the fallback formats only.
    pub fn parse(&self) -> Result<NaiveDate, RowError> {
        let s = self.0.trim();
        FALLBACK_DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
            .ok_or_else(|| RowError::InvalidDate(s.to_string()))
    }
}

impl From<String> for CsvDate {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for CsvDate {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl TryFrom<CsvDate> for NaiveDate {
    type Error = RowError;

    fn try_from(date: CsvDate) -> Result<Self, Self::Error> {
        date.parse()
    }
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------
