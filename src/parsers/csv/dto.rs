use chrono::{NaiveDate, NaiveTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Placeholder description when a row has no descriptive fields at all.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown transaction";

/// Separator between the source fields that make up `raw_description`.
pub const RAW_DESCRIPTION_SEPARATOR: &str = " | ";

/// One normalized bank transaction. Created once per CSV row, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveTime>,
    pub description: String,
    pub raw_description: String,
    /// Magnitude, never negative; direction lives in `is_expense`
    pub amount: Decimal,
    pub is_expense: bool,
    pub currency: String,
    pub balance_after: Option<Decimal>,
    /// Bank-supplied id, or the content fingerprint when the bank has none
    pub external_id: String,
    pub bank_category: Option<String>,
    /// Canonical category from the template vocabulary
    pub mapped_category: Option<String>,
    pub merchant_name: Option<String>,
    pub counterparty_account: Option<String>,
    pub row_number: usize,
}

/// Read-only view over one decoded record.
pub(super) struct CsvRow<'r> {
    record: &'r StringRecord,
}

impl<'r> CsvRow<'r> {
    pub(super) fn new(record: &'r StringRecord) -> Self {
        Self { record }
    }

    pub(super) fn len(&self) -> usize {
        self.record.len()
    }

    /// Trimmed cell; `None` when the column is unmapped, out of range or blank.
    pub(super) fn get(&self, column: Option<usize>) -> Option<&'r str> {
        column
            .and_then(|index| self.record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Trimmed cell of a mandatory column; empty when out of range.
    pub(super) fn cell(&self, column: usize) -> &'r str {
        self.record.get(column).map(str::trim).unwrap_or_default()
    }
}

/// Display text, fingerprint text and merchant derived from a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Description {
    pub(super) display: String,
    pub(super) raw: String,
    pub(super) merchant: Option<String>,
}
