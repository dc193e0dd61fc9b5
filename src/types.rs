use serde::{Deserialize, Serialize};

use crate::errors::RowError;
use crate::parsers::csv::ParsedTransaction;

/// A row that could not be used, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportError {
    pub row: usize,
    pub message: String,
}

impl ImportError {
    pub fn new(row: usize, error: &RowError) -> Self {
        Self {
            row,
            message: error.to_string(),
        }
    }
}

/// Everything a user needs to review before committing a CSV import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub transactions: Vec<ParsedTransaction>,
    /// Decoded records after the header rows
    pub total_rows: usize,
    pub valid_rows: usize,
    /// Rows dropped by the template's state filter; never counted as errors
    pub skipped_rows: usize,
    pub errors: Vec<ImportError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_template: Option<String>,
}

/// Outcome of handing parsed transactions to a [`TransactionStore`](crate::TransactionStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub transactions_total: usize,
    pub transactions_imported: usize,
    pub transactions_skipped: usize,
    pub duplicates_found: usize,
    pub errors: Vec<ImportError>,
}
