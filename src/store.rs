//! Hand-off of parsed transactions to persistent storage.

use std::fmt::Display;

use crate::errors::RowError;
use crate::parsers::csv::ParsedTransaction;
use crate::types::{ImportError, ImportResult};

/// Storage collaborator, keyed by `(account_id, external_id)`.
///
/// Implementations must see their own writes: a transaction inserted earlier
/// in the same import has to be returned by [`find`](TransactionStore::find).
pub trait TransactionStore {
    type Error: Display;

    fn find(
        &self,
        account_id: &str,
        external_id: &str,
    ) -> Result<Option<ParsedTransaction>, Self::Error>;

    /// Writes only the fields present in `backfill`; everything else is left alone.
    fn backfill(
        &mut self,
        account_id: &str,
        external_id: &str,
        backfill: &Backfill,
    ) -> Result<(), Self::Error>;

    fn insert(&mut self, account_id: &str, transaction: &ParsedTransaction) -> Result<(), Self::Error>;
}

/// Fields a re-import may fill on an already stored transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backfill {
    pub counterparty_account: Option<String>,
    pub merchant_name: Option<String>,
    pub bank_category: Option<String>,
}

impl Backfill {
    /// Values that `incoming` has and `stored` lacks, or `None` when there is nothing to fill.
    pub fn between(stored: &ParsedTransaction, incoming: &ParsedTransaction) -> Option<Self> {
        let backfill = Self {
            counterparty_account: missing(&stored.counterparty_account, &incoming.counterparty_account),
            merchant_name: missing(&stored.merchant_name, &incoming.merchant_name),
            bank_category: missing(&stored.bank_category, &incoming.bank_category),
        };
        (backfill != Self::default()).then_some(backfill)
    }
}

fn missing(stored: &Option<String>, incoming: &Option<String>) -> Option<String> {
    let stored_empty = stored.as_deref().is_none_or(str::is_empty);
    incoming
        .as_ref()
        .filter(|value| stored_empty && !value.is_empty())
        .cloned()
}

/// Inserts every transaction not already stored for `account_id`.
///
/// Duplicates are counted and skipped after backfilling empty fields. A store
/// failure becomes a row error for that transaction and the import continues.
pub fn import_transactions<S: TransactionStore>(
    store: &mut S,
    transactions: &[ParsedTransaction],
    account_id: &str,
) -> ImportResult {
    let mut result = ImportResult {
        transactions_total: transactions.len(),
        ..ImportResult::default()
    };

    for transaction in transactions {
        let row = transaction.row_number;
        let external_id = transaction.external_id.as_str();

        let existing = match store.find(account_id, external_id) {
            Ok(existing) => existing,
            Err(e) => {
                reject(&mut result, row, e);
                continue;
            }
        };

        if let Some(stored) = existing {
            result.duplicates_found += 1;
            result.transactions_skipped += 1;

            if let Some(backfill) = Backfill::between(&stored, transaction) {
                if let Err(e) = store.backfill(account_id, external_id, &backfill) {
                    log::warn!("row {}: backfill of {} failed: {}", row, external_id, e);
                }
            }
            continue;
        }

        match store.insert(account_id, transaction) {
            Ok(()) => result.transactions_imported += 1,
            Err(e) => reject(&mut result, row, e),
        }
    }

    log::info!(
        "imported {} of {} transactions into account {} ({} duplicates, {} errors)",
        result.transactions_imported,
        result.transactions_total,
        account_id,
        result.duplicates_found,
        result.errors.len()
    );
    result
}

fn reject(result: &mut ImportResult, row: usize, error: impl Display) {
    let error = RowError::Store(error.to_string());
    log::warn!("row {}: {}", row, error);
    result.errors.push(ImportError::new(row, &error));
    result.transactions_skipped += 1;
}
