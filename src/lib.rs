//! Normalize bank CSV exports and investment statements into canonical records.
//!
//! Bank exports become [`ParsedTransaction`]s with a stable `external_id` for
//! idempotent re-import; statements become a [`PortfolioSnapshot`] with holdings.
//!
//! ```rust,ignore
//! use statement_import_rs::{CsvImportBuilder, StatementBuilder};
//!
//! let preview = CsvImportBuilder::new()
//!     .content(&csv_bytes)
//!     .template("csob")
//!     .preview()?;
//!
//! let statement = StatementBuilder::new()
//!     .filename("vypis-2026-01.txt")
//!     .preview()?;
//! ```

mod builder;
mod store;
mod types;

pub mod errors;
pub mod fingerprint;
pub mod number;
pub mod parsers;

pub use builder::{CsvImportBuilder, StatementBuilder};
pub use errors::{RowError, StatementParseError, StatementResult};
pub use fingerprint::transaction_fingerprint;
pub use number::{format_locale_number, parse_locale_number, DecimalSeparator};
pub use parsers::prelude::*;
pub use store::{import_transactions, Backfill, TransactionStore};
pub use types::{ImportError, ImportResult, PreviewResult};
