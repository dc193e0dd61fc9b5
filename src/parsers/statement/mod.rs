//! Investment statement parsers producing [`PortfolioSnapshot`]s.

mod key_value;
mod patterns;
mod positional;
mod registry;
mod trades;
mod types;
mod validate;

pub use key_value::{KeyValueLayout, KeyValueStatementParser, FONDEE};
pub use patterns::{
    first_column, parse_czech_number, parse_dotted_date, parse_spaced_date, split_period,
    value_after, CzkAmount, CZECH_NUMBER,
};
pub use positional::{IdentifierMap, PositionalLayout, PositionalStatementParser, AMUNDI};
pub use registry::StatementParserRegistry;
pub use trades::{
    split_sections, DividendColumns, DividendIncome, Position, Section, TradeAggregation,
    TradeAggregationParser, TradeColumns, TradeLayout, REVOLUT_CRYPTO, REVOLUT_STOCKS,
};
pub use types::{Holding, ParsedStatement, PortfolioSnapshot, Provider, StatementPreview};
pub use validate::validate_snapshot;

use crate::errors::{StatementParseError, StatementResult};
use crate::types::ImportError;

/// Wraps a finished snapshot, rejecting one with neither totals nor holdings.
pub(crate) fn finish(
    snapshot: PortfolioSnapshot,
    errors: Vec<ImportError>,
) -> StatementResult<ParsedStatement> {
    if !snapshot.has_data() {
        return Err(StatementParseError::NoDataRecovered {
            provider: snapshot.provider.to_string(),
        });
    }

    log::info!(
        "{}: parsed statement with {} holdings, {} row errors",
        snapshot.provider,
        snapshot.holdings.len(),
        errors.len()
    );
    Ok(ParsedStatement { snapshot, errors })
}

/// Statements arrive as extracted PDF text, under either name.
pub(crate) fn has_text_extension(name: &str) -> bool {
    let name = name.to_lowercase();
    name.ends_with(".txt") || name.ends_with(".pdf")
}

pub(crate) fn has_csv_extension(name: &str) -> bool {
    name.to_lowercase().ends_with(".csv")
}
