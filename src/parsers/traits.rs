use crate::errors::StatementResult;
use crate::parsers::statement::{ParsedStatement, Provider};

/// A provider-specific investment statement parser.
///
/// Implementations hold only compiled patterns and static layouts, so one
/// instance can serve any number of documents concurrently.
pub trait StatementParser: Send + Sync {
    fn provider(&self) -> Provider;

    /// Cheap content sniffing; `filename`, when given, must also carry the
    /// extension this provider exports.
    fn is_supported(&self, filename: Option<&str>, content: &str) -> bool;

    fn parse(&self, content: &str) -> StatementResult<ParsedStatement>;
}
