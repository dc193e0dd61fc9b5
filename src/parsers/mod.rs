pub mod csv;
pub mod statement;
pub mod traits;

pub mod prelude {
    pub use super::csv::{
        BankTemplate, CsvRowParser, FieldMapping, MerchantExtraction, ParsedTransaction,
        TemplateRegistry,
    };
    pub use super::statement::{
        validate_snapshot, Holding, KeyValueStatementParser, ParsedStatement, PortfolioSnapshot,
        PositionalStatementParser, Provider, StatementParserRegistry, StatementPreview,
        TradeAggregationParser,
    };
    pub use super::traits::StatementParser;
}
