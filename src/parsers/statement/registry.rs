use super::key_value::KeyValueStatementParser;
use super::positional::PositionalStatementParser;
use super::trades::TradeAggregationParser;
use super::types::Provider;
use crate::errors::StatementResult;
use crate::parsers::traits::StatementParser;

/// Caller-owned table of statement parsers, tried in insertion order.
pub struct StatementParserRegistry {
    parsers: Vec<Box<dyn StatementParser>>,
}

impl StatementParserRegistry {
    pub fn new() -> Self {
        Self {
            parsers: Vec::new(),
        }
    }

    /// Every provider this crate knows. Fails only if a built-in pattern does not compile.
    pub fn builtin() -> StatementResult<Self> {
        let mut registry = Self::new();
        registry.register(Box::new(KeyValueStatementParser::fondee()?));
        registry.register(Box::new(PositionalStatementParser::amundi()?));
        registry.register(Box::new(TradeAggregationParser::revolut_stocks()));
        registry.register(Box::new(TradeAggregationParser::revolut_crypto()));
        Ok(registry)
    }

    /// Appends a parser. When two share a provider, `get` returns the earlier one.
    pub fn register(&mut self, parser: Box<dyn StatementParser>) {
        self.parsers.push(parser);
    }

    pub fn get(&self, provider: Provider) -> Option<&dyn StatementParser> {
        self.parsers
            .iter()
            .find(|parser| parser.provider() == provider)
            .map(Box::as_ref)
    }

    /// First parser that recognizes the content.
    pub fn detect(&self, filename: Option<&str>, content: &str) -> Option<&dyn StatementParser> {
        let parser = self
            .parsers
            .iter()
            .find(|parser| parser.is_supported(filename, content))
            .map(Box::as_ref);

        match parser {
            Some(parser) => log::debug!("detected statement provider '{}'", parser.provider()),
            None => log::debug!("no statement provider recognized {:?}", filename),
        }
        parser
    }

    pub fn providers(&self) -> Vec<Provider> {
        self.parsers.iter().map(|parser| parser.provider()).collect()
    }
}

impl Default for StatementParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
