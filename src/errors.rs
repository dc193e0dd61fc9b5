use thiserror::Error;

/// Failures that abort a whole file or statement.
///
/// Row-level problems never surface here; they are collected as
/// [`ImportError`](crate::ImportError) values next to the rows that parsed.
#[derive(Error, Debug)]
pub enum StatementParseError {
    /// The CSV reader could not decode the file (broken quoting, bad record)
    #[error("failed to parse CSV: {0}")]
    CsvDecodeFailed(#[from] csv::Error),

    /// Content is not valid UTF-8
    #[error("file is not valid UTF-8 text")]
    InvalidEncoding,

    /// Template declares an encoding other than UTF-8
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Template is internally inconsistent (bad delimiter, bad merchant pattern)
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Template JSON could not be deserialized
    #[error("invalid template configuration: {0}")]
    InvalidTemplateConfig(#[from] serde_json::Error),

    #[error("unknown bank template: {0}")]
    UnknownTemplate(String),

    #[error("unknown statement provider: {0}")]
    UnknownProvider(String),

    /// No registered statement parser recognized the content
    #[error("could not detect statement provider")]
    ProviderNotDetected,

    /// Neither totals nor holdings were found; the wrong provider was probably selected
    #[error("could not parse {provider} statement: no values found")]
    NoDataRecovered { provider: String },

    /// A built-in pattern failed to compile
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("failed to read file content: {0}")]
    ReadContentFailed(#[from] std::io::Error),

    /// The builder was called without content or a file path
    #[error("content or filepath is required")]
    MissingContentAndFilepath,
}

/// Per-row failure. Its `Display` text becomes the message of an `ImportError`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has only {found} columns, expected at least {expected}")]
    TooFewColumns { found: usize, expected: usize },

    #[error("invalid date '{0}': could not parse date")]
    InvalidDate(String),

    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    /// Adding the row to its running total exceeds the decimal range
    #[error("{field} total overflows")]
    Overflow { field: &'static str },

    #[error("storage rejected transaction: {0}")]
    Store(String),
}

pub type StatementResult<T> = Result<T, StatementParseError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RowError::TooFewColumns { found: 3, expected: 24 }, "row has only 3 columns, expected at least 24")]
    #[case(RowError::InvalidDate("32.13.2025".into()), "invalid date '32.13.2025': could not parse date")]
    #[case(RowError::InvalidAmount("abc".into()), "invalid amount 'abc'")]
    #[case(RowError::InvalidNumber { field: "fees", value: "x".into() }, "invalid fees 'x'")]
    #[case(RowError::Overflow { field: "cost basis" }, "cost basis total overflows")]
    fn test_row_error_messages(#[case] error: RowError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_no_data_message_names_provider() {
        let err = StatementParseError::NoDataRecovered {
            provider: "amundi".to_string(),
        };
        assert_eq!(err.to_string(), "could not parse amundi statement: no values found");
    }
}
