use std::fs;

use crate::errors::{StatementParseError, StatementResult};
use crate::parsers::prelude::*;
use crate::types::PreviewResult;

/// Entry point for bank CSV exports.
///
/// Without an explicit template the export is sniffed against the registry;
/// without a registry the built-in templates are used.
#[derive(Default)]
pub struct CsvImportBuilder<'r> {
    content: Option<Vec<u8>>,
    filepath: Option<String>,
    template: Option<String>,
    registry: Option<&'r TemplateRegistry>,
}

impl<'r> CsvImportBuilder<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: &[u8]) -> Self {
        self.content = Some(content.to_vec());
        self
    }

    pub fn filename(mut self, filename: &str) -> Self {
        self.filepath = Some(filename.to_string());
        self
    }

    pub fn template(mut self, code: &str) -> Self {
        self.template = Some(code.to_string());
        self
    }

    pub fn registry(mut self, registry: &'r TemplateRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn preview(self) -> StatementResult<PreviewResult> {
        let content = self
            .content
            .map(Ok)
            .unwrap_or_else(|| {
                self.filepath
                    .as_deref()
                    .ok_or(StatementParseError::MissingContentAndFilepath)
                    .and_then(|path| fs::read(path).map_err(Into::into))
            })?;

        let builtin;
        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                builtin = TemplateRegistry::builtin();
                &builtin
            }
        };

        let (template, detected) = match self.template.as_deref() {
            Some(code) => {
                let template = registry
                    .get(code)
                    .ok_or_else(|| StatementParseError::UnknownTemplate(code.to_string()))?;
                (template, None)
            }
            None => {
                let template = registry
                    .detect(&String::from_utf8_lossy(&content))
                    .ok_or_else(|| StatementParseError::UnknownTemplate("generic".to_string()))?;
                (template, Some(template.code.clone()))
            }
        };

        let mut preview = CsvRowParser::new(template)?.parse(&content)?;
        preview.detected_template = detected;
        Ok(preview)
    }
}

/// Entry point for investment statements: extracted PDF text or broker CSV.
#[derive(Default)]
pub struct StatementBuilder<'r> {
    content: Option<String>,
    filepath: Option<String>,
    provider: Option<Provider>,
    registry: Option<&'r StatementParserRegistry>,
}

impl<'r> StatementBuilder<'r> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: &str) -> Self {
        self.content = Some(content.to_string());
        self
    }

    pub fn filename(mut self, filename: &str) -> Self {
        self.filepath = Some(filename.to_string());
        self
    }

    pub fn provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn registry(mut self, registry: &'r StatementParserRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn parse(self) -> StatementResult<ParsedStatement> {
        let content = self
            .content
            .map(Ok)
            .unwrap_or_else(|| {
                self.filepath
                    .as_deref()
                    .ok_or(StatementParseError::MissingContentAndFilepath)
                    .and_then(|path| fs::read_to_string(path).map_err(Into::into))
            })?;

        let builtin;
        let registry = match self.registry {
            Some(registry) => registry,
            None => {
                builtin = StatementParserRegistry::builtin()?;
                &builtin
            }
        };

        let parser = match self.provider {
            Some(provider) => registry
                .get(provider)
                .ok_or_else(|| StatementParseError::UnknownProvider(provider.to_string()))?,
            None => registry
                .detect(self.filepath.as_deref(), &content)
                .ok_or(StatementParseError::ProviderNotDetected)?,
        };

        parser.parse(&content)
    }

    /// Parses and runs the provider's completeness checks.
    pub fn preview(self) -> StatementResult<StatementPreview> {
        let ParsedStatement { snapshot, errors } = self.parse()?;
        let validation_errors = validate_snapshot(&snapshot);
        for problem in &validation_errors {
            log::warn!("{}: {}", snapshot.provider, problem);
        }

        Ok(StatementPreview {
            snapshot,
            errors,
            validation_errors,
        })
    }
}
