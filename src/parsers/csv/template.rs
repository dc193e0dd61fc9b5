//! Declarative bank CSV layouts.
//!
//! A template is chosen once per file and applies to every row. Built-in
//! templates cover CSOB, Revolut and a generic three-column export; callers can
//! load more from JSON and look them up through a [`TemplateRegistry`].

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{StatementParseError, StatementResult};
use crate::number::DecimalSeparator;

/// Column indices (zero-based) for each canonical field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub date: usize,
    pub amount: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance_after: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_name: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_account: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<usize>,
}

impl FieldMapping {
    /// Highest column index referenced by the mapping.
    pub fn max_column(&self) -> usize {
        [
            self.description,
            self.currency,
            self.balance_after,
            self.counterparty_name,
            self.counterparty_account,
            self.operation_type,
            self.message,
            self.category,
            self.external_id,
        ]
        .into_iter()
        .flatten()
        .chain([self.date, self.amount])
        .max()
        .unwrap_or(self.date)
    }
}

/// How to find the merchant behind a transaction.
///
/// `pattern` is applied to `field` and its first capture group wins (card
/// payments hide the shop in a memo such as `Místo: ALBERT PRAHA`). When it
/// does not match, `fallback_field` is used verbatim, then the counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantExtraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_field: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTemplate {
    pub code: String,
    pub name: String,
    pub delimiter: char,
    #[serde(default = "default_encoding")]
    pub encoding: String,
    #[serde(default)]
    pub skip_rows: usize,
    /// strftime format of the date column
    pub date_format: String,
    pub field_mapping: FieldMapping,
    /// Bank category label -> canonical category
    #[serde(default)]
    pub category_mapping: BTreeMap<String, String>,
    #[serde(default)]
    pub merchant_extraction: MerchantExtraction,
    #[serde(default)]
    pub amount_negative_is_expense: bool,
    #[serde(default)]
    pub decimal_separator: DecimalSeparator,
    /// Currency used when the currency column is unmapped or empty
    #[serde(default = "default_currency")]
    pub default_currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_column: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_required: Option<String>,
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_currency() -> String {
    "CZK".to_string()
}

impl BankTemplate {
    pub fn csob() -> Self {
        let categories = [
            ("Příjem", "Income"),
            ("Příchozí platba", "Income"),
            ("Restaurace", "Food & Dining"),
            ("Potraviny", "Groceries"),
            ("Jídlo a pití", "Food & Dining"),
            ("Nákupy a služby", "Shopping"),
            ("Nákupy", "Shopping"),
            ("Doprava", "Transportation"),
            ("Auto", "Transportation"),
            ("Bydlení", "Housing"),
            ("Zábava", "Entertainment"),
            ("Volný čas", "Entertainment"),
            ("Zdraví", "Healthcare"),
            ("Vzdělání", "Education"),
            ("Energie", "Utilities"),
            ("Splátky", "Subscriptions"),
            ("Předplatné", "Subscriptions"),
            ("Bankovní transakce", "Uncategorized"),
            ("Odchozí nezatříděná", "Uncategorized"),
            ("Příchozí nezatříděná", "Uncategorized"),
            ("Spoření a investice", "Personal"),
            ("Spoření", "Personal"),
            ("Investice", "Personal"),
        ];

        Self {
            code: "csob".to_string(),
            name: "CSOB".to_string(),
            delimiter: ';',
            encoding: default_encoding(),
            skip_rows: 2,
            date_format: "%d.%m.%Y".to_string(),
            field_mapping: FieldMapping {
                date: 1,
                amount: 2,
                currency: Some(3),
                balance_after: Some(4),
                counterparty_account: Some(5),
                counterparty_name: Some(7),
                operation_type: Some(12),
                message: Some(15),
                category: Some(16),
                external_id: Some(23),
                ..FieldMapping::default()
            },
            category_mapping: to_mapping(&categories),
            merchant_extraction: MerchantExtraction {
                field: Some(15),
                pattern: Some(r"Místo:\s*([^,]+)".to_string()),
                fallback_field: None,
            },
            amount_negative_is_expense: true,
            decimal_separator: DecimalSeparator::Comma,
            default_currency: default_currency(),
            state_column: None,
            state_required: None,
        }
    }

    pub fn revolut() -> Self {
        let categories = [
            ("Transfer", "Transfer"),
            ("Card Payment", "Shopping"),
            ("Deposit", "Income"),
            ("Exchange", "Exchange"),
            ("Topup", "Income"),
        ];

        Self {
            code: "revolut".to_string(),
            name: "Revolut".to_string(),
            delimiter: ',',
            encoding: default_encoding(),
            skip_rows: 1,
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            field_mapping: FieldMapping {
                operation_type: Some(0),
                date: 3,
                description: Some(4),
                amount: 5,
                currency: Some(7),
                balance_after: Some(9),
                ..FieldMapping::default()
            },
            category_mapping: to_mapping(&categories),
            merchant_extraction: MerchantExtraction {
                fallback_field: Some(4),
                ..MerchantExtraction::default()
            },
            amount_negative_is_expense: true,
            decimal_separator: DecimalSeparator::Period,
            default_currency: default_currency(),
            state_column: Some(8),
            state_required: Some("COMPLETED".to_string()),
        }
    }

    pub fn generic() -> Self {
        Self {
            code: "generic".to_string(),
            name: "Generic CSV".to_string(),
            delimiter: ',',
            encoding: default_encoding(),
            skip_rows: 1,
            date_format: "%Y-%m-%d".to_string(),
            field_mapping: FieldMapping {
                date: 0,
                description: Some(1),
                amount: 2,
                ..FieldMapping::default()
            },
            category_mapping: BTreeMap::new(),
            merchant_extraction: MerchantExtraction::default(),
            amount_negative_is_expense: true,
            decimal_separator: DecimalSeparator::Period,
            default_currency: default_currency(),
            state_column: None,
            state_required: None,
        }
    }

    /// Minimum number of columns a row needs before any field is read.
    pub fn required_columns(&self) -> usize {
        let max = self.field_mapping.max_column();
        self.state_column.map_or(max, |state| state.max(max)) + 1
    }

    /// `(column, required value)` when rows are filtered by state.
    pub fn state_filter(&self) -> Option<(usize, &str)> {
        match (self.state_column, self.state_required.as_deref()) {
            (Some(column), Some(required)) if !required.is_empty() => Some((column, required)),
            _ => None,
        }
    }

    /// Canonical category for a bank label, if the vocabulary knows it.
    pub fn map_category(&self, label: &str) -> Option<&str> {
        self.category_mapping.get(label.trim()).map(String::as_str)
    }

    pub fn delimiter_byte(&self) -> StatementResult<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(StatementParseError::InvalidTemplate(format!(
                "delimiter {:?} of template '{}' is not ASCII",
                self.delimiter, self.code
            )))
        }
    }

    pub fn merchant_pattern(&self) -> StatementResult<Option<Regex>> {
        match self.merchant_extraction.pattern.as_deref() {
            Some(pattern) if !pattern.is_empty() => Regex::new(pattern).map(Some).map_err(|e| {
                StatementParseError::InvalidTemplate(format!(
                    "merchant pattern of template '{}': {}",
                    self.code, e
                ))
            }),
            _ => Ok(None),
        }
    }

    pub fn check_encoding(&self) -> StatementResult<()> {
        match self.encoding.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "" => Ok(()),
            other => Err(StatementParseError::UnsupportedEncoding(other.to_string())),
        }
    }
}

fn to_mapping(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(label, canonical)| (label.to_string(), canonical.to_string()))
        .collect()
}

/// Caller-owned lookup table of templates keyed by code.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: BTreeMap<String, BankTemplate>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.insert(BankTemplate::csob());
        registry.insert(BankTemplate::revolut());
        registry.insert(BankTemplate::generic());
        registry
    }

    /// Loads templates from a JSON array, e.g. a user configuration file.
    pub fn from_json(json: &str) -> StatementResult<Self> {
        let templates: Vec<BankTemplate> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for template in templates {
            registry.insert(template);
        }
        Ok(registry)
    }

    /// Adds or replaces the template with the same code.
    pub fn insert(&mut self, template: BankTemplate) {
        self.templates.insert(template.code.clone(), template);
    }

    pub fn get(&self, code: &str) -> Option<&BankTemplate> {
        self.templates.get(code)
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Guesses the template from well-known markers in the export.
    pub fn detect(&self, content: &str) -> Option<&BankTemplate> {
        let code = detect_template_code(content);
        log::debug!("detected bank template '{}'", code);
        self.get(code).or_else(|| self.get("generic"))
    }
}

fn detect_template_code(content: &str) -> &'static str {
    if content.contains("Pohyby na účtu")
        || content.contains("číslo účtu;datum zaúčtování")
        || content.contains("/0300")
    {
        return "csob";
    }

    if content.contains("Type,Product,Started Date,Completed Date") {
        return "revolut";
    }

    "generic"
}
