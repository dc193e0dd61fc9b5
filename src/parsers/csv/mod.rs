mod dto;
mod parser;
mod template;
mod types;

pub use dto::{ParsedTransaction, RAW_DESCRIPTION_SEPARATOR, UNKNOWN_DESCRIPTION};
pub use parser::CsvRowParser;
pub use template::{BankTemplate, FieldMapping, MerchantExtraction, TemplateRegistry};
pub use types::{CsvDate, FALLBACK_DATE_FORMATS};
