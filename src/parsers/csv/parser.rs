use super::dto::{CsvRow, Description, ParsedTransaction, RAW_DESCRIPTION_SEPARATOR, UNKNOWN_DESCRIPTION};
use super::template::BankTemplate;
use super::types::CsvDate;
use crate::errors::{RowError, StatementParseError, StatementResult};
use crate::fingerprint::transaction_fingerprint;
use crate::number::parse_locale_number;
use crate::types::{ImportError, PreviewResult};
use csv::{ReaderBuilder, StringRecord};
use num_traits::Signed;
use regex::Regex;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Decodes a bank CSV export according to one [`BankTemplate`].
pub struct CsvRowParser<'t> {
    template: &'t BankTemplate,
    merchant_pattern: Option<Regex>,
    delimiter: u8,
}

impl<'t> CsvRowParser<'t> {
    pub fn new(template: &'t BankTemplate) -> StatementResult<Self> {
        template.check_encoding()?;
        Ok(Self {
            template,
            merchant_pattern: template.merchant_pattern()?,
            delimiter: template.delimiter_byte()?,
        })
    }

    pub fn template(&self) -> &BankTemplate {
        self.template
    }

    /// Parses the whole file. Malformed rows end up in `errors`; only an
    /// undecodable file is an `Err`.
    pub fn parse(&self, content: &[u8]) -> StatementResult<PreviewResult> {
        let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);
        let text = std::str::from_utf8(content).map_err(|_| StatementParseError::InvalidEncoding)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(text.as_bytes());

        let records = reader.records().collect::<Result<Vec<StringRecord>, _>>()?;
        let skip_rows = self.template.skip_rows;

        let mut preview = PreviewResult {
            total_rows: records.len().saturating_sub(skip_rows),
            ..PreviewResult::default()
        };

        for (index, record) in records.iter().enumerate().skip(skip_rows) {
            // blank lines are skipped by the reader; report the physical line
            let row_number = record.position().map_or(index + 1, |p| p.line() as usize);
            match self.parse_row(record, row_number) {
                Ok(Some(transaction)) => preview.transactions.push(transaction),
                Ok(None) => {
                    log::debug!("row {} skipped by state filter", row_number);
                    preview.skipped_rows += 1;
                }
                Err(e) => {
                    log::warn!("row {}: {}", row_number, e);
                    preview.errors.push(ImportError::new(row_number, &e));
                }
            }
        }

        preview.valid_rows = preview.transactions.len();
        log::info!(
            "template '{}': {} rows, {} valid, {} skipped, {} errors",
            self.template.code,
            preview.total_rows,
            preview.valid_rows,
            preview.skipped_rows,
            preview.errors.len()
        );

        Ok(preview)
    }

    /// `Ok(None)` when the state filter drops the row.
    pub fn parse_row(
        &self,
        record: &StringRecord,
        row_number: usize,
    ) -> Result<Option<ParsedTransaction>, RowError> {
        let template = self.template;
        let mapping = &template.field_mapping;
        let row = CsvRow::new(record);

        let expected = template.required_columns();
        if row.len() < expected {
            return Err(RowError::TooFewColumns {
                found: row.len(),
                expected,
            });
        }

        if let Some((column, required)) = template.state_filter() {
            if row.cell(column) != required {
                return Ok(None);
            }
        }

        let (date, time) = CsvDate::from(row.cell(mapping.date)).parse_with(&template.date_format)?;

        let amount_text = row.cell(mapping.amount);
        let signed_amount = parse_locale_number(amount_text, template.decimal_separator)
            .ok_or_else(|| RowError::InvalidAmount(amount_text.to_string()))?;
        let is_expense = template.amount_negative_is_expense && Signed::is_negative(&signed_amount);
        let amount = Signed::abs(&signed_amount);

        let currency = row
            .get(mapping.currency)
            .map_or_else(|| template.default_currency.clone(), str::to_string);

        let balance_after = row.get(mapping.balance_after).and_then(|text| {
            let balance = parse_locale_number(text, template.decimal_separator);
            if balance.is_none() {
                log::warn!("row {}: ignoring unreadable balance '{}'", row_number, text);
            }
            balance
        });

        let bank_category = row.get(mapping.category).map(str::to_string);
        let mapped_category = bank_category
            .as_deref()
            .or(row.get(mapping.operation_type))
            .and_then(|label| template.map_category(label))
            .map(str::to_string);

        let description = self.build_description(&row);

        let external_id = match row.get(mapping.external_id) {
            Some(id) => id.to_string(),
            None => transaction_fingerprint(date, &description.raw, amount, is_expense),
        };

        Ok(Some(ParsedTransaction {
            date,
            time,
            description: description.display,
            raw_description: description.raw,
            amount,
            is_expense,
            currency,
            balance_after,
            external_id,
            bank_category,
            mapped_category,
            merchant_name: description.merchant,
            counterparty_account: row.get(mapping.counterparty_account).map(str::to_string),
            row_number,
        }))
    }

    fn build_description(&self, row: &CsvRow<'_>) -> Description {
        let mapping = &self.template.field_mapping;
        let extraction = &self.template.merchant_extraction;

        let counterparty = row.get(mapping.counterparty_name);
        let description_column = row.get(mapping.description);

        let parts: Vec<&str> = [
            counterparty,
            row.get(mapping.operation_type),
            row.get(mapping.message),
            description_column,
        ]
        .into_iter()
        .flatten()
        .collect();

        let captured = self.merchant_pattern.as_ref().and_then(|pattern| {
            let text = row.get(extraction.field)?;
            let capture = pattern.captures(text)?.get(1)?;
            Some(capture.as_str().trim()).filter(|s| !s.is_empty())
        });

        let merchant = captured
            .or_else(|| row.get(extraction.fallback_field))
            .or(counterparty)
            .map(str::to_string);

        let display = merchant
            .as_deref()
            .or(description_column)
            .or(parts.first().copied())
            .unwrap_or(UNKNOWN_DESCRIPTION)
            .to_string();

        let raw = if parts.is_empty() {
            display.clone()
        } else {
            parts.join(RAW_DESCRIPTION_SEPARATOR)
        };

        Description {
            display,
            raw,
            merchant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::number::DecimalSeparator;
    use chrono::{NaiveDate, NaiveTime};
    use rstest::rstest;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const CSOB_HEADER: &str = "Pohyby na účtu 123456789/0300\n\
číslo účtu;datum zaúčtování;částka;měna;zůstatek;číslo účtu protiúčtu;kód banky protiúčtu;název účtu protiúčtu;konstantní symbol;variabilní symbol;specifický symbol;označení operace;typ operace;ID transakce;poznámka;zpráva;kategorie;a;b;c;d;e;f;identifikace\n";

    fn csob_row(cells: &[(usize, &str)]) -> String {
        let mut row = vec![""; 24];
        row[0] = "123456789/0300";
        for (index, value) in cells {
            row[*index] = value;
        }
        row.join(";")
    }

    const REVOLUT_CSV: &str = "Type,Product,Started Date,Completed Date,Description,Amount,Fee,Currency,State,Balance\n\
Card Payment,Current,2024-01-15 18:02:11,2024-01-16 09:05:00,Rohlik.cz,-42.50,0.00,EUR,COMPLETED,957.50\n\
Topup,Current,2024-01-17 10:00:00,2024-01-17 10:00:01,Top-Up by *1234,500.00,0.00,EUR,COMPLETED,1457.50\n\
Card Payment,Current,2024-01-18 12:00:00,2024-01-18 12:00:00,Netflix,-9.99,0.00,EUR,REVERTED,1457.50\n\
Card Payment,Current,2024-01-19 12:00:00,,Lidl,-12.00,0.00,EUR,PENDING,1457.50\n";

    const GENERIC_CSV: &str = "Date,Description,Amount\n\
2025-12-26,Coffee Shop,-50.00\n\
2025-12-25,ACME Corp Payroll,1500.00\n";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn parse(template: &BankTemplate, content: &str) -> PreviewResult {
        CsvRowParser::new(template).unwrap().parse(content.as_bytes()).unwrap()
    }

    #[test]
    fn test_csob_card_payment() {
        let content = format!(
            "{}{}\n",
            CSOB_HEADER,
            csob_row(&[
                (1, "14.03.2025"),
                (2, "-1 150,50"),
                (3, "CZK"),
                (4, "42 124,00"),
                (12, "Platba kartou"),
                (15, "Místo: ALBERT PRAHA, částka 1150,50 CZK"),
                (16, "Potraviny"),
                (23, "TX-2025-0001"),
            ])
        );

        let preview = parse(&BankTemplate::csob(), &content);
        assert_eq!(preview.total_rows, 1);
        assert_eq!(preview.valid_rows, 1);
        assert!(preview.errors.is_empty());

        let txn = &preview.transactions[0];
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(txn.time, None);
        assert_eq!(txn.amount, dec("1150.50"));
        assert!(txn.is_expense);
        assert_eq!(txn.currency, "CZK");
        assert_eq!(txn.balance_after, Some(dec("42124.00")));
        assert_eq!(txn.merchant_name.as_deref(), Some("ALBERT PRAHA"));
        assert_eq!(txn.description, "ALBERT PRAHA");
        assert_eq!(
            txn.raw_description,
            "Platba kartou | Místo: ALBERT PRAHA, částka 1150,50 CZK"
        );
        assert_eq!(txn.bank_category.as_deref(), Some("Potraviny"));
        assert_eq!(txn.mapped_category.as_deref(), Some("Groceries"));
        assert_eq!(txn.external_id, "TX-2025-0001");
        assert_eq!(txn.row_number, 3);
    }

    #[test]
    fn test_csob_incoming_payment_uses_counterparty() {
        let content = format!(
            "{}{}\n",
            CSOB_HEADER,
            csob_row(&[
                (1, "01.04.2025"),
                (2, "52 000,00"),
                (3, "CZK"),
                (5, "2000145399/0800"),
                (7, "ACME s.r.o."),
                (12, "Příchozí úhrada"),
                (15, "Mzda 03/2025"),
                (16, "Příjem"),
            ])
        );

        let preview = parse(&BankTemplate::csob(), &content);
        let txn = &preview.transactions[0];
        assert!(!txn.is_expense);
        assert_eq!(txn.amount, dec("52000.00"));
        assert_eq!(txn.merchant_name.as_deref(), Some("ACME s.r.o."));
        assert_eq!(txn.description, "ACME s.r.o.");
        assert_eq!(txn.raw_description, "ACME s.r.o. | Příchozí úhrada | Mzda 03/2025");
        assert_eq!(txn.counterparty_account.as_deref(), Some("2000145399/0800"));
        assert_eq!(txn.mapped_category.as_deref(), Some("Income"));
        assert_eq!(
            txn.external_id,
            transaction_fingerprint(
                NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
                "ACME s.r.o. | Příchozí úhrada | Mzda 03/2025",
                dec("52000.00"),
                false
            )
        );
    }

    #[test]
    fn test_revolut_state_filter_skips_without_errors() {
        let preview = parse(&BankTemplate::revolut(), REVOLUT_CSV);

        assert_eq!(preview.total_rows, 4);
        assert_eq!(preview.valid_rows, 2);
        assert_eq!(preview.skipped_rows, 2);
        assert!(preview.errors.is_empty());
        assert!(preview.transactions.iter().all(|t| t.description != "Netflix"));

        let card = &preview.transactions[0];
        assert_eq!(card.date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(card.time, NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(card.amount, dec("42.50"));
        assert!(card.is_expense);
        assert_eq!(card.currency, "EUR");
        assert_eq!(card.merchant_name.as_deref(), Some("Rohlik.cz"));
        assert_eq!(card.description, "Rohlik.cz");
        assert_eq!(card.raw_description, "Card Payment | Rohlik.cz");
        assert_eq!(card.bank_category, None);
        assert_eq!(card.mapped_category.as_deref(), Some("Shopping"));
        assert_eq!(card.row_number, 2);

        let topup = &preview.transactions[1];
        assert!(!topup.is_expense);
        assert_eq!(topup.mapped_category.as_deref(), Some("Income"));
    }

    #[rstest]
    #[case("-150.00", "150.00", true)]
    #[case("150.00", "150.00", false)]
    #[case("+150.00", "150.00", false)]
    fn test_sign_handling(#[case] amount: &str, #[case] stored: &str, #[case] is_expense: bool) {
        let content = format!("Date,Description,Amount\n2025-01-10,Transfer,{}\n", amount);
        let preview = parse(&BankTemplate::generic(), &content);

        let txn = &preview.transactions[0];
        assert_eq!(txn.amount, dec(stored));
        assert_eq!(txn.is_expense, is_expense);
    }

    #[test]
    fn test_negative_amount_not_expense_when_flag_is_off() {
        let mut template = BankTemplate::generic();
        template.amount_negative_is_expense = false;

        let preview = parse(&template, "Date,Description,Amount\n2025-01-10,Refund,-20.00\n");
        let txn = &preview.transactions[0];
        assert_eq!(txn.amount, dec("20.00"));
        assert!(!txn.is_expense);
    }

    #[test]
    fn test_generic_defaults() {
        let preview = parse(&BankTemplate::generic(), GENERIC_CSV);
        assert_eq!(preview.valid_rows, 2);

        let coffee = &preview.transactions[0];
        assert_eq!(coffee.description, "Coffee Shop");
        assert_eq!(coffee.raw_description, "Coffee Shop");
        assert_eq!(coffee.merchant_name, None);
        assert_eq!(coffee.currency, "CZK");
        assert_eq!(coffee.balance_after, None);
        assert_eq!(coffee.external_id.len(), 32);
    }

    #[test]
    fn test_row_errors_do_not_abort_file() {
        let content = "Date,Description,Amount\n\
2025-12-26,Coffee Shop,-50.00\n\
not-a-date,Broken,-1.00\n\
2025-12-24,Broken amount,abc\n\
2025-12-23\n\
2025-12-22,Bakery,-3.20\n";

        let preview = parse(&BankTemplate::generic(), content);
        assert_eq!(preview.total_rows, 5);
        assert_eq!(preview.valid_rows, 2);
        assert_eq!(preview.skipped_rows, 0);

        let errors: Vec<(usize, &str)> = preview
            .errors
            .iter()
            .map(|e| (e.row, e.message.as_str()))
            .collect();
        assert_eq!(
            errors,
            vec![
                (3, "invalid date 'not-a-date': could not parse date"),
                (4, "invalid amount 'abc'"),
                (5, "row has only 1 columns, expected at least 3"),
            ]
        );
    }

    #[test]
    fn test_unreadable_balance_keeps_transaction() {
        let mut template = BankTemplate::generic();
        template.field_mapping.balance_after = Some(3);

        let preview = parse(
            &template,
            "Date,Description,Amount,Balance\n2025-01-10,Shop,-12.00,n/a\n2025-01-11,Bakery,-3.20,1 204.50\n",
        );

        assert!(preview.errors.is_empty());
        assert_eq!(preview.valid_rows, 2);
        assert_eq!(preview.transactions[0].amount, dec("12.00"));
        assert_eq!(preview.transactions[0].balance_after, None);
        assert_eq!(preview.transactions[1].balance_after, Some(dec("1204.50")));
    }

    #[test]
    fn test_error_rows_count_blank_lines() {
        let preview = parse(
            &BankTemplate::generic(),
            "Date,Description,Amount\n\n2025-01-10,Shop,abc\n\n2025-01-11,Bakery,-3.20\n",
        );

        assert_eq!(preview.valid_rows, 1);
        assert_eq!(preview.transactions[0].row_number, 5);
        assert_eq!(preview.errors.len(), 1);
        assert_eq!(preview.errors[0].row, 3);
        assert_eq!(preview.errors[0].message, "invalid amount 'abc'");
    }

    #[test]
    fn test_missing_description_falls_back_to_unknown() {
        let preview = parse(&BankTemplate::generic(), "Date,Description,Amount\n2025-01-10,,-20.00\n");
        let txn = &preview.transactions[0];
        assert_eq!(txn.description, UNKNOWN_DESCRIPTION);
        assert_eq!(txn.raw_description, UNKNOWN_DESCRIPTION);
    }

    #[test]
    fn test_date_fallback_formats() {
        let preview = parse(
            &BankTemplate::generic(),
            "Date,Description,Amount\n14.03.2025,A,-1.00\n03/15/2025,B,-1.00\n",
        );
        let dates: Vec<NaiveDate> = preview.transactions.iter().map(|t| t.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
            ]
        );
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut content = UTF8_BOM.to_vec();
        content.extend_from_slice(b"2025-01-10,Shop,-1.00\n");

        let mut template = BankTemplate::generic();
        template.skip_rows = 0;
        let preview = CsvRowParser::new(&template).unwrap().parse(&content).unwrap();
        assert_eq!(preview.valid_rows, 1);
        assert_eq!(preview.transactions[0].row_number, 1);
    }

    #[test]
    fn test_reimport_produces_identical_ids() {
        let first = parse(&BankTemplate::generic(), GENERIC_CSV);
        let second = parse(&BankTemplate::generic(), GENERIC_CSV);

        let ids = |p: &PreviewResult| p.transactions.iter().map(|t| t.external_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_ne!(ids(&first)[0], ids(&first)[1]);
    }

    #[test]
    fn test_invalid_utf8_is_file_error() {
        let template = BankTemplate::generic();
        let parser = CsvRowParser::new(&template).unwrap();
        let result = parser.parse(&[0x44, 0x61, 0xFF, 0xFE, 0x0A]);
        assert!(matches!(result, Err(StatementParseError::InvalidEncoding)));
    }

    #[test]
    fn test_unsupported_encoding_rejected_at_construction() {
        let mut template = BankTemplate::csob();
        template.encoding = "windows-1250".to_string();
        assert!(matches!(
            CsvRowParser::new(&template),
            Err(StatementParseError::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn test_comma_decimal_with_period_thousands() {
        let mut template = BankTemplate::generic();
        template.decimal_separator = DecimalSeparator::Comma;
        template.delimiter = ';';

        let preview = parse(&template, "Date;Description;Amount\n2025-01-10;Rent;-1.234,56\n");
        assert_eq!(preview.transactions[0].amount, dec("1234.56"));
    }
}
