//! Broker P&L exports: closed trades, and optionally dividends, summed per symbol.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Holding, ParsedStatement, PortfolioSnapshot, Provider};
use super::{finish, has_csv_extension};
use crate::errors::{RowError, StatementResult};
use crate::number::{parse_locale_number, DecimalSeparator};
use crate::parsers::traits::StatementParser;
use crate::types::ImportError;

const PRICE_SCALE: u32 = 8;

/// Column indices of a closed-trade row.
#[derive(Debug, Clone, Copy)]
pub struct TradeColumns {
    pub date_sold: usize,
    pub symbol: usize,
    pub name: Option<usize>,
    pub isin: Option<usize>,
    pub quantity: usize,
    pub cost_basis: usize,
    pub proceeds: usize,
    pub gross_pnl: Option<usize>,
    pub fees: Option<usize>,
    pub net_pnl: usize,
    pub currency: usize,
}

impl TradeColumns {
    fn required(&self) -> usize {
        [self.name, self.isin, self.gross_pnl, self.fees]
            .into_iter()
            .flatten()
            .chain([
                self.date_sold,
                self.symbol,
                self.quantity,
                self.cost_basis,
                self.proceeds,
                self.net_pnl,
                self.currency,
            ])
            .max()
            .unwrap_or_default()
            + 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DividendColumns {
    pub date: usize,
    pub symbol: usize,
    pub gross: usize,
    pub withholding_tax: usize,
    pub net: usize,
    pub currency: usize,
}

impl DividendColumns {
    fn required(&self) -> usize {
        [
            self.date,
            self.symbol,
            self.gross,
            self.withholding_tax,
            self.net,
            self.currency,
        ]
        .into_iter()
        .max()
        .unwrap_or_default()
            + 1
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TradeLayout {
    pub provider: Provider,
    pub portfolio_name: &'static str,
    pub currency: &'static str,
    pub markers: &'static [&'static str],
    /// First cell of the trades header row
    pub trade_header: &'static str,
    pub trades: TradeColumns,
    pub dividend_header: &'static str,
    /// Present when a dividends section follows the trades
    pub dividends: Option<DividendColumns>,
    pub category: &'static str,
    pub date_format: &'static str,
}

pub const REVOLUT_STOCKS: TradeLayout = TradeLayout {
    provider: Provider::RevolutStocks,
    portfolio_name: "Revolut Stocks",
    currency: "USD",
    markers: &["Date acquired,Date sold,Symbol,Security name,ISIN"],
    trade_header: "Date acquired",
    trades: TradeColumns {
        date_sold: 1,
        symbol: 2,
        name: Some(3),
        isin: Some(4),
        quantity: 6,
        cost_basis: 7,
        proceeds: 8,
        gross_pnl: None,
        fees: None,
        net_pnl: 9,
        currency: 10,
    },
    dividend_header: "Date",
    dividends: Some(DividendColumns {
        date: 0,
        symbol: 1,
        gross: 5,
        withholding_tax: 6,
        net: 7,
        currency: 8,
    }),
    category: "Stock",
    date_format: "%Y-%m-%d",
};

pub const REVOLUT_CRYPTO: TradeLayout = TradeLayout {
    provider: Provider::RevolutCrypto,
    portfolio_name: "Revolut Crypto",
    currency: "USD",
    markers: &["Date acquired,Date sold,Symbol,Quantity,Cost basis"],
    trade_header: "Date acquired",
    trades: TradeColumns {
        date_sold: 1,
        symbol: 2,
        name: None,
        isin: None,
        quantity: 3,
        cost_basis: 4,
        proceeds: 5,
        gross_pnl: Some(6),
        fees: Some(7),
        net_pnl: 8,
        currency: 9,
    },
    dividend_header: "Date",
    dividends: None,
    category: "Crypto",
    date_format: "%Y-%m-%d",
};

/// Closed trades of one symbol, summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub name: Option<String>,
    pub isin: Option<String>,
    pub currency: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub proceeds: Decimal,
    pub gross_pnl: Decimal,
    pub fees: Decimal,
    pub net_pnl: Decimal,
}

/// Dividends of one symbol, summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendIncome {
    pub symbol: String,
    pub currency: String,
    pub gross: Decimal,
    pub withholding_tax: Decimal,
    pub net: Decimal,
}

/// Per-symbol sums in first-seen order, before they become holdings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeAggregation {
    pub positions: Vec<Position>,
    pub dividends: Vec<DividendIncome>,
    /// Latest sale or payment date
    pub report_date: Option<NaiveDate>,
    pub errors: Vec<ImportError>,
}

/// Contiguous block of CSV lines, optionally introduced by a non-CSV title line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub title: Option<&'a str>,
    /// 1-based line number of the first body line
    pub first_line: usize,
    pub lines: Vec<&'a str>,
}

/// Splits content on blank lines; a leading line without commas becomes the title.
pub fn split_sections(content: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current: Option<Section<'_>> = None;

    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            if current.as_ref().is_some_and(|s| !s.lines.is_empty()) {
                sections.extend(current.take());
            }
            continue;
        }

        match current.as_mut() {
            None if !trimmed.contains(',') => {
                current = Some(Section {
                    title: Some(trimmed),
                    first_line: index + 2,
                    lines: Vec::new(),
                });
            }
            None => {
                current = Some(Section {
                    title: None,
                    first_line: index + 1,
                    lines: vec![line],
                });
            }
            Some(section) => {
                if section.lines.is_empty() {
                    section.first_line = index + 1;
                }
                section.lines.push(line);
            }
        }
    }

    sections.extend(current.filter(|s| !s.lines.is_empty()));
    sections
}

pub struct TradeAggregationParser {
    layout: &'static TradeLayout,
}

impl TradeAggregationParser {
    pub fn new(layout: &'static TradeLayout) -> Self {
        Self { layout }
    }

    pub fn revolut_stocks() -> Self {
        Self::new(&REVOLUT_STOCKS)
    }

    pub fn revolut_crypto() -> Self {
        Self::new(&REVOLUT_CRYPTO)
    }

    /// Groups rows by symbol. Malformed rows are recorded and left out of every sum.
    pub fn aggregate(&self, content: &str) -> StatementResult<TradeAggregation> {
        let layout = self.layout;
        let mut aggregation = TradeAggregation::default();
        let mut sections = split_sections(content).into_iter();

        if let Some(section) = sections.next() {
            for (row, record) in read_rows(&section)? {
                if is_header(&record, layout.trade_header) {
                    continue;
                }
                if let Err(e) = self.add_trade(&mut aggregation, &record) {
                    log::warn!("{}: row {}: {}", layout.provider, row, e);
                    aggregation.errors.push(ImportError::new(row, &e));
                }
            }
        }

        if let (Some(columns), Some(section)) = (layout.dividends, sections.next()) {
            for (row, record) in read_rows(&section)? {
                if is_header(&record, layout.dividend_header) {
                    continue;
                }
                if let Err(e) = self.add_dividend(&mut aggregation, &columns, &record) {
                    log::warn!("{}: row {}: {}", layout.provider, row, e);
                    aggregation.errors.push(ImportError::new(row, &e));
                }
            }
        }

        Ok(aggregation)
    }

    fn add_trade(&self, aggregation: &mut TradeAggregation, record: &StringRecord) -> Result<(), RowError> {
        let columns = &self.layout.trades;
        check_columns(record, columns.required())?;

        let quantity = number(record, columns.quantity, "quantity")?;
        let cost_basis = number(record, columns.cost_basis, "cost basis")?;
        let proceeds = number(record, columns.proceeds, "proceeds")?;
        let net_pnl = number(record, columns.net_pnl, "pnl")?;
        let gross_pnl = optional_number(record, columns.gross_pnl, "gross pnl")?;
        let fees = optional_number(record, columns.fees, "fees")?;

        let symbol = cell(record, columns.symbol);
        let index = aggregation.positions.iter().position(|p| p.symbol == symbol);
        let current = index.map(|i| &aggregation.positions[i]);
        let quantity = accumulate(current.map(|p| p.quantity), quantity, "quantity")?;
        let cost_basis = accumulate(current.map(|p| p.cost_basis), cost_basis, "cost basis")?;
        let proceeds = accumulate(current.map(|p| p.proceeds), proceeds, "proceeds")?;
        let gross_pnl = accumulate(current.map(|p| p.gross_pnl), gross_pnl, "gross pnl")?;
        let fees = accumulate(current.map(|p| p.fees), fees, "fees")?;
        let net_pnl = accumulate(current.map(|p| p.net_pnl), net_pnl, "pnl")?;

        self.track_date(aggregation, cell(record, columns.date_sold));

        let position = match index {
            Some(index) => &mut aggregation.positions[index],
            None => {
                aggregation.positions.push(Position {
                    symbol: symbol.to_string(),
                    name: optional_cell(record, columns.name),
                    isin: optional_cell(record, columns.isin),
                    currency: cell(record, columns.currency).to_string(),
                    quantity: Decimal::ZERO,
                    cost_basis: Decimal::ZERO,
                    proceeds: Decimal::ZERO,
                    gross_pnl: Decimal::ZERO,
                    fees: Decimal::ZERO,
                    net_pnl: Decimal::ZERO,
                });
                let last = aggregation.positions.len() - 1;
                &mut aggregation.positions[last]
            }
        };

        position.quantity = quantity;
        position.cost_basis = cost_basis;
        position.proceeds = proceeds;
        position.gross_pnl = gross_pnl;
        position.fees = fees;
        position.net_pnl = net_pnl;
        Ok(())
    }

    fn add_dividend(
        &self,
        aggregation: &mut TradeAggregation,
        columns: &DividendColumns,
        record: &StringRecord,
    ) -> Result<(), RowError> {
        check_columns(record, columns.required())?;

        let gross = number(record, columns.gross, "gross amount")?;
        let withholding_tax = number(record, columns.withholding_tax, "withholding tax")?;
        let net = number(record, columns.net, "net amount")?;

        let symbol = cell(record, columns.symbol);
        let index = aggregation.dividends.iter().position(|d| d.symbol == symbol);
        let current = index.map(|i| &aggregation.dividends[i]);
        let gross = accumulate(current.map(|d| d.gross), gross, "gross amount")?;
        let withholding_tax =
            accumulate(current.map(|d| d.withholding_tax), withholding_tax, "withholding tax")?;
        let net = accumulate(current.map(|d| d.net), net, "net amount")?;

        self.track_date(aggregation, cell(record, columns.date));

        let dividend = match index {
            Some(index) => &mut aggregation.dividends[index],
            None => {
                aggregation.dividends.push(DividendIncome {
                    symbol: symbol.to_string(),
                    currency: cell(record, columns.currency).to_string(),
                    gross: Decimal::ZERO,
                    withholding_tax: Decimal::ZERO,
                    net: Decimal::ZERO,
                });
                let last = aggregation.dividends.len() - 1;
                &mut aggregation.dividends[last]
            }
        };

        dividend.gross = gross;
        dividend.withholding_tax = withholding_tax;
        dividend.net = net;
        Ok(())
    }

    fn track_date(&self, aggregation: &mut TradeAggregation, text: &str) {
        match NaiveDate::parse_from_str(text, self.layout.date_format) {
            Ok(date) => {
                aggregation.report_date = aggregation.report_date.max(Some(date));
            }
            Err(_) => log::debug!("{}: ignoring date '{}'", self.layout.provider, text),
        }
    }

    fn snapshot(&self, aggregation: &TradeAggregation) -> PortfolioSnapshot {
        let layout = self.layout;
        let mut snapshot = PortfolioSnapshot::new(layout.provider, layout.currency);
        snapshot.portfolio_name = Some(layout.portfolio_name.to_string());
        snapshot.report_date = aggregation.report_date;

        for position in &aggregation.positions {
            let name = match &position.name {
                Some(name) => format!("{} ({})", name, position.symbol),
                None => position.symbol.clone(),
            };
            let price_per_unit = position
                .proceeds
                .checked_div(position.quantity)
                .map(|price| price.round_dp(PRICE_SCALE));

            snapshot.holdings.push(Holding {
                name,
                isin: position.isin.clone(),
                category: layout.category.to_string(),
                units: Some(position.quantity),
                price_per_unit,
                price_currency: Some(position.currency.clone()),
                total_value: position.proceeds,
                value_currency: position.currency.clone(),
                price_date: None,
            });
        }

        for dividend in &aggregation.dividends {
            snapshot.holdings.push(Holding {
                name: format!("{} Dividends", dividend.symbol),
                isin: None,
                category: "Dividend".to_string(),
                units: None,
                price_per_unit: None,
                price_currency: None,
                total_value: dividend.net,
                value_currency: dividend.currency.clone(),
                price_date: None,
            });
        }

        if snapshot.holdings.is_empty() {
            return snapshot;
        }

        let positions = &aggregation.positions;
        let dividends = checked_total(aggregation.dividends.iter().map(|d| d.net));
        let with_dividends =
            |total: Option<Decimal>| total.zip(dividends).and_then(|(t, d)| t.checked_add(d));

        snapshot.invested = checked_total(positions.iter().map(|p| p.cost_basis));
        snapshot.end_value = with_dividends(checked_total(positions.iter().map(|p| p.proceeds)));
        snapshot.gain_loss = with_dividends(checked_total(positions.iter().map(|p| p.net_pnl)));
        if layout.trades.fees.is_some() {
            snapshot.fees = checked_total(positions.iter().map(|p| p.fees));
        }
        if snapshot.invested.is_none() || snapshot.end_value.is_none() || snapshot.gain_loss.is_none() {
            log::warn!("{}: totals exceed the decimal range and were dropped", layout.provider);
        }

        snapshot
    }
}

impl StatementParser for TradeAggregationParser {
    fn provider(&self) -> Provider {
        self.layout.provider
    }

    fn is_supported(&self, filename: Option<&str>, content: &str) -> bool {
        let looks_like_export = self.layout.markers.iter().all(|m| content.contains(m));
        match filename {
            Some(name) => has_csv_extension(name) && looks_like_export,
            None => looks_like_export,
        }
    }

    fn parse(&self, content: &str) -> StatementResult<ParsedStatement> {
        let aggregation = self.aggregate(content)?;
        let snapshot = self.snapshot(&aggregation);
        finish(snapshot, aggregation.errors)
    }
}

fn read_rows(section: &Section<'_>) -> StatementResult<Vec<(usize, StringRecord)>> {
    let body = section.lines.join("\n");
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(1, |p| p.line() as usize);
        rows.push((section.first_line + line - 1, record));
    }
    Ok(rows)
}

fn is_header(record: &StringRecord, label: &str) -> bool {
    record.get(0).map(str::trim) == Some(label)
}

fn check_columns(record: &StringRecord, expected: usize) -> Result<(), RowError> {
    if record.len() < expected {
        return Err(RowError::TooFewColumns {
            found: record.len(),
            expected,
        });
    }
    Ok(())
}

fn cell(record: &StringRecord, column: usize) -> &str {
    record.get(column).map(str::trim).unwrap_or_default()
}

fn optional_cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    column
        .map(|c| cell(record, c))
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn number(record: &StringRecord, column: usize, field: &'static str) -> Result<Decimal, RowError> {
    let text = cell(record, column);
    parse_locale_number(text, DecimalSeparator::Period).ok_or_else(|| RowError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

/// Running total plus `value`; a row that would overflow it is rejected.
fn accumulate(total: Option<Decimal>, value: Decimal, field: &'static str) -> Result<Decimal, RowError> {
    total
        .unwrap_or_default()
        .checked_add(value)
        .ok_or(RowError::Overflow { field })
}

fn checked_total(values: impl Iterator<Item = Decimal>) -> Option<Decimal> {
    values.fold(Some(Decimal::ZERO), |sum, value| sum?.checked_add(value))
}

fn optional_number(
    record: &StringRecord,
    column: Option<usize>,
    field: &'static str,
) -> Result<Decimal, RowError> {
    column.map_or(Ok(Decimal::ZERO), |c| number(record, c, field))
}
