use super::types::{PortfolioSnapshot, Provider};

/// Completeness checks run after a successful parse. An empty result means the
/// snapshot is ready to store; messages never turn into a parse failure.
pub fn validate_snapshot(snapshot: &PortfolioSnapshot) -> Vec<String> {
    let mut problems = Vec::new();

    if snapshot.report_date.is_none() {
        problems.push("report date not found".to_string());
    }

    match snapshot.provider {
        Provider::Fondee => {
            if is_missing(snapshot.end_value) {
                problems.push("end value not found or zero".to_string());
            }
            if snapshot.portfolio_name.is_none() {
                problems.push("portfolio name not found".to_string());
            }
            if snapshot.period_start.is_none() || snapshot.period_end.is_none() {
                problems.push("period dates not found".to_string());
            }
            if is_missing(snapshot.start_value) {
                problems.push("start value not found or zero".to_string());
            }
        }
        Provider::Amundi => {
            if is_missing(snapshot.end_value) {
                problems.push("end value not found or zero".to_string());
            }
            if snapshot.contract_id.is_none() {
                problems.push("contract ID not found".to_string());
            }
            if is_missing(snapshot.invested) {
                problems.push("invested amount not found or zero".to_string());
            }
            if snapshot.holdings.is_empty() {
                problems.push("no holdings found".to_string());
            }
            for (index, holding) in snapshot.holdings.iter().enumerate() {
                if holding.name.trim().is_empty() {
                    problems.push(format!("holding {}: name missing", index + 1));
                }
                if holding.total_value.is_zero() {
                    problems.push(format!(
                        "holding {} ({}): total value is zero",
                        index + 1,
                        holding.name
                    ));
                }
            }
        }
        Provider::RevolutStocks | Provider::RevolutCrypto => {
            if snapshot.holdings.is_empty() {
                problems.push("no holdings found".to_string());
            }
        }
    }

    problems
}

fn is_missing(value: Option<rust_decimal::Decimal>) -> bool {
    value.is_none_or(|v| v.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::statement::Holding;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn holding(name: &str, value: i64) -> Holding {
        Holding {
            name: name.to_string(),
            isin: None,
            category: "Akciový fond".to_string(),
            units: None,
            price_per_unit: None,
            price_currency: None,
            total_value: Decimal::from(value),
            value_currency: "CZK".to_string(),
            price_date: None,
        }
    }

    #[test]
    fn test_complete_fondee_snapshot() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31);
        let mut snapshot = PortfolioSnapshot::new(Provider::Fondee, "CZK");
        snapshot.portfolio_name = Some("Vyvážený".to_string());
        snapshot.report_date = date;
        snapshot.period_start = NaiveDate::from_ymd_opt(2026, 1, 1);
        snapshot.period_end = date;
        snapshot.start_value = Some(Decimal::from(150_000));
        snapshot.end_value = Some(Decimal::from(153_200));

        assert!(validate_snapshot(&snapshot).is_empty());
    }

    #[test]
    fn test_fondee_missing_fields() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Fondee, "CZK");
        snapshot.end_value = Some(Decimal::ZERO);

        assert_eq!(
            validate_snapshot(&snapshot),
            vec![
                "report date not found",
                "end value not found or zero",
                "portfolio name not found",
                "period dates not found",
                "start value not found or zero",
            ]
        );
    }

    #[test]
    fn test_amundi_holding_checks() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Amundi, "CZK");
        snapshot.report_date = NaiveDate::from_ymd_opt(2025, 6, 30);
        snapshot.contract_id = Some("9988776655".to_string());
        snapshot.end_value = Some(Decimal::from(42_830));
        snapshot.invested = Some(Decimal::from(38_500));
        snapshot.holdings = vec![holding("Templeton Growth", 100), holding("", 0)];

        assert_eq!(
            validate_snapshot(&snapshot),
            vec!["holding 2: name missing", "holding 2 (): total value is zero"]
        );
    }

    #[test]
    fn test_amundi_without_holdings() {
        let mut snapshot = PortfolioSnapshot::new(Provider::Amundi, "CZK");
        snapshot.report_date = NaiveDate::from_ymd_opt(2025, 6, 30);
        snapshot.contract_id = Some("9988776655".to_string());
        snapshot.end_value = Some(Decimal::from(42_830));
        snapshot.invested = Some(Decimal::from(38_500));

        assert_eq!(validate_snapshot(&snapshot), vec!["no holdings found"]);
    }

    #[test]
    fn test_revolut_requires_holdings() {
        let mut snapshot = PortfolioSnapshot::new(Provider::RevolutCrypto, "USD");
        snapshot.report_date = NaiveDate::from_ymd_opt(2024, 2, 28);
        assert_eq!(validate_snapshot(&snapshot), vec!["no holdings found"]);

        snapshot.holdings.push(holding("BTC", 218));
        assert!(validate_snapshot(&snapshot).is_empty());
    }
}
