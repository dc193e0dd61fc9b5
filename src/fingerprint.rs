//! Deduplication keys for transactions that carry no bank-supplied id.
//!
//! Re-importing the same export, or an overlapping date window, yields the
//! same key, so the storage layer can recognize the row as a duplicate.
//! Keys are truncated SHA-256 digests: a collision between two genuinely
//! different transactions is possible and accepted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

/// Number of digest bytes kept (hex-encoded to twice as many characters).
pub const FINGERPRINT_BYTES: usize = 16;

/// Computes the stable key over `(ISO date, description, signed amount)`.
///
/// `amount` is the stored magnitude; the sign comes from `is_expense`. The
/// description has its whitespace collapsed so that re-exports with different
/// padding hash the same.
pub fn transaction_fingerprint(
    date: NaiveDate,
    description: &str,
    amount: Decimal,
    is_expense: bool,
) -> String {
    let sign = if is_expense { '-' } else { '+' };
    let payload = format!(
        "{}|{}|{}{:.2}",
        date.format("%Y-%m-%d"),
        normalize_description(description),
        sign,
        amount.abs().round_dp(2)
    );

    let digest = Sha256::digest(payload.as_bytes());
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

fn normalize_description(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;
    use std::str::FromStr;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = transaction_fingerprint(date(2025, 3, 14), "Albert | Platba kartou", dec("150.00"), true);
        let b = transaction_fingerprint(date(2025, 3, 14), "Albert | Platba kartou", dec("150.00"), true);
        assert_eq!(a, b);
        assert_eq!(a.len(), FINGERPRINT_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_ignores_padding_and_scale() {
        let a = transaction_fingerprint(date(2025, 3, 14), "Albert  |  Platba", dec("150"), true);
        let b = transaction_fingerprint(date(2025, 3, 14), " Albert | Platba ", dec("150.00"), true);
        assert_eq!(a, b);
    }

    #[rstest]
    #[case(date(2025, 3, 15), "Albert | Platba kartou", "150.00", true)]
    #[case(date(2025, 3, 14), "Billa | Platba kartou", "150.00", true)]
    #[case(date(2025, 3, 14), "Albert | Platba kartou", "150.01", true)]
    #[case(date(2025, 3, 14), "Albert | Platba kartou", "150.00", false)]
    fn test_fingerprint_changes_with_any_input(
        #[case] d: NaiveDate,
        #[case] description: &str,
        #[case] amount: &str,
        #[case] is_expense: bool,
    ) {
        let base = transaction_fingerprint(date(2025, 3, 14), "Albert | Platba kartou", dec("150.00"), true);
        let other = transaction_fingerprint(d, description, dec(amount), is_expense);
        assert_ne!(base, other);
    }

    #[test]
    fn test_no_collisions_in_a_month_of_rows() {
        let mut seen = HashSet::new();
        for day in 1..=28 {
            for cents in 0..50 {
                let amount = Decimal::new(10_000 + cents, 2);
                for merchant in ["Albert", "Lidl", "Rohlik.cz"] {
                    let key = transaction_fingerprint(date(2025, 2, day), merchant, amount, true);
                    assert!(seen.insert(key));
                }
            }
        }
    }
}
