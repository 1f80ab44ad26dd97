// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Amount parsing, formatting and payable-amount arithmetic.
//!
//! All arithmetic is done on integer mutez. Prices come in as decimal tez
//! strings and are never routed through floating point.

use super::types::{Mutez, MUTEZ_PER_TEZ, TEZ_DECIMALS};

/// Errors from amount parsing and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Invalid amount format: {0}")]
    InvalidFormat(String),

    #[error("Too many decimal places (max {max})")]
    TooManyDecimals { max: u8 },

    #[error("Amount overflow")]
    Overflow,
}

/// Parse a human-readable tez amount (e.g. `"10"`, `"0.5"`) into mutez.
pub fn parse_tez(amount: &str) -> Result<Mutez, AmountError> {
    let amount = amount.trim();
    let parts: Vec<&str> = amount.split('.').collect();

    if parts.len() > 2 || parts[0].is_empty() {
        return Err(AmountError::InvalidFormat(amount.to_string()));
    }

    let whole = parts[0]
        .parse::<u64>()
        .map_err(|_| AmountError::InvalidFormat(amount.to_string()))?;

    let fraction = if parts.len() == 2 {
        let dec_str = parts[1];
        if dec_str.is_empty() || !dec_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(AmountError::InvalidFormat(amount.to_string()));
        }
        if dec_str.len() > TEZ_DECIMALS as usize {
            return Err(AmountError::TooManyDecimals { max: TEZ_DECIMALS });
        }
        // Pad with zeros up to mutez precision
        let padded = format!("{:0<width$}", dec_str, width = TEZ_DECIMALS as usize);
        padded
            .parse::<u64>()
            .map_err(|_| AmountError::InvalidFormat(amount.to_string()))?
    } else {
        0
    };

    whole
        .checked_mul(MUTEZ_PER_TEZ)
        .and_then(|w| w.checked_add(fraction))
        .map(Mutez)
        .ok_or(AmountError::Overflow)
}

/// Amount the buyer attaches to the transfer, fee included.
///
/// `floor(num_shares * share_price * (100 + fee_pct) / 100)` in mutez.
/// Rounding down never over-charges the buyer.
pub fn payable_amount(num_shares: u32, share_price: Mutez, fee_pct: u16) -> Result<Mutez, AmountError> {
    let gross = u128::from(num_shares) * u128::from(share_price.as_u64());
    let with_fee = gross
        .checked_mul(100 + u128::from(fee_pct))
        .ok_or(AmountError::Overflow)?
        / 100;

    u64::try_from(with_fee)
        .map(Mutez)
        .map_err(|_| AmountError::Overflow)
}

/// Render mutez as tez for display.
///
/// Amounts under 5 tez keep two decimals, larger ones are rounded to whole
/// tez with thousands separators.
pub fn format_tez(amount: Mutez) -> String {
    let mutez = amount.as_u64();
    if mutez == 0 {
        return "0".to_string();
    }

    if mutez < 5 * MUTEZ_PER_TEZ {
        // Round half up to hundredths of a tez
        let cents = (mutez + 5_000) / 10_000;
        format!("{}.{:02}", group_thousands(cents / 100), cents % 100)
    } else {
        let whole = (mutez + MUTEZ_PER_TEZ / 2) / MUTEZ_PER_TEZ;
        group_thousands(whole)
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Shorten an address or hash to `first5...last5` for display.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 13 {
        return address.to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 5..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tez_whole() {
        assert_eq!(parse_tez("10").unwrap(), Mutez(10_000_000));
    }

    #[test]
    fn test_parse_tez_decimal() {
        assert_eq!(parse_tez("1.5").unwrap(), Mutez(1_500_000));
        assert_eq!(parse_tez("0.000001").unwrap(), Mutez(1));
    }

    #[test]
    fn test_parse_tez_rejects_garbage() {
        assert!(matches!(parse_tez("1.2.3"), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(parse_tez("abc"), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(parse_tez(".5"), Err(AmountError::InvalidFormat(_))));
        assert!(matches!(parse_tez("1."), Err(AmountError::InvalidFormat(_))));
        assert_eq!(
            parse_tez("0.0000001"),
            Err(AmountError::TooManyDecimals { max: 6 })
        );
    }

    #[test]
    fn test_payable_amount_includes_fee() {
        // 3 shares at 10 tez with a 3% fee
        let amount = payable_amount(3, Mutez(10_000_000), 3).unwrap();
        assert_eq!(amount, Mutez(30_900_000));
    }

    #[test]
    fn test_payable_amount_rounds_down() {
        // 1 share at 0.000033 tez + 3% = 33.99 mutez
        let amount = payable_amount(1, Mutez(33), 3).unwrap();
        assert_eq!(amount, Mutez(33));
    }

    #[test]
    fn test_payable_amount_without_fee() {
        assert_eq!(payable_amount(7, Mutez(1_000_000), 0).unwrap(), Mutez(7_000_000));
    }

    #[test]
    fn test_payable_amount_overflow() {
        assert_eq!(
            payable_amount(u32::MAX, Mutez(u64::MAX), 3),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn test_format_tez() {
        assert_eq!(format_tez(Mutez(0)), "0");
        assert_eq!(format_tez(Mutez(1_500_000)), "1.50");
        assert_eq!(format_tez(Mutez(4_999_999)), "5.00");
        assert_eq!(format_tez(Mutez(30_900_000)), "31");
        assert_eq!(format_tez(Mutez(1_234_000_000)), "1,234");
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(
            shorten_address("tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb"),
            "tz1VS...Cjcjb"
        );
        assert_eq!(shorten_address("tz1abc"), "tz1abc");
    }
}
