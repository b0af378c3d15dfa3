//! Token identity and amount conversion
//!
//! A token is identified by `(chain_id, address)`. Addresses are parsed into
//! `Address`, so identity does not depend on the letter case of the hex input.

mod registry;

pub use registry::TokenRegistry;

use crate::config::MAX_DECIMALS;
use crate::error::{SwapError, SwapResult};

use ethers::types::{Address, H160, U256};
use ethers::utils::{format_units, parse_units};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel address standing for the chain's native currency
pub const NATIVE_ADDRESS: Address = H160([0u8; 20]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId {
    pub chain_id: u64,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub logo_ref: Option<String>,
}

impl Token {
    pub fn id(&self) -> TokenId {
        TokenId {
            chain_id: self.chain_id,
            address: self.address,
        }
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_ADDRESS
    }

    /// Same `(chain_id, address)` identity
    pub fn same_as(&self, other: &Token) -> bool {
        self.id() == other.id()
    }

    /// Parse a user-entered decimal amount into base units
    pub fn parse_amount(&self, input: &str) -> SwapResult<U256> {
        parse_amount(input, self.decimals)
    }

    pub fn format_amount(&self, amount: U256) -> String {
        format_amount(amount, self.decimals)
    }
}

/// Parse a non-negative decimal string ("10", "0.25") into base units
pub fn parse_amount(input: &str, decimals: u8) -> SwapResult<U256> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SwapError::InvalidAmount("empty amount".to_string()));
    }
    if trimmed.starts_with('-') {
        return Err(SwapError::InvalidAmount(format!("negative amount {}", trimmed)));
    }
    let fraction_digits = trimmed.split('.').nth(1).map(str::len).unwrap_or(0);
    if fraction_digits > decimals as usize {
        return Err(SwapError::InvalidAmount(format!(
            "{} has more than {} decimals",
            trimmed, decimals
        )));
    }

    parse_units(trimmed, decimals as u32)
        .map(U256::from)
        .map_err(|e| SwapError::InvalidAmount(format!("{}: {}", trimmed, e)))
}

/// Format base units as a decimal string without trailing zeros
pub fn format_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, decimals as u32) {
        Ok(s) if s.contains('.') => s.trim_end_matches('0').trim_end_matches('.').to_string(),
        Ok(s) => s,
        Err(_) => amount.to_string(),
    }
}

/// Convert base units between tokens of different precision, rounding down
pub fn rescale(amount: U256, from_decimals: u8, to_decimals: u8) -> SwapResult<U256> {
    let gap = from_decimals.abs_diff(to_decimals);
    if gap > MAX_DECIMALS {
        // 10^gap does not fit in a U256
        return match from_decimals.cmp(&to_decimals) {
            Ordering::Greater => Ok(U256::zero()),
            _ if amount.is_zero() => Ok(amount),
            _ => Err(SwapError::AmountOverflow("decimal rescale")),
        };
    }

    let factor = U256::exp10(gap as usize);
    match from_decimals.cmp(&to_decimals) {
        Ordering::Equal => Ok(amount),
        Ordering::Less => amount
            .checked_mul(factor)
            .ok_or(SwapError::AmountOverflow("decimal rescale")),
        Ordering::Greater => Ok(amount / factor),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_parse_amount() {
        assert_eq!(
            parse_amount("10", 18).unwrap(),
            U256::from(10u64) * U256::exp10(18)
        );
        assert_eq!(parse_amount("100", 6).unwrap(), U256::from(100_000_000u64));
        assert_eq!(parse_amount(" 0.5 ", 6).unwrap(), U256::from(500_000u64));
        assert!(parse_amount("", 18).is_err());
        assert!(parse_amount("-1", 18).is_err());
        assert!(parse_amount("abc", 18).is_err());
        assert!(parse_amount("0.1234567", 6).is_err());
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(U256::from(47_500_000u64), 6), "47.5");
        assert_eq!(format_amount(U256::exp10(18), 18), "1");
        assert_eq!(format_amount(U256::zero(), 18), "0");
    }

    #[test]
    fn test_rescale() {
        assert_eq!(
            rescale(U256::from(1_500_000u64), 6, 18).unwrap(),
            U256::from(15u64) * U256::exp10(17)
        );
        assert_eq!(rescale(U256::exp10(18) + 1, 18, 6).unwrap(), U256::from(1_000_000u64));
        assert_eq!(rescale(U256::from(7u64), 8, 8).unwrap(), U256::from(7u64));
        assert!(rescale(U256::MAX, 0, 18).is_err());
    }

    #[test]
    fn test_rescale_beyond_u256_scale() {
        assert!(rescale(U256::one(), 0, 78).is_err());
        assert_eq!(rescale(U256::zero(), 0, 78).unwrap(), U256::zero());
        assert_eq!(rescale(U256::MAX, 78, 0).unwrap(), U256::zero());
    }

    #[test]
    fn test_identity_ignores_address_case() {
        let lower = Address::from_str("0xa1077a294dde1b09bb078844df40758a5d0f9a27").unwrap();
        let mixed = Address::from_str("0xA1077a294dDE1B09bB078844df40758a5D0f9a27").unwrap();
        let a = Token {
            chain_id: 369,
            address: lower,
            symbol: "WPLS".into(),
            name: "Wrapped Pulse".into(),
            decimals: 18,
            logo_ref: None,
        };
        let b = Token {
            address: mixed,
            symbol: "wpls".into(),
            ..a.clone()
        };
        assert!(a.same_as(&b));
        assert!(!a.is_native());
    }
}
