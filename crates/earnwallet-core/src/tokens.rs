//! Tokens the wallet can swap, keyed by symbol.

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Base mainnet.
pub const BASE_CHAIN_ID: u64 = 8453;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenConfig {
    pub symbol: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub decimals: u32,
}

pub const TOKENS: &[TokenConfig] = &[
    TokenConfig {
        symbol: "USDC",
        name: "USD Coin",
        address: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
        decimals: 6,
    },
    TokenConfig {
        symbol: "WETH",
        name: "Wrapped Ether",
        address: "0x4200000000000000000000000000000000000006",
        decimals: 18,
    },
    TokenConfig {
        symbol: "ETH",
        name: "Ether",
        address: "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE",
        decimals: 18,
    },
    TokenConfig {
        symbol: "cbBTC",
        name: "Coinbase Wrapped BTC",
        address: "0xcbB7C0000aB88B473b1f5aFd9ef808440eed33Bf",
        decimals: 8,
    },
];

/// Symbol lookup, case-insensitive.
pub fn token_by_symbol(symbol: &str) -> Option<&'static TokenConfig> {
    TOKENS.iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

/// Like [`token_by_symbol`], for callers that need an error.
pub fn resolve_token(symbol: &str) -> CoreResult<&'static TokenConfig> {
    token_by_symbol(symbol).ok_or_else(|| CoreError::UnknownToken(symbol.to_string()))
}

/// True when `amount` is a decimal number strictly greater than zero.
pub fn is_positive_amount(amount: &str) -> bool {
    Decimal::from_str(amount.trim())
        .map(|d| d > Decimal::ZERO)
        .unwrap_or(false)
}

/// Convert a human decimal amount ("1.5") into integer base units ("1500000"
/// for a 6-decimals token).
pub fn to_base_units(amount: &str, decimals: u32) -> CoreResult<String> {
    let value = Decimal::from_str(amount.trim())
        .map_err(|_| CoreError::InvalidAmount(amount.to_string()))?;
    if value.is_sign_negative() {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }
    if value.normalize().scale() > decimals {
        return Err(CoreError::TooPrecise {
            amount: amount.to_string(),
            decimals,
        });
    }

    let factor = 10i128
        .checked_pow(decimals)
        .and_then(|f| Decimal::try_from_i128_with_scale(f, 0).ok())
        .ok_or_else(|| CoreError::InvalidAmount(amount.to_string()))?;
    let units = value
        .checked_mul(factor)
        .ok_or_else(|| CoreError::InvalidAmount(amount.to_string()))?;

    Ok(units.trunc().normalize().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_lookup_ignores_case() {
        assert_eq!(token_by_symbol("usdc").map(|t| t.decimals), Some(6));
        assert_eq!(token_by_symbol("CBBTC").map(|t| t.symbol), Some("cbBTC"));
        assert!(token_by_symbol("DOGE").is_none());
    }

    #[test]
    fn test_resolve_unknown_token() {
        assert_eq!(resolve_token("weth").map(|t| t.decimals), Ok(18));
        assert_eq!(
            resolve_token("DOGE"),
            Err(CoreError::UnknownToken("DOGE".to_string()))
        );
    }

    #[test]
    fn test_positive_amount() {
        assert!(is_positive_amount("10"));
        assert!(is_positive_amount("0.0001"));
        assert!(!is_positive_amount("0"));
        assert!(!is_positive_amount("0.000"));
        assert!(!is_positive_amount("-1"));
        assert!(!is_positive_amount(""));
        assert!(!is_positive_amount("ten"));
    }

    #[test]
    fn test_base_units_conversion() {
        assert_eq!(to_base_units("10", 6).unwrap(), "10000000");
        assert_eq!(to_base_units("1.50", 6).unwrap(), "1500000");
        assert_eq!(to_base_units("0.000001", 6).unwrap(), "1");
        assert_eq!(to_base_units("2", 18).unwrap(), "2000000000000000000");
    }

    #[test]
    fn test_base_units_rejects_bad_input() {
        assert_eq!(
            to_base_units("0.0000001", 6),
            Err(CoreError::TooPrecise {
                amount: "0.0000001".to_string(),
                decimals: 6
            })
        );
        assert!(matches!(to_base_units("abc", 6), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(to_base_units("-3", 6), Err(CoreError::InvalidAmount(_))));
    }
}
