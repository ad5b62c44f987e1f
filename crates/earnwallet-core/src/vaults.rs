//! Vaults offered on the Earn page. Read-only.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VaultInfo {
    pub address: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Symbol of the backing token, see [`crate::tokens::TOKENS`].
    pub token: &'static str,
}

pub const VAULTS: &[VaultInfo] = &[
    VaultInfo {
        address: "0xbeeF010f9cb27031ad51e3333f9aF9C6B1228183",
        name: "Steakhouse USDC",
        description: "Lends USDC to blue-chip collateral markets with conservative loan-to-value limits.",
        token: "USDC",
    },
    VaultInfo {
        address: "0xc1256Ae5FF1cf2719D4937adb3bbCCab2E00A2Ca",
        name: "Moonwell Flagship USDC",
        description: "Diversified USDC lending curated for steady yield on Base.",
        token: "USDC",
    },
    VaultInfo {
        address: "0xa0E430870c4604CcfC7B38Ca7845B1FF653D0ff1",
        name: "Moonwell Flagship ETH",
        description: "Supplies WETH to overcollateralized lending markets.",
        token: "WETH",
    },
];

/// Address lookup, case-insensitive since addresses arrive checksummed or not.
pub fn vault_by_address(address: &str) -> Option<&'static VaultInfo> {
    VAULTS
        .iter()
        .find(|v| v.address.eq_ignore_ascii_case(address))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::token_by_symbol;

    #[test]
    fn test_lookup_ignores_checksum_case() {
        let vault = vault_by_address("0xbeef010f9cb27031ad51e3333f9af9c6b1228183").unwrap();
        assert_eq!(vault.name, "Steakhouse USDC");
        assert!(vault_by_address("0x0000000000000000000000000000000000000000").is_none());
    }

    #[test]
    fn test_every_vault_token_is_known() {
        for vault in VAULTS {
            assert!(
                token_by_symbol(vault.token).is_some(),
                "vault {} backed by unknown token {}",
                vault.name,
                vault.token
            );
        }
    }

    #[test]
    fn test_addresses_are_unique() {
        let mut addrs: Vec<String> = VAULTS.iter().map(|v| v.address.to_lowercase()).collect();
        addrs.sort();
        addrs.dedup();
        assert_eq!(addrs.len(), VAULTS.len());
    }
}
