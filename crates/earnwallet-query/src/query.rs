//! Request parameters for each query kind and the predicates that gate them.

use earnwallet_core::{is_positive_amount, WalletSession};

use crate::key::QueryKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityQuery {
    pub address: String,
    /// Comma separated chain ids, e.g. "8453" or "1,8453".
    pub chain_ids: Option<String>,
}

impl ActivityQuery {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            chain_ids: None,
        }
    }

    pub fn with_chain_ids(mut self, chain_ids: impl Into<String>) -> Self {
        self.chain_ids = Some(chain_ids.into());
        self
    }

    /// Activity for the signed-in smart wallet. Without one the query is
    /// disabled.
    pub fn for_session(session: &WalletSession) -> Self {
        Self::new(session.address().unwrap_or_default())
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::activity(self.address.clone(), self.chain_ids.clone())
    }

    pub fn is_enabled(&self) -> bool {
        !self.address.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapQuoteQuery {
    /// Token symbol, see `earnwallet_core::TOKENS`.
    pub sell_token: String,
    pub buy_token: String,
    /// Human decimal amount of `sell_token`.
    pub sell_amount: String,
    pub taker: String,
    pub enabled: bool,
    pub should_fetch: bool,
}

impl SwapQuoteQuery {
    pub fn new(
        sell_token: impl Into<String>,
        buy_token: impl Into<String>,
        sell_amount: impl Into<String>,
        taker: impl Into<String>,
    ) -> Self {
        Self {
            sell_token: sell_token.into(),
            buy_token: buy_token.into(),
            sell_amount: sell_amount.into(),
            taker: taker.into(),
            enabled: true,
            should_fetch: true,
        }
    }

    pub fn should_fetch(mut self, should_fetch: bool) -> Self {
        self.should_fetch = should_fetch;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// The gating flags are not part of the key: toggling them must not lose
    /// an already cached quote.
    pub fn key(&self) -> QueryKey {
        QueryKey::swap_quote(
            self.sell_token.clone(),
            self.buy_token.clone(),
            self.sell_amount.clone(),
            self.taker.clone(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
            && self.should_fetch
            && !self.sell_token.is_empty()
            && !self.buy_token.is_empty()
            && !self.sell_token.eq_ignore_ascii_case(&self.buy_token)
            && !self.taker.is_empty()
            && is_positive_amount(&self.sell_amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfoQuery {
    pub contract_address: String,
    pub chain_ids: Option<String>,
}

impl TokenInfoQuery {
    pub fn new(contract_address: impl Into<String>) -> Self {
        Self {
            contract_address: contract_address.into(),
            chain_ids: None,
        }
    }

    pub fn with_chain_ids(mut self, chain_ids: impl Into<String>) -> Self {
        self.chain_ids = Some(chain_ids.into());
        self
    }

    pub fn key(&self) -> QueryKey {
        QueryKey::token_info(self.contract_address.clone(), self.chain_ids.clone())
    }

    pub fn is_enabled(&self) -> bool {
        !self.contract_address.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_quote_gating() {
        let base = SwapQuoteQuery::new("USDC", "WETH", "10", "0xabc");
        assert!(base.is_enabled());

        assert!(!SwapQuoteQuery::new("USDC", "USDC", "10", "0xabc").is_enabled());
        assert!(!SwapQuoteQuery::new("USDC", "usdc", "10", "0xabc").is_enabled());
        assert!(!SwapQuoteQuery::new("USDC", "WETH", "0", "0xabc").is_enabled());
        assert!(!SwapQuoteQuery::new("USDC", "WETH", "", "0xabc").is_enabled());
        assert!(!SwapQuoteQuery::new("", "WETH", "10", "0xabc").is_enabled());
        assert!(!SwapQuoteQuery::new("USDC", "WETH", "10", "").is_enabled());
        assert!(!base.clone().should_fetch(false).is_enabled());
        assert!(!base.enabled(false).is_enabled());
    }

    #[test]
    fn test_gating_flags_do_not_change_key() {
        let on = SwapQuoteQuery::new("USDC", "WETH", "10", "0xabc");
        let off = on.clone().should_fetch(false);
        assert_eq!(on.key(), off.key());
    }

    #[test]
    fn test_activity_for_session() {
        let anon = ActivityQuery::for_session(&WalletSession::default());
        assert!(!anon.is_enabled());

        let signed_in = ActivityQuery::for_session(&WalletSession::signed_in("0xabc"));
        assert!(signed_in.is_enabled());
        assert_eq!(signed_in.key(), QueryKey::activity("0xabc", None));
    }

    #[test]
    fn test_token_info_requires_address() {
        assert!(!TokenInfoQuery::new("").is_enabled());
        assert!(TokenInfoQuery::new("0xdef").with_chain_ids("8453").is_enabled());
    }
}
