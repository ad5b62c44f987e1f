//! Query key registry.
//!
//! A key is a namespaced record of the parameters that identify a request.
//! Fields are named, so equality never depends on argument order, and the
//! variant acts as the namespace so an activity lookup and a token info
//! lookup for the same address never collide.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    Activity {
        address: String,
        chain_ids: Option<String>,
    },
    SwapQuote {
        sell_token: String,
        buy_token: String,
        sell_amount: String,
        taker: String,
    },
    TokenInfo {
        contract_address: String,
        chain_ids: Option<String>,
    },
}

impl QueryKey {
    pub fn activity(address: impl Into<String>, chain_ids: Option<String>) -> Self {
        QueryKey::Activity {
            address: address.into(),
            chain_ids,
        }
    }

    pub fn swap_quote(
        sell_token: impl Into<String>,
        buy_token: impl Into<String>,
        sell_amount: impl Into<String>,
        taker: impl Into<String>,
    ) -> Self {
        QueryKey::SwapQuote {
            sell_token: sell_token.into(),
            buy_token: buy_token.into(),
            sell_amount: sell_amount.into(),
            taker: taker.into(),
        }
    }

    pub fn token_info(contract_address: impl Into<String>, chain_ids: Option<String>) -> Self {
        QueryKey::TokenInfo {
            contract_address: contract_address.into(),
            chain_ids,
        }
    }

    pub fn namespace(&self) -> &'static str {
        match self {
            QueryKey::Activity { .. } => "activity",
            QueryKey::SwapQuote { .. } => "swap-quote",
            QueryKey::TokenInfo { .. } => "token-info",
        }
    }

    /// `(field, value)` pairs after the namespace, in declaration order.
    pub fn fields(&self) -> Vec<(&'static str, Option<&str>)> {
        match self {
            QueryKey::Activity { address, chain_ids } => vec![
                ("address", Some(address.as_str())),
                ("chain_ids", chain_ids.as_deref()),
            ],
            QueryKey::SwapQuote {
                sell_token,
                buy_token,
                sell_amount,
                taker,
            } => vec![
                ("sell_token", Some(sell_token.as_str())),
                ("buy_token", Some(buy_token.as_str())),
                ("sell_amount", Some(sell_amount.as_str())),
                ("taker", Some(taker.as_str())),
            ],
            QueryKey::TokenInfo {
                contract_address,
                chain_ids,
            } => vec![
                ("contract_address", Some(contract_address.as_str())),
                ("chain_ids", chain_ids.as_deref()),
            ],
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.namespace())?;
        for (i, (name, value)) in self.fields().into_iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match value {
                Some(v) => write!(f, "{}={:?}", name, v)?,
                None => write!(f, "{}=none", name)?,
            }
        }
        write!(f, "]")
    }
}
