use serde::{Deserialize, Serialize};

/// What the embedded-wallet provider tells us about the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub authenticated: bool,
    #[serde(default)]
    pub smart_wallet_address: Option<String>,
}

impl WalletSession {
    pub fn signed_in(address: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            smart_wallet_address: Some(address.into()),
        }
    }

    /// The smart-wallet address, only while authenticated.
    pub fn address(&self) -> Option<&str> {
        if !self.authenticated {
            return None;
        }
        self.smart_wallet_address
            .as_deref()
            .filter(|addr| !addr.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_requires_authentication() {
        let session = WalletSession {
            authenticated: false,
            smart_wallet_address: Some("0xabc".to_string()),
        };
        assert_eq!(session.address(), None);
        assert_eq!(WalletSession::signed_in("0xabc").address(), Some("0xabc"));
    }

    #[test]
    fn test_empty_address_is_absent() {
        assert_eq!(WalletSession::signed_in("").address(), None);
        assert_eq!(WalletSession::default().address(), None);
    }
}
