//! Error types for Earn Wallet Core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Unknown token symbol: {0}")]
    UnknownToken(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Amount {amount} has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u32 },
}

pub type CoreResult<T> = Result<T, CoreError>;
