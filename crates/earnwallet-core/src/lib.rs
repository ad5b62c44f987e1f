//! # Earn Wallet Core
//!
//! Data models shared by the query layer and the proxy server.
//!
//! The shapes here mirror what the upstream APIs return (Dune Sim activity,
//! token info and transactions, the 0x swap quote) plus the static vault and
//! token tables the front-end renders from.

pub mod error;
pub mod models;
pub mod session;
pub mod tokens;
pub mod vaults;

pub use error::*;
pub use models::*;
pub use session::*;
pub use tokens::*;
pub use vaults::*;
