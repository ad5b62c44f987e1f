//! # Earn Wallet Query
//!
//! Read-only data layer of the wallet front-end.
//!
//! - [`key`]: structural cache keys, namespaced per query kind
//! - [`fetch`]: remote fetch functions (no retries)
//! - [`client`]: the shared cache store with request de-duplication
//! - [`observer`] and [`hooks`]: per-consumer views with staleness,
//!   refresh, eviction and retry policies

pub mod client;
pub mod error;
pub mod fetch;
pub mod hooks;
pub mod key;
pub mod observer;
pub mod query;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CacheEntry, CacheValue, QueryClient, QueryStatus, SharedFetch, Subscription};
pub use error::{FetchResult, RemoteFetchError};
pub use fetch::{FetcherConfig, HttpFetcher, RemoteFetch};
pub use hooks::{use_activity, use_swap_quote, use_token_info};
pub use key::QueryKey;
pub use observer::{QueryKind, QueryObserver, QueryOptions, QueryState};
pub use query::{ActivityQuery, SwapQuoteQuery, TokenInfoQuery};
pub use retry::{retry_delay, RetryPolicy};
