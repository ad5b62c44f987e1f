//! The three data hooks and their caching policies.
//!
//! | Hook       | Stale  | Evict   | Refresh | Retry                       |
//! |------------|--------|---------|---------|-----------------------------|
//! | Activity   | 15s    | default | 30s     | 3x, not on 4xx, backoff     |
//! | Swap quote | 10s    | 20s     | -       | once                        |
//! | Token info | 5 min  | default | -       | 3x, not on 4xx, backoff     |

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;

use earnwallet_core::{ActivityResponse, QuoteResponse, TokenInfoResponse};

use crate::client::{CacheValue, QueryClient, DEFAULT_GC_TIME};
use crate::error::FetchResult;
use crate::fetch::RemoteFetch;
use crate::key::QueryKey;
use crate::observer::{QueryKind, QueryObserver, QueryOptions};
use crate::query::{ActivityQuery, SwapQuoteQuery, TokenInfoQuery};
use crate::retry::RetryPolicy;

pub const ACTIVITY_OPTIONS: QueryOptions = QueryOptions {
    stale_time: Duration::from_secs(15),
    gc_time: DEFAULT_GC_TIME,
    refetch_interval: Some(Duration::from_secs(30)),
    retry: RetryPolicy::skip_client_errors(3),
};

pub const SWAP_QUOTE_OPTIONS: QueryOptions = QueryOptions {
    stale_time: Duration::from_secs(10),
    gc_time: Duration::from_secs(20),
    refetch_interval: None,
    retry: RetryPolicy::times(1),
};

pub const TOKEN_INFO_OPTIONS: QueryOptions = QueryOptions {
    stale_time: Duration::from_secs(5 * 60),
    gc_time: DEFAULT_GC_TIME,
    refetch_interval: None,
    retry: RetryPolicy::skip_client_errors(3),
};

impl QueryKind for ActivityQuery {
    type Data = ActivityResponse;

    fn key(&self) -> QueryKey {
        ActivityQuery::key(self)
    }

    fn is_enabled(&self) -> bool {
        ActivityQuery::is_enabled(self)
    }

    fn options(&self) -> QueryOptions {
        ACTIVITY_OPTIONS
    }

    fn fetch(&self, fetcher: Arc<dyn RemoteFetch>) -> BoxFuture<'static, FetchResult<ActivityResponse>> {
        let query = self.clone();
        async move { fetcher.fetch_activity(&query).await }.boxed()
    }

    fn into_value(data: ActivityResponse) -> CacheValue {
        CacheValue::Activity(data)
    }

    fn from_value(value: &CacheValue) -> Option<ActivityResponse> {
        match value {
            CacheValue::Activity(data) => Some(data.clone()),
            _ => None,
        }
    }
}

impl QueryKind for SwapQuoteQuery {
    type Data = QuoteResponse;

    fn key(&self) -> QueryKey {
        SwapQuoteQuery::key(self)
    }

    fn is_enabled(&self) -> bool {
        SwapQuoteQuery::is_enabled(self)
    }

    fn options(&self) -> QueryOptions {
        SWAP_QUOTE_OPTIONS
    }

    fn fetch(&self, fetcher: Arc<dyn RemoteFetch>) -> BoxFuture<'static, FetchResult<QuoteResponse>> {
        let query = self.clone();
        async move { fetcher.fetch_swap_quote(&query).await }.boxed()
    }

    fn into_value(data: QuoteResponse) -> CacheValue {
        CacheValue::SwapQuote(data)
    }

    fn from_value(value: &CacheValue) -> Option<QuoteResponse> {
        match value {
            CacheValue::SwapQuote(data) => Some(data.clone()),
            _ => None,
        }
    }
}

impl QueryKind for TokenInfoQuery {
    type Data = TokenInfoResponse;

    fn key(&self) -> QueryKey {
        TokenInfoQuery::key(self)
    }

    fn is_enabled(&self) -> bool {
        TokenInfoQuery::is_enabled(self)
    }

    fn options(&self) -> QueryOptions {
        TOKEN_INFO_OPTIONS
    }

    fn fetch(&self, fetcher: Arc<dyn RemoteFetch>) -> BoxFuture<'static, FetchResult<TokenInfoResponse>> {
        let query = self.clone();
        async move { fetcher.fetch_token_info(&query).await }.boxed()
    }

    fn into_value(data: TokenInfoResponse) -> CacheValue {
        CacheValue::TokenInfo(data)
    }

    fn from_value(value: &CacheValue) -> Option<TokenInfoResponse> {
        match value {
            CacheValue::TokenInfo(data) => Some(data.clone()),
            _ => None,
        }
    }
}

/// Wallet activity, refreshed every 30s while observed.
pub fn use_activity(client: &QueryClient, query: ActivityQuery) -> QueryObserver<ActivityQuery> {
    QueryObserver::new(client, query)
}

pub fn use_swap_quote(client: &QueryClient, query: SwapQuoteQuery) -> QueryObserver<SwapQuoteQuery> {
    QueryObserver::new(client, query)
}

pub fn use_token_info(client: &QueryClient, query: TokenInfoQuery) -> QueryObserver<TokenInfoQuery> {
    QueryObserver::new(client, query)
}
