//! Query observers: the Rust side of a data hook.
//!
//! Creating an observer is "mounting" it: it attaches to its key, fetches if
//! the cached data is missing or stale, and starts its refresh timer. Dropping
//! it is "unmounting": the timer stops and the entry becomes eligible for
//! eviction once nothing else observes it. A fetch still running at that point
//! lands in the cache for the next observer.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::client::{CacheEntry, CacheValue, FetchSpec, QueryClient, QueryStatus, SharedFetch};
use crate::error::{FetchResult, RemoteFetchError};
use crate::fetch::RemoteFetch;
use crate::key::QueryKey;
use crate::retry::RetryPolicy;

/// Caching and retry policy of one query kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Data younger than this is served from cache without a fetch.
    pub stale_time: Duration,
    /// Unobserved entries are dropped after this long.
    pub gc_time: Duration,
    /// Refetch on this period while observed.
    pub refetch_interval: Option<Duration>,
    pub retry: RetryPolicy,
}

/// A request kind the cache knows how to key, gate and fetch.
pub trait QueryKind: Clone + Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;

    fn key(&self) -> QueryKey;

    fn is_enabled(&self) -> bool;

    fn options(&self) -> QueryOptions;

    fn fetch(&self, fetcher: Arc<dyn RemoteFetch>) -> BoxFuture<'static, FetchResult<Self::Data>>;

    fn into_value(data: Self::Data) -> CacheValue;

    fn from_value(value: &CacheValue) -> Option<Self::Data>;
}

/// What a consumer renders from.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub error: Option<RemoteFetchError>,
    pub status: QueryStatus,
    /// No data yet and a fetch is running: show a skeleton.
    pub is_loading: bool,
    pub is_fetching: bool,
    pub is_error: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    /// State of a disabled query: nothing to show, nothing loading.
    pub fn idle() -> Self {
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            is_loading: false,
            is_fetching: false,
            is_error: false,
            updated_at: None,
        }
    }

    fn from_entry(entry: &CacheEntry, data: Option<T>) -> Self {
        Self {
            data,
            error: entry.error.clone(),
            status: entry.status,
            is_loading: entry.status == QueryStatus::Pending && entry.is_fetching,
            is_fetching: entry.is_fetching,
            is_error: entry.status == QueryStatus::Error,
            updated_at: entry.updated_at,
        }
    }
}

pub struct QueryObserver<Q: QueryKind> {
    client: QueryClient,
    query: Q,
    key: QueryKey,
    spec: Option<FetchSpec>,
    updates: Option<watch::Receiver<u64>>,
    refresh: Option<DropGuard>,
}

impl<Q: QueryKind> QueryObserver<Q> {
    pub fn new(client: &QueryClient, query: Q) -> Self {
        let key = query.key();
        if !query.is_enabled() {
            tracing::debug!(key = %key, "Query disabled");
            return Self {
                client: client.clone(),
                query,
                key,
                spec: None,
                updates: None,
                refresh: None,
            };
        }

        let options = query.options();
        let updates = client.attach(&key, Some(options.gc_time));
        let spec = fetch_spec(client, &query, options.retry);
        let _ = client.fetch_if_stale(&key, options.stale_time, spec.clone());
        let refresh = options
            .refetch_interval
            .map(|every| spawn_refresh(client.clone(), key.clone(), spec.clone(), every));

        Self {
            client: client.clone(),
            query,
            key,
            spec: Some(spec),
            updates: Some(updates),
            refresh,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn is_enabled(&self) -> bool {
        self.updates.is_some()
    }

    pub fn state(&self) -> QueryState<Q::Data> {
        if !self.is_enabled() {
            return QueryState::idle();
        }
        match self.client.entry(&self.key) {
            Some(entry) => {
                let data = entry.value.as_ref().and_then(Q::from_value);
                QueryState::from_entry(&entry, data)
            }
            None => QueryState::idle(),
        }
    }

    /// Fetch now regardless of staleness; the manual retry button.
    /// Returns `None` for a disabled query.
    pub fn refetch(&self) -> Option<SharedFetch> {
        let spec = self.spec.clone()?;
        tracing::debug!(key = %self.key, "Manual refetch");
        Some(self.client.fetch(&self.key, spec))
    }

    /// Wait for the next change to the entry. `false` when there is nothing
    /// to wait for (disabled, or the entry was removed).
    pub async fn changed(&mut self) -> bool {
        match self.updates.as_mut() {
            Some(updates) => updates.changed().await.is_ok(),
            None => false,
        }
    }

    /// Wait until no fetch is running and return the resulting state.
    pub async fn settled(&mut self) -> QueryState<Q::Data> {
        loop {
            let state = self.state();
            if !state.is_fetching || !self.changed().await {
                return state;
            }
        }
    }
}

impl<Q: QueryKind> Drop for QueryObserver<Q> {
    fn drop(&mut self) {
        // Stop the timer before letting go of the entry.
        drop(self.refresh.take());
        if self.updates.take().is_some() {
            self.client.detach(&self.key);
        }
    }
}

fn fetch_spec<Q: QueryKind>(client: &QueryClient, query: &Q, retry: RetryPolicy) -> FetchSpec {
    let fetcher = client.fetcher();
    let query = query.clone();
    FetchSpec {
        fetch: Arc::new(move || {
            query
                .fetch(Arc::clone(&fetcher))
                .map(|result| result.map(Q::into_value))
                .boxed()
        }),
        retry,
    }
}

fn spawn_refresh(client: QueryClient, key: QueryKey, spec: FetchSpec, every: Duration) -> DropGuard {
    let token = CancellationToken::new();
    let cancelled = token.clone();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::debug!(key = %key, interval_ms = %every.as_millis(), "Refreshing on interval");
                    let _ = client.fetch(&key, spec.clone());
                }
            }
        }
        tracing::debug!(key = %key, "Refresh timer stopped");
    });

    token.drop_guard()
}
