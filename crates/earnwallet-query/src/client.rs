//! Shared query cache.
//!
//! One [`QueryClient`] per session. Entries are keyed by [`QueryKey`]; only
//! the fetch pipeline writes results into them. Observers and subscriptions
//! attach to a key, and an entry with no one attached is evicted once its
//! eviction window passes.
//!
//! At most one fetch per key is in flight. Anyone asking for a fetch while
//! one is running gets a handle to the running one.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use earnwallet_core::{ActivityResponse, QuoteResponse, TokenInfoResponse};

use crate::error::FetchResult;
use crate::fetch::RemoteFetch;
use crate::key::QueryKey;
use crate::retry::{with_retry, RetryPolicy};

/// Eviction window for entries whose query does not set one.
pub const DEFAULT_GC_TIME: Duration = Duration::from_secs(5 * 60);

/// Cached value wrapper
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Activity(ActivityResponse),
    SwapQuote(QuoteResponse),
    TokenInfo(TokenInfoResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// No data yet.
    Pending,
    Success,
    /// The last fetch failed. Earlier data, if any, is kept.
    Error,
}

/// Snapshot of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: QueryKey,
    pub value: Option<CacheValue>,
    pub error: Option<crate::error::RemoteFetchError>,
    pub status: QueryStatus,
    pub fetched_at: Option<Instant>,
    pub updated_at: Option<DateTime<Utc>>,
    pub is_fetching: bool,
    pub observers: usize,
}

impl CacheEntry {
    fn new(key: QueryKey) -> Self {
        Self {
            key,
            value: None,
            error: None,
            status: QueryStatus::Pending,
            fetched_at: None,
            updated_at: None,
            is_fetching: false,
            observers: 0,
        }
    }
}

pub type FetchFn = Arc<dyn Fn() -> BoxFuture<'static, FetchResult<CacheValue>> + Send + Sync>;

/// Completes once the fetch it was handed out for has settled into the cache.
pub type SharedFetch = Shared<BoxFuture<'static, ()>>;

/// How to (re)fetch an entry.
#[derive(Clone)]
pub(crate) struct FetchSpec {
    pub fetch: FetchFn,
    pub retry: RetryPolicy,
}

struct InFlight {
    id: u64,
    future: SharedFetch,
    /// `false` while nobody observes the key; the fetch then stops retrying.
    keep_retrying: watch::Sender<bool>,
}

struct Slot {
    entry: CacheEntry,
    invalidated: bool,
    gc_time: Duration,
    gc_generation: u64,
    spec: Option<FetchSpec>,
    in_flight: Option<InFlight>,
    version: u64,
    updates: watch::Sender<u64>,
}

impl Slot {
    fn new(key: QueryKey) -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            entry: CacheEntry::new(key),
            invalidated: false,
            gc_time: DEFAULT_GC_TIME,
            gc_generation: 0,
            spec: None,
            in_flight: None,
            version: 0,
            updates,
        }
    }

    fn notify(&mut self) {
        self.version += 1;
        self.updates.send_replace(self.version);
    }

    fn is_stale(&self, stale_time: Duration) -> bool {
        if self.entry.value.is_none() || self.invalidated {
            return true;
        }
        match self.entry.fetched_at {
            Some(at) => at.elapsed() >= stale_time,
            None => true,
        }
    }
}

#[derive(Default)]
struct Store {
    slots: Mutex<HashMap<QueryKey, Slot>>,
    next_fetch_id: AtomicU64,
}

impl Store {
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn evict_if_idle(&self, key: &QueryKey, generation: u64) {
        let mut slots = self.lock();
        let idle = slots
            .get(key)
            .map(|slot| {
                slot.gc_generation == generation
                    && slot.entry.observers == 0
                    && slot.in_flight.is_none()
            })
            .unwrap_or(false);
        if idle {
            slots.remove(key);
            tracing::debug!(key = %key, "Evicted idle cache entry");
        }
    }
}

#[derive(Clone)]
pub struct QueryClient {
    store: Arc<Store>,
    fetcher: Arc<dyn RemoteFetch>,
}

impl QueryClient {
    pub fn new(fetcher: Arc<dyn RemoteFetch>) -> Self {
        Self {
            store: Arc::new(Store::default()),
            fetcher,
        }
    }

    pub fn fetcher(&self) -> Arc<dyn RemoteFetch> {
        Arc::clone(&self.fetcher)
    }

    pub fn get_query_data(&self, key: &QueryKey) -> Option<CacheValue> {
        self.store.lock().get(key).and_then(|slot| slot.entry.value.clone())
    }

    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.store.lock().get(key).map(|slot| slot.entry.clone())
    }

    /// Write a value as if a fetch had just returned it.
    pub fn set_query_data(&self, key: QueryKey, value: CacheValue) {
        let mut slots = self.store.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key));
        slot.entry.value = Some(value);
        slot.entry.error = None;
        slot.entry.status = QueryStatus::Success;
        slot.entry.fetched_at = Some(Instant::now());
        slot.entry.updated_at = Some(Utc::now());
        slot.invalidated = false;
        slot.notify();
        if slot.entry.observers == 0 {
            self.schedule_gc(slot);
        }
    }

    /// Mark an entry stale. If anyone is observing it a refetch starts right
    /// away; returns whether one did.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut slots = self.store.lock();
        let Some(slot) = slots.get_mut(key) else {
            return false;
        };
        slot.invalidated = true;
        slot.notify();

        match slot.spec.clone() {
            Some(spec) if slot.entry.observers > 0 => {
                // Nothing requested before the invalidation may land.
                if let Some(stale) = slot.in_flight.take() {
                    stale.keep_retrying.send_replace(false);
                    tracing::debug!(key = %key, "Superseding in-flight fetch");
                }
                tracing::debug!(key = %key, "Invalidated, refetching");
                let _ = self.start_fetch(slot, spec);
                true
            }
            _ => false,
        }
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        let slot = self.store.lock().remove(key)?;
        if let Some(in_flight) = &slot.in_flight {
            in_flight.keep_retrying.send_replace(false);
        }
        Some(slot.entry)
    }

    /// Call `callback` with a fresh snapshot every time the entry changes.
    ///
    /// A live subscription counts as an observer, so the entry is not evicted
    /// under it. Dropping the returned handle unsubscribes.
    pub fn subscribe<F>(&self, key: &QueryKey, callback: F) -> Subscription
    where
        F: Fn(&CacheEntry) + Send + 'static,
    {
        let mut updates = self.attach(key, None);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let client = self.clone();
        let watched = key.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(entry) = client.entry(&watched) {
                            callback(&entry);
                        }
                    }
                }
            }
        });

        Subscription {
            client: self.clone(),
            key: key.clone(),
            _guard: token.drop_guard(),
        }
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.store.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Register an observer on `key`, creating the entry if needed.
    pub(crate) fn attach(&self, key: &QueryKey, gc_time: Option<Duration>) -> watch::Receiver<u64> {
        let mut slots = self.store.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));
        slot.entry.observers += 1;
        // Any pending eviction is now outdated.
        slot.gc_generation += 1;
        if slot.entry.observers == 1 {
            if let Some(in_flight) = &slot.in_flight {
                // Observed again: a running fetch gets its retries back.
                in_flight.keep_retrying.send_replace(true);
            }
        }
        if let Some(gc_time) = gc_time {
            slot.gc_time = gc_time;
        }
        slot.updates.subscribe()
    }

    pub(crate) fn detach(&self, key: &QueryKey) {
        let mut slots = self.store.lock();
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        slot.entry.observers = slot.entry.observers.saturating_sub(1);
        if slot.entry.observers == 0 {
            if let Some(in_flight) = &slot.in_flight {
                in_flight.keep_retrying.send_replace(false);
            }
            self.schedule_gc(slot);
        }
    }

    pub(crate) fn fetch_if_stale(
        &self,
        key: &QueryKey,
        stale_time: Duration,
        spec: FetchSpec,
    ) -> Option<SharedFetch> {
        let mut slots = self.store.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));
        if slot.is_stale(stale_time) {
            Some(self.start_fetch(slot, spec))
        } else {
            slot.spec = Some(spec);
            tracing::debug!(key = %key, "Cache hit, data still fresh");
            None
        }
    }

    /// Fetch regardless of staleness, joining a running fetch if there is one.
    pub(crate) fn fetch(&self, key: &QueryKey, spec: FetchSpec) -> SharedFetch {
        let mut slots = self.store.lock();
        let slot = slots
            .entry(key.clone())
            .or_insert_with(|| Slot::new(key.clone()));
        self.start_fetch(slot, spec)
    }

    fn start_fetch(&self, slot: &mut Slot, spec: FetchSpec) -> SharedFetch {
        slot.spec = Some(spec.clone());
        if let Some(in_flight) = &slot.in_flight {
            tracing::debug!(key = %slot.entry.key, "Joining in-flight fetch");
            return in_flight.future.clone();
        }

        let id = self.store.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        let (keep_retrying, retries) = watch::channel(true);
        let client = self.clone();
        let key = slot.entry.key.clone();

        let future = async move {
            let start = std::time::Instant::now();
            let result = with_retry(spec.retry, retries, || (spec.fetch)()).await;
            tracing::debug!(
                key = %key,
                ok = %result.is_ok(),
                duration_ms = %start.elapsed().as_millis(),
                "Fetch settled"
            );
            client.settle(&key, id, result);
        }
        .boxed()
        .shared();

        tracing::debug!(key = %slot.entry.key, "Starting fetch");
        slot.in_flight = Some(InFlight {
            id,
            future: future.clone(),
            keep_retrying,
        });
        slot.entry.is_fetching = true;
        slot.notify();

        tokio::spawn(future.clone());
        future
    }

    fn settle(&self, key: &QueryKey, id: u64, result: FetchResult<CacheValue>) {
        let mut slots = self.store.lock();
        let Some(slot) = slots.get_mut(key) else {
            tracing::debug!(key = %key, "Entry removed before its fetch settled");
            return;
        };
        if slot.in_flight.as_ref().map(|f| f.id) != Some(id) {
            tracing::debug!(key = %key, "Dropping result of a superseded fetch");
            return;
        }

        slot.in_flight = None;
        slot.entry.is_fetching = false;
        match result {
            Ok(value) => {
                slot.entry.value = Some(value);
                slot.entry.error = None;
                slot.entry.status = QueryStatus::Success;
                slot.entry.fetched_at = Some(Instant::now());
                slot.entry.updated_at = Some(Utc::now());
                slot.invalidated = false;
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "Query failed");
                slot.entry.error = Some(error);
                slot.entry.status = QueryStatus::Error;
            }
        }
        slot.notify();

        if slot.entry.observers == 0 {
            self.schedule_gc(slot);
        }
    }

    fn schedule_gc(&self, slot: &mut Slot) {
        slot.gc_generation += 1;
        let generation = slot.gc_generation;
        let gc_time = slot.gc_time;
        let key = slot.entry.key.clone();
        let store = Arc::downgrade(&self.store);

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key = %key, "No runtime, eviction skipped");
            return;
        };
        runtime.spawn(async move {
            tokio::time::sleep(gc_time).await;
            if let Some(store) = store.upgrade() {
                store.evict_if_idle(&key, generation);
            }
        });
    }
}

/// Live [`QueryClient::subscribe`] registration.
pub struct Subscription {
    client: QueryClient,
    key: QueryKey,
    _guard: DropGuard,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.client.detach(&self.key);
    }
}
