use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt, Shared, WeakShared};
use tokio::time::Instant;
use tracing::debug;

use crate::api::ApiError;

use super::{QueryFilter, QueryKey, QueryOptions};

type FetchFuture<V> = BoxFuture<'static, Result<V, ApiError>>;

/// Position of a cache entry in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Absent,
    Loading,
    Fresh,
    Stale,
    Error,
}

/// Read-state of one query as seen by a view.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<V> {
    pub data: Option<V>,
    pub status: QueryStatus,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
}

impl<V> QueryState<V> {
    /// Nothing to show yet and a fetch is under way.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }
}

/// Captured entry contents, used to undo a speculative write.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<V> {
    data: Option<V>,
    updated_at: Option<Instant>,
    invalidated: bool,
}

impl<V> Snapshot<V> {
    pub fn data(&self) -> Option<&V> {
        self.data.as_ref()
    }
}

struct InFlight<V> {
    generation: u64,
    fetch: WeakShared<FetchFuture<V>>,
    abort: AbortHandle,
}

struct Entry<V> {
    data: Option<V>,
    updated_at: Option<Instant>,
    stale_time: Duration,
    invalidated: bool,
    error: Option<ApiError>,
    in_flight: Option<InFlight<V>>,
}

impl<V> Default for Entry<V> {
    fn default() -> Self {
        Self {
            data: None,
            updated_at: None,
            stale_time: Duration::ZERO,
            invalidated: false,
            error: None,
            in_flight: None,
        }
    }
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        match (&self.data, self.updated_at) {
            (Some(_), Some(at)) => !self.invalidated && now.duration_since(at) < self.stale_time,
            _ => false,
        }
    }

    fn status(&self, now: Instant) -> QueryStatus {
        if self.in_flight.is_some() {
            QueryStatus::Loading
        } else if self.error.is_some() {
            QueryStatus::Error
        } else if self.is_fresh(now) {
            QueryStatus::Fresh
        } else if self.data.is_some() {
            QueryStatus::Stale
        } else {
            QueryStatus::Absent
        }
    }

    fn write(&mut self, value: V, now: Instant) {
        self.data = Some(value);
        self.updated_at = Some(now);
        self.invalidated = false;
        self.error = None;
    }
}

struct State<V> {
    entries: HashMap<QueryKey, Entry<V>>,
    next_generation: u64,
}

/// Process-wide cache of query results, keyed by [`QueryKey`].
///
/// Clone is cheap and shares the same underlying store. The internal lock is
/// only ever held for synchronous bookkeeping, never across an `.await`.
pub struct QueryCache<V> {
    state: Arc<Mutex<State<V>>>,
}

impl<V> Clone for QueryCache<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                entries: HashMap::new(),
                next_generation: 0,
            })),
        }
    }
}

impl<V> QueryCache<V> {
    fn lock(&self) -> MutexGuard<'_, State<V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight marker when a fetch is dropped before it settles.
struct InFlightGuard<V> {
    cache: QueryCache<V>,
    key: QueryKey,
    generation: u64,
}

impl<V> Drop for InFlightGuard<V> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        if let Some(entry) = state.entries.get_mut(&self.key) {
            if entry.in_flight.as_ref().map(|f| f.generation) == Some(self.generation) {
                debug!(key = %self.key, "Fetch abandoned, clearing in-flight marker");
                entry.in_flight = None;
            }
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value if fresh, otherwise fetch it.
    ///
    /// Callers arriving while a fetch for `key` is in flight share that fetch.
    /// Dropping the returned future abandons interest; once every caller has
    /// done so the fetch is dropped without writing to the cache.
    pub async fn fetch<F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let shared = {
            let mut state = self.lock();
            let now = Instant::now();
            let entry = state.entries.entry(key.clone()).or_default();
            entry.stale_time = options.stale_time;

            if entry.is_fresh(now) {
                if let Some(data) = &entry.data {
                    debug!(key = %key, "Cache hit");
                    return Ok(data.clone());
                }
            }

            let joined = entry.in_flight.as_ref().and_then(|f| f.fetch.upgrade());
            match joined {
                Some(shared) => {
                    debug!(key = %key, "Joining in-flight fetch");
                    shared
                }
                None => {
                    debug!(key = %key, "Cache miss, fetching");
                    self.start_fetch(&mut state, key, options, fetcher)
                }
            }
        };

        shared.await
    }

    /// Start a new fetch for `key` even if one is in flight or the entry is
    /// fresh. The previous fetch is superseded: its result is discarded.
    pub async fn refetch<F, Fut>(
        &self,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Result<V, ApiError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let shared = {
            let mut state = self.lock();
            let entry = state.entries.entry(key.clone()).or_default();
            entry.stale_time = options.stale_time;
            debug!(key = %key, "Forced refetch");
            self.start_fetch(&mut state, key, options, fetcher)
        };

        shared.await
    }

    /// Like [`fetch`](Self::fetch), but only warms the cache. Errors are logged.
    pub async fn prefetch<F, Fut>(&self, key: QueryKey, options: &QueryOptions, fetcher: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let label = key.to_string();
        if let Err(err) = self.fetch(key, options, fetcher).await {
            debug!(key = %label, error = %err, "Prefetch failed");
        }
    }

    fn start_fetch<F, Fut>(
        &self,
        state: &mut State<V>,
        key: QueryKey,
        options: &QueryOptions,
        fetcher: F,
    ) -> Shared<FetchFuture<V>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        state.next_generation += 1;
        let generation = state.next_generation;

        let (abort, registration) = AbortHandle::new_pair();
        let guard = InFlightGuard {
            cache: self.clone(),
            key: key.clone(),
            generation,
        };
        let retry = options.retry.clone();
        let work = async move {
            let result = retry.run(&guard.key, &fetcher).await;
            guard.cache.settle(&guard.key, generation, &result);
            result
        };

        let fetch: FetchFuture<V> = Abortable::new(work, registration)
            .map(|outcome| outcome.unwrap_or(Err(ApiError::Cancelled)))
            .boxed();
        let shared = fetch.shared();

        if let Some(entry) = state.entries.get_mut(&key) {
            entry.in_flight = shared.downgrade().map(|weak| InFlight {
                generation,
                fetch: weak,
                abort,
            });
        }

        shared
    }

    /// Apply a fetch outcome if `generation` is still the key's current fetch.
    fn settle(&self, key: &QueryKey, generation: u64, result: &Result<V, ApiError>) {
        let mut state = self.lock();
        let Some(entry) = state.entries.get_mut(key) else {
            debug!(key = %key, "Entry removed while fetching, discarding result");
            return;
        };
        if entry.in_flight.as_ref().map(|f| f.generation) != Some(generation) {
            debug!(key = %key, generation, "Discarding superseded fetch result");
            return;
        }

        entry.in_flight = None;
        match result {
            Ok(value) => entry.write(value.clone(), Instant::now()),
            Err(err) => entry.error = Some(err.clone()),
        }
    }

    pub fn get_data(&self, key: &QueryKey) -> Option<V> {
        self.lock().entries.get(key).and_then(|e| e.data.clone())
    }

    /// Write `value` as fresh for `options.stale_time`. Any in-flight fetch
    /// for the key is superseded.
    pub fn set_data(&self, key: QueryKey, value: V, options: &QueryOptions) {
        let mut state = self.lock();
        let entry = state.entries.entry(key).or_default();
        entry.stale_time = options.stale_time;
        entry.in_flight = None;
        entry.write(value, Instant::now());
    }

    pub fn snapshot(&self, key: &QueryKey) -> Snapshot<V> {
        match self.lock().entries.get(key) {
            Some(entry) => Snapshot {
                data: entry.data.clone(),
                updated_at: entry.updated_at,
                invalidated: entry.invalidated,
            },
            None => Snapshot {
                data: None,
                updated_at: None,
                invalidated: false,
            },
        }
    }

    /// Put back a snapshot taken earlier. An empty snapshot removes the entry.
    pub fn restore(&self, key: QueryKey, snapshot: Snapshot<V>) {
        let mut state = self.lock();
        if snapshot.data.is_none() {
            state.entries.remove(&key);
            return;
        }
        let entry = state.entries.entry(key).or_default();
        entry.in_flight = None;
        entry.error = None;
        entry.data = snapshot.data;
        entry.updated_at = snapshot.updated_at;
        entry.invalidated = snapshot.invalidated;
    }

    /// Mark matching entries stale without refetching. Fetches already in
    /// flight for them are superseded so pre-invalidation data cannot land.
    pub fn invalidate(&self, filter: &QueryFilter) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        for (key, entry) in state.entries.iter_mut().filter(|(k, _)| filter.matches(k)) {
            debug!(key = %key, "Invalidating");
            entry.invalidated = true;
            entry.in_flight = None;
            count += 1;
        }
        count
    }

    /// Abort in-flight fetches for matching entries. Their waiters receive
    /// [`ApiError::Cancelled`] and nothing is written.
    pub fn cancel(&self, filter: &QueryFilter) -> usize {
        let mut state = self.lock();
        let mut count = 0;
        for (key, entry) in state.entries.iter_mut().filter(|(k, _)| filter.matches(k)) {
            if let Some(in_flight) = entry.in_flight.take() {
                debug!(key = %key, "Cancelling in-flight fetch");
                in_flight.abort.abort();
                count += 1;
            }
        }
        count
    }

    pub fn remove(&self, filter: &QueryFilter) -> usize {
        let mut state = self.lock();
        let before = state.entries.len();
        state.entries.retain(|k, _| !filter.matches(k));
        before - state.entries.len()
    }

    /// Drop every entry and abort every in-flight fetch.
    pub fn clear(&self) {
        let mut state = self.lock();
        for entry in state.entries.values() {
            if let Some(in_flight) = &entry.in_flight {
                in_flight.abort.abort();
            }
        }
        state.entries.clear();
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.lock()
            .entries
            .get(key)
            .is_some_and(|e| e.in_flight.is_some())
    }

    pub fn status(&self, key: &QueryKey) -> QueryStatus {
        self.lock()
            .entries
            .get(key)
            .map_or(QueryStatus::Absent, |e| e.status(Instant::now()))
    }

    pub fn state(&self, key: &QueryKey) -> QueryState<V> {
        let state = self.lock();
        match state.entries.get(key) {
            Some(entry) => QueryState {
                data: entry.data.clone(),
                status: entry.status(Instant::now()),
                error: entry.error.clone(),
                is_fetching: entry.in_flight.is_some(),
            },
            None => QueryState {
                data: None,
                status: QueryStatus::Absent,
                error: None,
                is_fetching: false,
            },
        }
    }

    /// Keys currently held, collection keys first.
    pub fn keys(&self) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self.lock().entries.keys().cloned().collect();
        keys.sort_by_key(|k| (!k.is_collection(), k.resource().to_string(), k.id().map(str::to_string)));
        keys
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
