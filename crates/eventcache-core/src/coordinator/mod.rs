//! Cache coordination for the events resource.
//!
//! `EventCoordinator` is the single entry point views use to read and mutate
//! events. Reads go through the shared [`QueryCache`]; mutations call the
//! remote store and then post-process the result: invalidate the affected
//! cache entries and hand a [`Route`] to the [`Navigator`].
//!
//! Updates follow one of two strategies (see [`UpdateStrategy`]). Deletes
//! require an explicit confirmation step via [`EventCoordinator::request_delete`].

pub mod delete;
pub mod mutation;
pub mod navigation;


use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::api::{ApiError, RemoteStore};
use crate::cache::{QueryCache, QueryFilter, QueryKey, QueryOptions, QueryState};
use crate::models::{Event, EventFields, EventId, EventPatch};

pub use delete::DeleteConfirmation;
pub use mutation::{MutationKind, MutationRecord, MutationState, MutationStatus, MutationTracker};
pub use navigation::{ChannelNavigator, Navigator, Route};

/// Collection stays fresh for a minute while browsing.
const LIST_STALE_SECS: u64 = 60;

/// Detail view: same as the collection.
const DETAIL_STALE_SECS: u64 = 60;

/// An event about to be edited is refetched after a few seconds.
const EDIT_STALE_SECS: u64 = 5;

/// Values held by the events cache.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryData {
    Events(Vec<Event>),
    Event(Event),
}

impl QueryData {
    fn into_events(self) -> Result<Vec<Event>, ApiError> {
        match self {
            QueryData::Events(events) => Ok(events),
            QueryData::Event(_) => Err(ApiError::InvalidResponse(
                "cached value is a single event, expected a list".to_string(),
            )),
        }
    }

    fn into_event(self) -> Result<Event, ApiError> {
        match self {
            QueryData::Event(event) => Ok(event),
            QueryData::Events(_) => Err(ApiError::InvalidResponse(
                "cached value is a list, expected a single event".to_string(),
            )),
        }
    }
}

/// How updates reach the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStrategy {
    /// Wait for the store, then invalidate.
    #[default]
    Pessimistic,
    /// Write the proposed value first, roll back if the store rejects it.
    Optimistic,
}

/// Which view an item is being read for. Each has its own freshness threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventView {
    Details,
    Edit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub list: QueryOptions,
    pub detail: QueryOptions,
    pub edit: QueryOptions,
    pub update_strategy: UpdateStrategy,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            list: QueryOptions::new(Duration::from_secs(LIST_STALE_SECS)),
            detail: QueryOptions::new(Duration::from_secs(DETAIL_STALE_SECS)),
            edit: QueryOptions::new(Duration::from_secs(EDIT_STALE_SECS)),
            update_strategy: UpdateStrategy::default(),
        }
    }
}

/// Keeps the client-side events cache consistent with the remote store.
pub struct EventCoordinator<S> {
    store: Arc<S>,
    cache: QueryCache<QueryData>,
    navigator: Arc<dyn Navigator>,
    options: CoordinatorOptions,
    mutations: MutationTracker,
}

impl<S: RemoteStore> EventCoordinator<S> {
    pub fn new(store: S, cache: QueryCache<QueryData>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            store: Arc::new(store),
            cache,
            navigator,
            options: CoordinatorOptions::default(),
            mutations: MutationTracker::default(),
        }
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn cache(&self) -> &QueryCache<QueryData> {
        &self.cache
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Drop every cached entry. Call on logout or shutdown.
    pub fn teardown(&self) {
        debug!(entries = self.cache.len(), "Clearing events cache");
        self.cache.clear();
    }

    fn view_options(&self, view: EventView) -> &QueryOptions {
        match view {
            EventView::Details => &self.options.detail,
            EventView::Edit => &self.options.edit,
        }
    }

    fn list_fetcher(
        &self,
    ) -> impl Fn() -> BoxFuture<'static, Result<QueryData, ApiError>> + Send + Sync + 'static
    {
        let store = Arc::clone(&self.store);
        move || {
            let store = Arc::clone(&store);
            async move { store.list().await.map(QueryData::Events) }.boxed()
        }
    }

    fn item_fetcher(
        &self,
        id: &EventId,
    ) -> impl Fn() -> BoxFuture<'static, Result<QueryData, ApiError>> + Send + Sync + 'static
    {
        let store = Arc::clone(&self.store);
        let id = id.clone();
        move || {
            let store = Arc::clone(&store);
            let id = id.clone();
            async move { store.get_one(&id).await.map(QueryData::Event) }.boxed()
        }
    }

    // ===== Reads =====

    pub async fn events(&self) -> Result<Vec<Event>, ApiError> {
        self.cache
            .fetch(QueryKey::events(), &self.options.list, self.list_fetcher())
            .await?
            .into_events()
    }

    /// Re-read the collection now, regardless of freshness.
    pub async fn refresh_events(&self) -> Result<Vec<Event>, ApiError> {
        self.cache
            .refetch(QueryKey::events(), &self.options.list, self.list_fetcher())
            .await?
            .into_events()
    }

    pub async fn event(&self, id: &EventId, view: EventView) -> Result<Event, ApiError> {
        self.cache
            .fetch(QueryKey::event(id), self.view_options(view), self.item_fetcher(id))
            .await?
            .into_event()
    }

    pub async fn event_details(&self, id: &EventId) -> Result<Event, ApiError> {
        self.event(id, EventView::Details).await
    }

    pub async fn event_for_edit(&self, id: &EventId) -> Result<Event, ApiError> {
        self.event(id, EventView::Edit).await
    }

    /// Warm the cache before a detail or edit view mounts.
    pub async fn prefetch_event(&self, id: &EventId, view: EventView) {
        self.cache
            .prefetch(QueryKey::event(id), self.view_options(view), self.item_fetcher(id))
            .await;
    }

    pub fn events_state(&self) -> QueryState<Vec<Event>> {
        let state = self.cache.state(&QueryKey::events());
        QueryState {
            data: state.data.and_then(|d| d.into_events().ok()),
            status: state.status,
            error: state.error,
            is_fetching: state.is_fetching,
        }
    }

    pub fn event_state(&self, id: &EventId) -> QueryState<Event> {
        let state = self.cache.state(&QueryKey::event(id));
        QueryState {
            data: state.data.and_then(|d| d.into_event().ok()),
            status: state.status,
            error: state.error,
            is_fetching: state.is_fetching,
        }
    }

    pub fn mutation_state(&self, kind: MutationKind) -> MutationState {
        self.mutations.state(kind)
    }

    pub fn reset_mutation(&self, kind: MutationKind) {
        self.mutations.reset(kind);
    }

    // ===== Mutations =====

    fn invalidate_all(&self, filters: &[QueryFilter]) {
        for filter in filters {
            self.cache.invalidate(filter);
        }
    }

    /// Create an event. On success the collection is invalidated and the
    /// front end is sent to the list. On failure nothing changes.
    pub async fn create_event(&self, fields: EventFields) -> Result<Event, ApiError> {
        let record = MutationRecord::new(
            MutationKind::Create,
            vec![QueryFilter::exact(QueryKey::events())],
        );
        let invalidates = record.invalidates.clone();
        self.mutations.begin(record);

        let result = self.store.create(&fields).await;
        self.mutations.finish(MutationKind::Create, &result);
        let event = result?;

        info!(id = %event.id, title = %event.title, "Event created");
        self.invalidate_all(&invalidates);
        self.navigator.navigate(Route::Events);
        Ok(event)
    }

    /// Update with the configured strategy.
    pub async fn update_event(&self, id: &EventId, patch: EventPatch) -> Result<Event, ApiError> {
        match self.options.update_strategy {
            UpdateStrategy::Pessimistic => self.update_event_pessimistic(id, patch).await,
            UpdateStrategy::Optimistic => self.update_event_optimistic(id, patch).await,
        }
    }

    /// Submit, wait for the store, then invalidate the item and the list.
    pub async fn update_event_pessimistic(
        &self,
        id: &EventId,
        patch: EventPatch,
    ) -> Result<Event, ApiError> {
        let record = MutationRecord::new(
            MutationKind::Update,
            vec![
                QueryFilter::exact(QueryKey::event(id)),
                QueryFilter::exact(QueryKey::events()),
            ],
        );
        let invalidates = record.invalidates.clone();
        self.mutations.begin(record);

        let result = match self.event_for_edit(id).await {
            Ok(current) => self.submit_update(id, &current.patched(&patch)).await,
            Err(err) => Err(err),
        };
        self.mutations.finish(MutationKind::Update, &result);
        let event = result?;

        info!(id = %id, "Event updated");
        self.invalidate_all(&invalidates);
        self.navigator.navigate(Route::EventDetails(id.clone()));
        Ok(event)
    }

    /// Snapshot, write the patched value, navigate, then commit or roll back.
    pub async fn update_event_optimistic(
        &self,
        id: &EventId,
        patch: EventPatch,
    ) -> Result<Event, ApiError> {
        let record = MutationRecord::new(
            MutationKind::Update,
            vec![QueryFilter::exact(QueryKey::events())],
        );
        let invalidates = record.invalidates.clone();
        self.mutations.begin(record);

        let result = self.apply_optimistic(id, &patch).await;
        self.mutations.finish(MutationKind::Update, &result);
        let event = result?;

        info!(id = %id, "Event updated");
        self.invalidate_all(&invalidates);
        Ok(event)
    }

    async fn apply_optimistic(&self, id: &EventId, patch: &EventPatch) -> Result<Event, ApiError> {
        let key = QueryKey::event(id);
        let current = self.event_for_edit(id).await?;

        // An in-flight read would otherwise overwrite the speculative value.
        self.cache.cancel(&QueryFilter::exact(key.clone()));
        let snapshot = self.cache.snapshot(&key);
        let speculative = current.patched(patch);
        self.cache.set_data(
            key.clone(),
            QueryData::Event(speculative.clone()),
            &self.options.detail,
        );
        self.navigator.navigate(Route::EventDetails(id.clone()));

        match self.submit_update(id, &speculative).await {
            Ok(event) => {
                self.cache
                    .set_data(key, QueryData::Event(event.clone()), &self.options.detail);
                Ok(event)
            }
            Err(err) => {
                warn!(id = %id, error = %err, "Update rejected, restoring cached event");
                self.cache.restore(key, snapshot);
                Err(err)
            }
        }
    }

    /// The store replaces the whole record, so every field is sent.
    async fn submit_update(&self, id: &EventId, edited: &Event) -> Result<Event, ApiError> {
        self.store
            .update(id, &edited.fields())
            .await
            .and_then(|event| ensure_same_id(id, event))
    }

    /// First step of a delete. Nothing is sent until the returned
    /// confirmation is confirmed.
    pub fn request_delete(&self, id: EventId) -> DeleteConfirmation<'_, S> {
        DeleteConfirmation::new(self, id)
    }

    async fn delete_event(&self, id: &EventId) -> Result<(), ApiError> {
        let record = MutationRecord::new(
            MutationKind::Delete,
            vec![QueryFilter::exact(QueryKey::events())],
        );
        let invalidates = record.invalidates.clone();
        self.mutations.begin(record);

        let result = self.store.delete(id).await;
        self.mutations.finish(MutationKind::Delete, &result);
        result?;

        info!(id = %id, "Event deleted");
        // Never serve the deleted item again. The list is only marked stale.
        self.cache.remove(&QueryFilter::exact(QueryKey::event(id)));
        self.invalidate_all(&invalidates);
        self.navigator.navigate(Route::Events);
        Ok(())
    }
}

fn ensure_same_id(requested: &EventId, event: Event) -> Result<Event, ApiError> {
    if &event.id == requested {
        Ok(event)
    } else {
        Err(ApiError::InvalidResponse(format!(
            "update of event {} returned event {}",
            requested, event.id
        )))
    }
}
