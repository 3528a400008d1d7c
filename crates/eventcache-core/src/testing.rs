//! In-memory stand-ins for the remote store and the router, used by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::api::{ApiError, RemoteStore};
use crate::coordinator::{Navigator, Route};
use crate::models::{Event, EventFields, EventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    GetOne,
    Create,
    Update,
    Delete,
}

/// Remote store backed by a map, with scripted failures and a gate for
/// holding list requests open.
#[derive(Default)]
pub struct MemoryStore {
    events: Mutex<BTreeMap<EventId, Event>>,
    next_id: AtomicU64,
    failures: Mutex<HashMap<StoreOp, ApiError>>,
    calls: Mutex<HashMap<StoreOp, usize>>,
    list_gate: Mutex<Option<Arc<Notify>>>,
    update_gate: Mutex<Option<Arc<Notify>>>,
    updates: Mutex<Vec<EventFields>>,
}

impl MemoryStore {
    pub fn with_events(events: Vec<Event>) -> Self {
        let store = Self {
            next_id: AtomicU64::new(100),
            ..Self::default()
        };
        {
            let mut map = store.events.lock().unwrap();
            for event in events {
                map.insert(event.id.clone(), event);
            }
        }
        store
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: StoreOp, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn calls(&self, op: StoreOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    /// List requests wait on the returned gate until it is notified.
    pub fn hold_list(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.list_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Update requests wait on the returned gate until it is notified.
    pub fn hold_update(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.update_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Field sets received by `update`, oldest first.
    pub fn updates(&self) -> Vec<EventFields> {
        self.updates.lock().unwrap().clone()
    }

    pub fn stored(&self, id: &EventId) -> Option<Event> {
        self.events.lock().unwrap().get(id).cloned()
    }

    fn record(&self, op: StoreOp) -> Result<(), ApiError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found(id: &EventId) -> ApiError {
        ApiError::NotFound(format!("Could not find event for id {}", id))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Event>, ApiError> {
        self.record(StoreOp::List)?;
        let gate = self.list_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.events.lock().unwrap().values().cloned().collect())
    }

    async fn get_one(&self, id: &EventId) -> Result<Event, ApiError> {
        self.record(StoreOp::GetOne)?;
        self.stored(id).ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, fields: &EventFields) -> Result<Event, ApiError> {
        self.record(StoreOp::Create)?;
        if fields.title.trim().is_empty() {
            return Err(ApiError::Validation {
                message: Some("Invalid data provided.".to_string()),
                field_errors: BTreeMap::from([("title".to_string(), "Invalid title.".to_string())]),
            });
        }
        let id = EventId::new(format!("e{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let event = Event::from_fields(id.clone(), fields.clone());
        self.events.lock().unwrap().insert(id, event.clone());
        Ok(event)
    }

    async fn update(&self, id: &EventId, fields: &EventFields) -> Result<Event, ApiError> {
        self.record(StoreOp::Update)?;
        let gate = self.update_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.updates.lock().unwrap().push(fields.clone());
        let mut events = self.events.lock().unwrap();
        if !events.contains_key(id) {
            return Err(Self::not_found(id));
        }
        let updated = Event::from_fields(id.clone(), fields.clone());
        events.insert(id.clone(), updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: &EventId) -> Result<(), ApiError> {
        self.record(StoreOp::Delete)?;
        self.events
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(id))
    }
}

/// Navigator that remembers every route it was sent to.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

pub fn event(id: &str, title: &str) -> Event {
    Event {
        id: EventId::new(id),
        title: title.to_string(),
        description: format!("About {}", title),
        date: "2025-06-01".to_string(),
        time: "18:00".to_string(),
        location: "Main Hall".to_string(),
        image: "images/event.jpg".to_string(),
    }
}
