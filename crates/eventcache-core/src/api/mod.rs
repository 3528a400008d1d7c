//! Remote store access for the events backend.
//!
//! `RemoteStore` is the seam between the coordinator and the network: the
//! coordinator only ever talks to the trait, `ApiClient` implements it over
//! HTTP, and tests substitute an in-memory store.

pub mod client;
pub mod error;

use async_trait::async_trait;

pub use client::ApiClient;
pub use error::ApiError;

use crate::models::{Event, EventFields, EventId};

/// The remote source of truth for events.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list(&self) -> Result<Vec<Event>, ApiError>;

    async fn get_one(&self, id: &EventId) -> Result<Event, ApiError>;

    /// Persist a new event. The store assigns the id.
    async fn create(&self, fields: &EventFields) -> Result<Event, ApiError>;

    /// Replace every field of an existing event.
    async fn update(&self, id: &EventId, fields: &EventFields) -> Result<Event, ApiError>;

    async fn delete(&self, id: &EventId) -> Result<(), ApiError>;
}
