//! eventcache core: a client-side cache coordinator for an events REST API.
//!
//! - [`api`]: the `RemoteStore` trait and its HTTP implementation
//! - [`cache`]: the keyed query cache with in-flight de-duplication
//! - [`coordinator`]: create/read/update/delete choreography over the cache
//! - [`notice`]: error notices for display
//! - [`config`]: on-disk configuration

pub mod api;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod models;
pub mod notice;
pub mod utils;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ApiError, RemoteStore};
pub use cache::{QueryCache, QueryKey, QueryOptions, QueryState, QueryStatus};
pub use config::Config;
pub use coordinator::{
    ChannelNavigator, DeleteConfirmation, EventCoordinator, EventView, MutationKind, Navigator,
    QueryData, Route, UpdateStrategy,
};
pub use models::{Event, EventFields, EventId, EventPatch};
pub use notice::ErrorNotice;
