//! Data models for the events resource.
//!
//! - `Event`: a stored event as returned by the remote store
//! - `EventFields`: the user-editable fields submitted on create
//! - `EventPatch`: a partial field set submitted on update
//! - `EventId`: the opaque, server-assigned identifier

pub mod event;

pub use event::{Event, EventFields, EventId, EventPatch};
