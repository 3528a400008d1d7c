//! In-memory query cache.
//!
//! `QueryCache` stores the last-known value for each `QueryKey` together with
//! its freshness timestamp and the marker of the fetch currently in flight.
//! Reads go through [`QueryCache::fetch`], which serves fresh entries directly,
//! joins an in-flight fetch when one exists, and otherwise starts a new one.
//!
//! Consistency rules:
//! - at most one in-flight fetch per key; concurrent readers share it
//! - a fetch only writes if it is still the key's current fetch, so a
//!   superseded, cancelled or removed fetch never overwrites newer data
//! - a failed fetch leaves the previous value untouched

pub mod key;
pub mod options;
pub mod query;

pub use key::{QueryFilter, QueryKey};
pub use options::{QueryOptions, RetryPolicy};
pub use query::{QueryCache, QueryState, QueryStatus, Snapshot};
