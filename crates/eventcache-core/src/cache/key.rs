use std::fmt;

use crate::models::EventId;

/// Resource name of the events collection.
pub const EVENTS: &str = "events";

/// Composite cache key: a resource kind plus an optional item id.
///
/// `("events")` names the collection, `("events", id)` a single item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: String,
    id: Option<String>,
}

impl QueryKey {
    pub fn collection(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: None,
        }
    }

    pub fn item(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    pub fn events() -> Self {
        Self::collection(EVENTS)
    }

    pub fn event(id: &EventId) -> Self {
        Self::item(EVENTS, id.as_str())
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is_collection(&self) -> bool {
        self.id.is_none()
    }

    /// True if `prefix` names this key or the collection containing it.
    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.resource == prefix.resource && (prefix.id.is_none() || self.id == prefix.id)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}/{}", self.resource, id),
            None => f.write_str(&self.resource),
        }
    }
}

/// Selects cache entries for invalidate / remove / cancel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFilter {
    key: QueryKey,
    exact: bool,
}

impl QueryFilter {
    /// Matches only `key` itself.
    pub fn exact(key: QueryKey) -> Self {
        Self { key, exact: true }
    }

    /// Matches `key` and, for a collection key, every item under it.
    pub fn prefix(key: QueryKey) -> Self {
        Self { key, exact: false }
    }

    pub fn matches(&self, key: &QueryKey) -> bool {
        if self.exact {
            key == &self.key
        } else {
            key.starts_with(&self.key)
        }
    }
}

impl From<QueryKey> for QueryFilter {
    fn from(key: QueryKey) -> Self {
        Self::prefix(key)
    }
}
