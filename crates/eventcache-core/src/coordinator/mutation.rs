use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use crate::api::ApiError;
use crate::cache::QueryFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(ApiError),
}

/// One user-initiated mutation and the cache entries it invalidates on success.
#[derive(Debug, Clone)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub invalidates: Vec<QueryFilter>,
    pub status: MutationStatus,
}

impl MutationRecord {
    pub fn new(kind: MutationKind, invalidates: Vec<QueryFilter>) -> Self {
        Self {
            kind,
            invalidates,
            status: MutationStatus::Pending,
        }
    }
}

/// Mutation-state as seen by a view.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MutationState {
    pub is_pending: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
}

impl From<&MutationStatus> for MutationState {
    fn from(status: &MutationStatus) -> Self {
        match status {
            MutationStatus::Pending => Self {
                is_pending: true,
                ..Self::default()
            },
            MutationStatus::Error(err) => Self {
                is_pending: false,
                is_error: true,
                error: Some(err.clone()),
            },
            MutationStatus::Idle | MutationStatus::Success => Self::default(),
        }
    }
}

/// Latest mutation record per kind. Records are not persisted.
#[derive(Debug, Default)]
pub struct MutationTracker {
    records: Mutex<HashMap<MutationKind, MutationRecord>>,
}

impl MutationTracker {
    pub fn begin(&self, record: MutationRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(record.kind, record);
    }

    pub fn finish<T>(&self, kind: MutationKind, result: &Result<T, ApiError>) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(record) = records.get_mut(&kind) {
            record.status = match result {
                Ok(_) => MutationStatus::Success,
                Err(err) => MutationStatus::Error(err.clone()),
            };
        }
    }

    pub fn state(&self, kind: MutationKind) -> MutationState {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records
            .get(&kind)
            .map(|r| MutationState::from(&r.status))
            .unwrap_or_default()
    }

    /// Forget a finished record, e.g. when its form is closed.
    pub fn reset(&self, kind: MutationKind) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.remove(&kind);
    }
}
