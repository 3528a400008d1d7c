use tracing::debug;

use crate::api::{ApiError, RemoteStore};
use crate::models::EventId;

use super::EventCoordinator;

/// A delete the user has asked for but not yet confirmed.
///
/// `confirm` issues the request. A failure is kept on the confirmation so it
/// can be shown next to the control, and `confirm` may be called again.
pub struct DeleteConfirmation<'a, S> {
    coordinator: &'a EventCoordinator<S>,
    id: EventId,
    error: Option<ApiError>,
}

impl<'a, S: RemoteStore> DeleteConfirmation<'a, S> {
    pub(super) fn new(coordinator: &'a EventCoordinator<S>, id: EventId) -> Self {
        debug!(id = %id, "Delete requested, awaiting confirmation");
        Self {
            coordinator,
            id,
            error: None,
        }
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    /// Error from the last failed attempt, if any.
    pub fn error(&self) -> Option<&ApiError> {
        self.error.as_ref()
    }

    pub async fn confirm(&mut self) -> Result<(), ApiError> {
        self.error = None;
        let result = self.coordinator.delete_event(&self.id).await;
        if let Err(err) = &result {
            self.error = Some(err.clone());
        }
        result
    }

    pub fn cancel(self) {
        debug!(id = %self.id, "Delete cancelled");
    }
}
