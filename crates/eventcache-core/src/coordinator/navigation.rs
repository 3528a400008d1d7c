use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

use crate::models::EventId;

/// Views the front end can be sent to after a mutation settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Events,
    NewEvent,
    EventDetails(EventId),
    EditEvent(EventId),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Events => f.write_str("/events"),
            Route::NewEvent => f.write_str("/events/new"),
            Route::EventDetails(id) => write!(f, "/events/{}", id),
            Route::EditEvent(id) => write!(f, "/events/{}/edit", id),
        }
    }
}

/// Receives navigation requests from the coordinator.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Forwards routes over a channel to whatever renders views.
#[derive(Debug, Clone)]
pub struct ChannelNavigator {
    tx: mpsc::Sender<Route>,
}

impl ChannelNavigator {
    pub fn new(tx: mpsc::Sender<Route>) -> Self {
        Self { tx }
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        if let Err(e) = self.tx.try_send(route) {
            warn!(error = %e, "Dropped navigation request");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_paths() {
        let id = EventId::new("42");
        assert_eq!(Route::Events.to_string(), "/events");
        assert_eq!(Route::NewEvent.to_string(), "/events/new");
        assert_eq!(Route::EventDetails(id.clone()).to_string(), "/events/42");
        assert_eq!(Route::EditEvent(id).to_string(), "/events/42/edit");
    }

    #[tokio::test]
    async fn test_channel_navigator_forwards_routes() {
        let (tx, mut rx) = mpsc::channel(4);
        let navigator = ChannelNavigator::new(tx);
        navigator.navigate(Route::Events);
        assert_eq!(rx.recv().await, Some(Route::Events));
    }
}
