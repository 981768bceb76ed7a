//! Provider notifications.
//!
//! Events fan out over a `tokio::sync::broadcast` channel. Sending never
//! blocks the engine; a slow subscriber lags and sees `RecvError::Lagged`.

use tokio::sync::broadcast;

use crate::jobs::Activity;

/// Default broadcast buffer per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// What a provider tells its consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// A tile finished loading and its features are queryable.
    LoadedData { tile_id: String },
    /// The provider went from no outstanding work to some.
    Busy,
    /// The last outstanding job ended.
    Idle,
}

impl From<Activity> for ProviderEvent {
    fn from(activity: Activity) -> Self {
        match activity {
            Activity::Busy => ProviderEvent::Busy,
            Activity::Idle => ProviderEvent::Idle,
        }
    }
}

/// Sending half of the provider event channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ProviderEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn emit(&self, event: ProviderEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers");
        }
    }

    /// Publish a busy/idle transition if there is one.
    pub fn emit_activity(&self, activity: Option<Activity>) {
        if let Some(activity) = activity {
            self.emit(activity.into());
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
