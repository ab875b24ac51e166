//! Stops playback when the auth session ends.

use crate::coordinator::SessionCoordinator;
use core_auth::CredentialProvider;
use core_runtime::events::{CoreEvent, EventBus, EventStream, RecvError};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Background listener that calls [`SessionCoordinator::stop_track`] on
/// every `SignedOut`. Dropping the binder stops listening.
pub struct SessionLifecycleBinder {
    task: JoinHandle<()>,
}

impl SessionLifecycleBinder {
    /// Subscribe to `event_bus` and start listening.
    ///
    /// The subscription is taken before this returns, so a sign-out emitted
    /// right after is not missed. If the listener falls behind the bus,
    /// `credentials` decides: no credential means the session ended while
    /// events were being skipped.
    pub fn spawn(
        coordinator: SessionCoordinator,
        event_bus: &EventBus,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let mut events = EventStream::new(event_bus.subscribe()).filter(CoreEvent::is_session_end);

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) => {
                        info!("Auth session ended, stopping playback");
                        coordinator.stop_track().await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Lifecycle listener lagged behind the event bus");
                        if credentials.bearer_token().is_none() {
                            coordinator.stop_track().await;
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("Event bus closed, lifecycle listener exiting");
                        break;
                    }
                }
            }
        });

        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for SessionLifecycleBinder {
    fn drop(&mut self) {
        self.task.abort();
    }
}
