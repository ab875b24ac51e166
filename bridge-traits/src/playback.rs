//! Audio output bridge.
//!
//! The host owns the actual media element (an HTML audio tag, an AVPlayer,
//! a rodio sink...). The core only needs the narrow surface below: swap the
//! source, start and pause, move the clock, read the clock, and be told when
//! something happens.
//!
//! ## Listener contract
//!
//! Implementations deliver [`DeviceEvent`]s to every registered
//! [`DeviceListener`]. Delivery must not happen while the implementation
//! holds an internal lock that `current_time()` or `duration()` would also
//! need, since listeners are allowed to query the clock. After
//! [`AudioOutput::remove_listener`] returns, the removed listener must not
//! be invoked again.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

/// Notification emitted by an output device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceEvent {
    /// The playback clock advanced. `duration` is `None` until the source
    /// metadata is known (or for live streams).
    Progress { position: f64, duration: Option<f64> },
    /// The source played through to its end.
    Ended,
    /// Playback paused, whoever asked for it (user, core, or the platform
    /// interrupting for a call or a headphone unplug).
    Paused,
}

/// Receiver for device notifications.
pub trait DeviceListener: Send + Sync {
    fn on_event(&self, event: DeviceEvent);
}

/// Registration handle returned by [`AudioOutput::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ListenerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A single audio-output capability.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Replace the current source. Whatever was loading or playing before is
    /// abandoned; a `play()` still pending for the old source may resolve
    /// later and callers are expected to ignore it.
    fn load(&self, url: &str) -> Result<()>;

    /// Start or resume playback. May be refused by platform policy, reported
    /// as [`BridgeError::Rejected`](crate::error::BridgeError::Rejected).
    async fn play(&self) -> Result<()>;

    /// Pause playback, keeping the clock where it is.
    ///
    /// A successful pause must also be reported to listeners as
    /// [`DeviceEvent::Paused`], the same as a pause the platform initiates.
    async fn pause(&self) -> Result<()>;

    /// Move the playback clock. No-op when nothing is loaded.
    fn seek(&self, seconds: f64);

    /// Live decoder clock in seconds.
    fn current_time(&self) -> f64;

    /// Source duration in seconds, once known.
    fn duration(&self) -> Option<f64>;

    /// Register a listener for device notifications.
    fn add_listener(&self, listener: Arc<dyn DeviceListener>) -> ListenerId;

    /// Unregister a listener. Unknown ids are ignored.
    fn remove_listener(&self, id: ListenerId);
}
