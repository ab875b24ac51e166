//! # Event Bus System
//!
//! Decoupled, typed notifications between core modules over
//! `tokio::sync::broadcast`.
//!
//! ## Overview
//!
//! - **Event types**: [`CoreEvent`] wraps one enum per domain
//!   ([`AuthEvent`], [`PlaybackEvent`])
//! - **[`EventBus`]**: cloneable publisher, every `subscribe()` is an
//!   independent receiver
//! - **[`EventStream`]**: receiver wrapper with predicate filtering
//!
//! ```text
//! ┌─────────────┐   SignedOut    ┌──────────┐   subscribe   ┌──────────────────┐
//! │ AuthSession ├───────────────>│          ├──────────────>│ Lifecycle binder │
//! └─────────────┘                │ EventBus │               └──────────────────┘
//! ┌─────────────┐  Started/...   │          │   subscribe   ┌──────────────────┐
//! │ Coordinator ├───────────────>│          ├──────────────>│ UI / telemetry   │
//! └─────────────┘                └──────────┘               └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.emit(CoreEvent::Auth(AuthEvent::SignedOut { user_id: Some("7".into()) })).ok();
//! assert!(matches!(rx.recv().await, Ok(CoreEvent::Auth(AuthEvent::SignedOut { .. }))));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell `n` events behind. Non-fatal.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; emitters in this workspace
//! ignore that result.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Playback session events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns `true` for the signal that the authenticated session ended.
    pub fn is_session_end(&self) -> bool {
        matches!(self, CoreEvent::Auth(AuthEvent::SignedOut { .. }))
    }
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to the authenticated user session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A credential was accepted and the user is signed in.
    SignedIn {
        /// Identifier of the signed-in user.
        user_id: String,
    },
    /// The session ended and the credential was cleared.
    SignedOut {
        /// Identifier of the user that signed out, when known.
        user_id: Option<String>,
    },
    /// A credential was rejected.
    AuthError {
        /// Human-readable error message.
        message: String,
    },
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session coordinator.
///
/// `subject` is the persistence key rendered as `"<kind>:<id>"`, for
/// example `"track:12"` or `"podcast:3"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Playback started for a newly loaded subject.
    Started {
        subject: String,
        title: String,
    },
    /// Playback paused.
    Paused {
        subject: String,
        position_secs: f64,
    },
    /// Playback resumed after a pause or after reaching the end.
    Resumed {
        subject: String,
        position_secs: f64,
    },
    /// The session was stopped and reset.
    Stopped {
        subject: String,
    },
    /// The source played through to its end.
    Completed {
        subject: String,
    },
    /// The playback clock moved (progress or seek).
    PositionChanged {
        subject: String,
        position_secs: f64,
        duration_secs: f64,
    },
    /// A position save was handed to the persistence client.
    PositionSaved {
        subject: String,
        position_secs: f64,
    },
    /// A device call failed.
    Error {
        subject: Option<String>,
        message: String,
    },
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Clones share the same channel. Slow subscribers receive
/// `RecvError::Lagged` instead of blocking fast ones.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers reached, or an error when nobody is
    /// listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional predicate filtering.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let session_end = EventStream::new(bus.subscribe()).filter(CoreEvent::is_session_end);
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` if the subscriber fell behind by `n` events,
    /// `RecvError::Closed` once all senders are dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). Returns `None` when no
    /// matching event is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.accepts(&event) => return Some(Ok(event)),
                Ok(_) => continue,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_out() -> CoreEvent {
        CoreEvent::Auth(AuthEvent::SignedOut {
            user_id: Some("user-1".to_string()),
        })
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus.emit(signed_out()).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Playback(PlaybackEvent::Started {
            subject: "track:1".to_string(),
            title: "Sample Track".to_string(),
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).filter(CoreEvent::is_session_end);

        bus.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
            subject: "track:1".to_string(),
            position_secs: 3.0,
            duration_secs: 200.0,
        }))
        .ok();
        bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            user_id: "user-1".to_string(),
        }))
        .ok();
        bus.emit(signed_out()).ok();

        assert_eq!(stream.recv().await.unwrap(), signed_out());
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(CoreEvent::Playback(PlaybackEvent::PositionChanged {
                subject: "track:1".to_string(),
                position_secs: i as f64,
                duration_secs: 10.0,
            }))
            .ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_session_end_detection() {
        let saved = CoreEvent::Playback(PlaybackEvent::PositionSaved {
            subject: "track:1".to_string(),
            position_secs: 0.0,
        });
        assert!(!saved.is_session_end());
        assert!(signed_out().is_session_end());
    }

    #[test]
    fn test_event_serialization() {
        let event = CoreEvent::Playback(PlaybackEvent::Paused {
            subject: "track:9".to_string(),
            position_secs: 42.5,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Playback\""));
        assert!(json.contains("track:9"));

        let decoded: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, event);
    }
}
