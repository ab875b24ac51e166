//! # Session Coordinator
//!
//! Owns the single active playback session: which track is loaded, what the
//! device is doing with it, and when its position gets persisted.
//!
//! ## State machine
//!
//! ```text
//!            play_track             play ok
//!   Idle ───────────────> Loading ──────────> Playing <──┐
//!    ^                       │                  │  ^     │ toggle
//!    │ stop_track            │ ended            │  └─────┤
//!    │                       v                  v        │
//!    └────────────────── Ended <──────────── Paused ─────┘
//! ```
//!
//! Any non-idle state returns to `Idle` through [`SessionCoordinator::stop_track`].
//!
//! ## Persistence points
//!
//! | Transition                 | Save                        |
//! |----------------------------|-----------------------------|
//! | switch to another subject  | outgoing subject at its clock, before the new load |
//! | toggle from `Playing`      | current subject at its clock |
//! | device `paused` (external) | current subject at its clock, when past 0 |
//! | device `ended`             | current subject at 0        |
//! | `stop_track`               | current subject at 0        |
//!
//! ## Concurrency
//!
//! Every load bumps a generation counter. Results of async work started for
//! an earlier generation (resume lookups, pending `play()` calls, queued
//! device notifications) are dropped on arrival. The session lock is never
//! held across an `.await`.

use crate::config::SessionConfig;
use crate::device::{DeviceAdapter, DeviceSubscription};
use crate::error::PlaybackError;
use crate::persistence::PositionStore;
use crate::types::{PlaybackStatus, SessionState, SubjectKey, Track};
use bridge_traits::{AudioOutput, DeviceEvent};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Cheaply cloneable handle to the playback session.
#[derive(Clone)]
pub struct SessionCoordinator {
    inner: Arc<Inner>,
}

struct Inner {
    device: DeviceAdapter,
    store: Arc<dyn PositionStore>,
    event_bus: EventBus,
    config: SessionConfig,
    session: Mutex<Session>,
    snapshots: watch::Sender<SessionState>,
}

struct Session {
    state: SessionState,
    generation: u64,
    subscription: Option<DeviceSubscription>,
    /// Pauses the coordinator requested whose device notification has not
    /// arrived yet. Those notifications must not save a second time.
    pending_pause_echoes: u32,
    /// The user moved the clock since the current source was loaded. A
    /// resume position arriving afterwards is not applied.
    seeked: bool,
}

impl SessionCoordinator {
    pub fn new(
        output: Arc<dyn AudioOutput>,
        store: Arc<dyn PositionStore>,
        event_bus: EventBus,
        config: SessionConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                device: DeviceAdapter::new(output),
                store,
                event_bus,
                config,
                session: Mutex::new(Session {
                    state: SessionState::default(),
                    generation: 0,
                    subscription: None,
                    pending_pause_echoes: 0,
                    seeked: false,
                }),
                snapshots,
            }),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn snapshot(&self) -> SessionState {
        self.inner.session.lock().state.clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.inner.snapshots.subscribe()
    }

    /// Whether `track` is the loaded subject.
    pub fn is_current(&self, track: &Track) -> bool {
        self.inner
            .session
            .lock()
            .state
            .current_track
            .as_ref()
            .is_some_and(|current| current.same_subject(track))
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Load and start `next`, resuming from its remembered position.
    ///
    /// Passing the subject that is already loaded toggles play/pause instead.
    /// `None` is ignored.
    #[instrument(skip_all, fields(subject))]
    pub async fn play_track(&self, next: impl Into<Option<Track>>) {
        let Some(next) = next.into() else {
            return;
        };
        let key = next.subject_key();
        tracing::Span::current().record("subject", tracing::field::display(&key));

        if self.is_current(&next) {
            debug!("Same subject requested, toggling");
            self.toggle_play_pause().await;
            return;
        }

        let Some(generation) = self.begin_load(&next, &key) else {
            return;
        };

        self.resume_position(generation, key.clone()).await;

        if !self.is_generation(generation) {
            debug!("Superseded before playback started");
            return;
        }

        match self.inner.device.play().await {
            Ok(()) => {
                let mut session = self.inner.session.lock();
                if session.generation != generation {
                    debug!("Ignoring play result for a superseded source");
                    return;
                }
                if session.state.status == PlaybackStatus::Loading {
                    session.state.status = PlaybackStatus::Playing;
                    session.state.last_error = None;
                    self.publish(&session);
                    drop(session);
                    info!("Playback started");
                    self.emit(PlaybackEvent::Started {
                        subject: key.to_string(),
                        title: next.title.clone(),
                    });
                }
            }
            Err(err) => self.record_failure(generation, err),
        }
    }

    /// Pause when playing, otherwise play. No-op without a loaded track.
    #[instrument(skip(self))]
    pub async fn toggle_play_pause(&self) {
        let (generation, status, key) = {
            let mut session = self.inner.session.lock();
            let Some(key) = session.state.subject() else {
                return;
            };
            if session.state.status == PlaybackStatus::Playing {
                session.pending_pause_echoes += 1;
            }
            (session.generation, session.state.status, key)
        };

        if status == PlaybackStatus::Playing {
            let paused = self.inner.device.pause().await;

            let mut session = self.inner.session.lock();
            if session.generation != generation {
                return;
            }
            if let Err(err) = paused {
                session.pending_pause_echoes = session.pending_pause_echoes.saturating_sub(1);
                drop(session);
                self.record_failure(generation, err);
                return;
            }

            let position = self.inner.device.current_time();
            session.state.status = PlaybackStatus::Paused;
            session.state.position_secs = position;
            session.state.last_error = None;
            self.publish(&session);
            self.inner.store.save(&key, position);
            drop(session);

            debug!(subject = %key, position, "Paused");
            self.emit(PlaybackEvent::Paused {
                subject: key.to_string(),
                position_secs: position,
            });
        } else {
            match self.inner.device.play().await {
                Ok(()) => {
                    let mut session = self.inner.session.lock();
                    if session.generation != generation {
                        return;
                    }
                    let position = self.inner.device.current_time();
                    // A pause echo still owed at this point is never coming.
                    session.pending_pause_echoes = 0;
                    session.state.status = PlaybackStatus::Playing;
                    session.state.position_secs = position;
                    session.state.last_error = None;
                    self.publish(&session);
                    drop(session);

                    debug!(subject = %key, position, "Resumed");
                    self.emit(PlaybackEvent::Resumed {
                        subject: key.to_string(),
                        position_secs: position,
                    });
                }
                Err(err) => self.record_failure(generation, err),
            }
        }
    }

    /// Move the clock. The reported position updates immediately.
    pub fn seek_audio(&self, seconds: f64) {
        if !seconds.is_finite() {
            return;
        }
        let seconds = seconds.max(0.0);

        let mut session = self.inner.session.lock();
        if session.state.is_idle() {
            return;
        }
        self.inner.device.seek(seconds);
        session.seeked = true;
        session.state.position_secs = seconds;
        self.publish(&session);
    }

    /// End the session: pause, rewind, save position 0, and go `Idle`.
    #[instrument(skip(self))]
    pub async fn stop_track(&self) {
        let (generation, key) = {
            let mut session = self.inner.session.lock();
            let Some(key) = session.state.subject() else {
                return;
            };
            // Release first so the pause below is not seen as an external one.
            if let Some(subscription) = session.subscription.take() {
                subscription.release();
            }
            session.generation += 1;
            session.pending_pause_echoes = 0;
            session.seeked = false;
            (session.generation, key)
        };

        if let Err(err) = self.inner.device.pause().await {
            warn!(subject = %key, error = %err, "Pause failed while stopping");
        }

        let mut session = self.inner.session.lock();
        let still_ours = session.generation == generation;
        if still_ours {
            self.inner.device.seek(0.0);
        }
        self.inner.store.save(&key, 0.0);
        if still_ours {
            session.state = SessionState::default();
            self.publish(&session);
        }
        drop(session);

        info!(subject = %key, "Playback stopped");
        self.emit(PlaybackEvent::Stopped {
            subject: key.to_string(),
        });
    }

    // ========================================================================
    // Load sequence
    // ========================================================================

    /// Save the outgoing subject, swap the source and the device
    /// subscription, and return the new generation. `None` when the device
    /// refused the source.
    fn begin_load(&self, next: &Track, key: &SubjectKey) -> Option<u64> {
        let mut session = self.inner.session.lock();

        if let Some(outgoing) = session.state.subject() {
            let captured = self.inner.device.current_time();
            debug!(subject = %outgoing, position = captured, "Saving outgoing subject");
            self.inner.store.save(&outgoing, captured);
        }

        if let Some(subscription) = session.subscription.take() {
            subscription.release();
        }
        session.generation += 1;
        session.pending_pause_echoes = 0;
        session.seeked = false;
        let generation = session.generation;
        session.state = SessionState::loading(next.clone());

        if let Err(err) = self.inner.device.load(&next.audio_url) {
            warn!(subject = %key, error = %err, "Device refused source");
            session.state.last_error = Some(err.to_string());
            self.publish(&session);
            drop(session);
            self.emit(PlaybackEvent::Error {
                subject: Some(key.to_string()),
                message: err.to_string(),
            });
            return None;
        }

        session.subscription = Some(self.subscribe_device(generation));
        self.publish(&session);
        debug!(generation, "Source loaded");
        Some(generation)
    }

    /// Look up the remembered position, waiting at most the configured grace
    /// period. A late answer is applied from a background task.
    async fn resume_position(&self, generation: u64, key: SubjectKey) {
        let store = Arc::clone(&self.inner.store);
        let lookup_key = key.clone();
        let mut lookup: BoxFuture<'static, f64> =
            async move { store.fetch_last_position(&lookup_key).await }.boxed();

        let answered =
            tokio::time::timeout(self.inner.config.resume_lookup_grace, &mut lookup).await;
        match answered {
            Ok(offset) => self.apply_resume(generation, &key, offset),
            Err(_) => {
                debug!(subject = %key, "Resume lookup still pending, starting playback");
                let this = self.clone();
                tokio::spawn(async move {
                    let offset = lookup.await;
                    this.apply_resume(generation, &key, offset);
                });
            }
        }
    }

    fn apply_resume(&self, generation: u64, key: &SubjectKey, offset: f64) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            debug!(subject = %key, "Discarding resume position for a superseded load");
            return;
        }
        if session.seeked {
            debug!(subject = %key, "Clock already moved by the user, keeping it");
            return;
        }
        if !(offset.is_finite() && offset > 0.0) {
            return;
        }
        debug!(subject = %key, offset, "Resuming from remembered position");
        self.inner.device.seek(offset);
        session.state.position_secs = offset;
        self.publish(&session);
    }

    // ========================================================================
    // Device notifications
    // ========================================================================

    fn subscribe_device(&self, generation: u64) -> DeviceSubscription {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.device.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                SessionCoordinator { inner }.on_device_event(generation, event);
            }
        })
    }

    fn on_device_event(&self, generation: u64, event: DeviceEvent) {
        match event {
            DeviceEvent::Progress { position, duration } => {
                self.on_progress(generation, position, duration)
            }
            DeviceEvent::Ended => self.on_ended(generation),
            DeviceEvent::Paused => self.on_paused(generation),
        }
    }

    fn on_progress(&self, generation: u64, position: f64, duration: Option<f64>) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            return;
        }
        let Some(key) = session.state.subject() else {
            return;
        };

        if position.is_finite() && position >= 0.0 {
            session.state.position_secs = position;
        }
        let duration = duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .or_else(|| self.inner.device.duration());
        if let Some(duration) = duration {
            session.state.duration_secs = duration;
        }
        self.publish(&session);
        let (position_secs, duration_secs) =
            (session.state.position_secs, session.state.duration_secs);
        drop(session);

        if self.inner.config.emit_position_events {
            self.emit(PlaybackEvent::PositionChanged {
                subject: key.to_string(),
                position_secs,
                duration_secs,
            });
        }
    }

    fn on_ended(&self, generation: u64) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            return;
        }
        let Some(key) = session.state.subject() else {
            return;
        };

        session.state.status = PlaybackStatus::Ended;
        self.publish(&session);
        self.inner.store.save(&key, 0.0);
        drop(session);

        info!(subject = %key, "Playback completed");
        self.emit(PlaybackEvent::Completed {
            subject: key.to_string(),
        });
    }

    fn on_paused(&self, generation: u64) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            return;
        }
        if session.pending_pause_echoes > 0 {
            session.pending_pause_echoes -= 1;
            return;
        }
        let Some(key) = session.state.subject() else {
            return;
        };

        let position = self.inner.device.current_time();
        if position > 0.0 {
            self.inner.store.save(&key, position);
        }

        if session.state.status != PlaybackStatus::Playing {
            return;
        }
        session.state.status = PlaybackStatus::Paused;
        session.state.position_secs = position;
        self.publish(&session);
        drop(session);

        debug!(subject = %key, position, "Paused by device");
        self.emit(PlaybackEvent::Paused {
            subject: key.to_string(),
            position_secs: position,
        });
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn is_generation(&self, generation: u64) -> bool {
        self.inner.session.lock().generation == generation
    }

    fn record_failure(&self, generation: u64, err: PlaybackError) {
        let mut session = self.inner.session.lock();
        if session.generation != generation {
            debug!(error = %err, "Ignoring failure from a superseded source");
            return;
        }
        let subject = session.state.subject().map(|key| key.to_string());
        warn!(subject = ?subject, error = %err, "Playback transition failed");
        session.state.last_error = Some(err.to_string());
        self.publish(&session);
        drop(session);

        self.emit(PlaybackEvent::Error {
            subject,
            message: err.to_string(),
        });
    }

    fn publish(&self, session: &Session) {
        self.inner.snapshots.send_replace(session.state.clone());
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.inner.event_bus.emit(CoreEvent::Playback(event));
    }
}

impl std::fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let session = self.inner.session.lock();
        f.debug_struct("SessionCoordinator")
            .field("state", &session.state)
            .field("generation", &session.generation)
            .finish()
    }
}
