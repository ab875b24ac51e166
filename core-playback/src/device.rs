//! # Playback Device Adapter
//!
//! Wraps one [`AudioOutput`] and turns its listener callbacks into
//! subscriptions that can be released per loaded source.
//!
//! Device notifications are queued onto a channel and handled on a separate
//! task, so a handler never runs inside the device's own callback. Releasing
//! a [`DeviceSubscription`] unregisters the listener and stops the handler
//! task; nothing queued after that point is handled.

use crate::error::{PlaybackError, Result};
use bridge_traits::{AudioOutput, DeviceEvent, DeviceListener, ListenerId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Exclusive handle on the audio output used by the session coordinator.
#[derive(Clone)]
pub struct DeviceAdapter {
    output: Arc<dyn AudioOutput>,
}

impl DeviceAdapter {
    pub fn new(output: Arc<dyn AudioOutput>) -> Self {
        Self { output }
    }

    /// Replace the current source.
    pub fn load(&self, url: &str) -> Result<()> {
        debug!(url = %core_runtime::logging::strip_query(url), "Loading source");
        self.output.load(url).map_err(PlaybackError::from_device)
    }

    pub async fn play(&self) -> Result<()> {
        self.output.play().await.map_err(PlaybackError::from_device)
    }

    pub async fn pause(&self) -> Result<()> {
        self.output.pause().await.map_err(PlaybackError::from_device)
    }

    pub fn seek(&self, seconds: f64) {
        self.output.seek(seconds);
    }

    pub fn current_time(&self) -> f64 {
        let t = self.output.current_time();
        if t.is_finite() && t > 0.0 {
            t
        } else {
            0.0
        }
    }

    /// Source duration, `None` while unknown or not a usable number.
    pub fn duration(&self) -> Option<f64> {
        self.output.duration().filter(|d| d.is_finite() && *d > 0.0)
    }

    /// Register `handler` for progress, ended and paused notifications.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<F>(&self, handler: F) -> DeviceSubscription
    where
        F: Fn(DeviceEvent) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let listener_id = self.output.add_listener(Arc::new(ChannelListener { tx }));

        let pump = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler(event);
            }
        });

        DeviceSubscription {
            output: Arc::clone(&self.output),
            listener_id: Some(listener_id),
            pump: Some(pump),
        }
    }
}

impl std::fmt::Debug for DeviceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceAdapter").finish_non_exhaustive()
    }
}

struct ChannelListener {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl DeviceListener for ChannelListener {
    fn on_event(&self, event: DeviceEvent) {
        if self.tx.send(event).is_err() {
            debug!(?event, "Device event arrived after its subscription ended");
        }
    }
}

/// Live registration of a device listener. Dropping it unregisters.
pub struct DeviceSubscription {
    output: Arc<dyn AudioOutput>,
    listener_id: Option<ListenerId>,
    pump: Option<JoinHandle<()>>,
}

impl DeviceSubscription {
    /// Unregister now. Equivalent to dropping, spelled out at call sites.
    pub fn release(mut self) {
        self.unregister();
    }

    fn unregister(&mut self) {
        if let Some(id) = self.listener_id.take() {
            self.output.remove_listener(id);
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for DeviceSubscription {
    fn drop(&mut self) {
        self.unregister();
    }
}

impl std::fmt::Debug for DeviceSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSubscription")
            .field("listener_id", &self.listener_id)
            .finish()
    }
}
