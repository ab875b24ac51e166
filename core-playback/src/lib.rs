//! # Playback Session Module
//!
//! Coordinates the single active audio session of the client.
//!
//! ## Overview
//!
//! This module handles:
//! - The session state machine (`Idle`, `Loading`, `Playing`, `Paused`, `Ended`)
//! - Saving the listening position at every transition that matters
//! - Resuming from the remembered position when a track is loaded
//! - Dropping results of async work that a newer load has superseded
//! - Stopping playback when the user signs out
//!
//! ## Components
//!
//! - [`DeviceAdapter`]: wraps the host's [`AudioOutput`](bridge_traits::AudioOutput)
//! - [`PositionStore`] / [`HttpPositionStore`]: remote position persistence
//! - [`SessionCoordinator`]: the only entry point UI code calls
//! - [`SessionLifecycleBinder`]: ties the session to the auth lifecycle
//! - [`RecentHistory`]: the recently played list

pub mod config;
pub mod coordinator;
pub mod device;
pub mod error;
pub mod history;
pub mod lifecycle;
pub mod persistence;
pub mod types;

pub use config::SessionConfig;
pub use coordinator::SessionCoordinator;
pub use device::{DeviceAdapter, DeviceSubscription};
pub use error::{PlaybackError, Result};
pub use history::{RecentEntry, RecentHistory};
pub use lifecycle::SessionLifecycleBinder;
pub use persistence::{HttpPositionStore, PositionStore};
pub use types::{format_clock, PlaybackStatus, SessionState, SubjectKey, SubjectKind, Track};
