//! Workspace facade crate.
//!
//! Exposes feature flags that map onto the individual workspace crates
//! (`core-service`, `core-playback`) so host applications can depend on a
//! single package and enable what they need.

#[cfg(feature = "desktop-shims")]
pub use core_service as service;

#[cfg(feature = "session")]
pub use core_playback as playback;
