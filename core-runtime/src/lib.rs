//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the playback session core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! Other workspace crates depend on this one for their logging conventions,
//! for the validated [`config::CoreConfig`], and for the broadcast
//! [`events::EventBus`] that carries auth teardown and playback
//! notifications between modules.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
