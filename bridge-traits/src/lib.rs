//! # Host Bridge Traits
//!
//! Capability contracts the playback core requires from its host.
//!
//! ## Overview
//!
//! The session core never talks to a speaker or a socket directly. Each
//! capability it needs is expressed as a trait here and implemented per
//! platform (the desktop implementations live in `bridge-desktop`; browser
//! and mobile hosts inject their own).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the position
//!   persistence client and the recently-played listing
//! - [`AudioOutput`](playback::AudioOutput) - The single media-output device:
//!   load, play, pause, seek, clock and notification listeners
//! - [`DeviceListener`](playback::DeviceListener) - Receiver side of device
//!   notifications (progress, ended, paused)
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native failures into it with an
//! actionable message.
//!
//! ## Thread Safety
//!
//! Every bridge trait requires `Send + Sync` so handles can be shared across
//! async tasks behind an `Arc`.
//!
//! ## Example
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
//!
//! async fn ping(client: &dyn HttpClient) -> bridge_traits::error::Result<bool> {
//!     let request = HttpRequest::new(HttpMethod::Get, "https://api.example.com/health");
//!     Ok(client.execute(request).await?.is_success())
//! }
//! ```

pub mod error;
pub mod http;
pub mod playback;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use playback::{AudioOutput, DeviceEvent, DeviceListener, ListenerId};
