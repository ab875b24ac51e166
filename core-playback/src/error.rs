//! # Playback Error Types
//!
//! Errors raised inside the playback session core. None of them cross the
//! coordinator's public operations: they are recorded in session state,
//! logged, and emitted as events.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur during playback session operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Device Errors
    // ========================================================================
    /// The output device refused to start, typically an autoplay policy
    /// waiting for a user gesture.
    #[error("Playback rejected by device: {0}")]
    DeviceRejected(String),

    /// Platform audio device encountered an error.
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    // ========================================================================
    // Persistence Errors
    // ========================================================================
    /// Position service answered with a non-success status.
    #[error("Position persistence failed: {0}")]
    Persistence(String),

    /// User is not authenticated.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Response body did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl PlaybackError {
    /// Returns `true` if this error is transient and a later attempt could
    /// succeed. The session core never retries by itself.
    pub fn is_transient(&self) -> bool {
        match self {
            PlaybackError::Persistence(_) => true,
            PlaybackError::Bridge(err) => !err.is_rejection(),
            _ => false,
        }
    }

    /// Map a device-side bridge failure, keeping policy rejections distinct.
    pub(crate) fn from_device(err: BridgeError) -> Self {
        match err {
            BridgeError::Rejected(reason) => PlaybackError::DeviceRejected(reason),
            other => PlaybackError::AudioDeviceError(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_rejection_mapping() {
        let err = PlaybackError::from_device(BridgeError::Rejected("autoplay".into()));
        assert!(matches!(err, PlaybackError::DeviceRejected(ref r) if r == "autoplay"));
        assert!(!err.is_transient());

        let err = PlaybackError::from_device(BridgeError::OperationFailed("decoder".into()));
        assert!(matches!(err, PlaybackError::AudioDeviceError(_)));
    }

    #[test]
    fn test_transient_classification() {
        assert!(PlaybackError::Persistence("503".into()).is_transient());
        assert!(PlaybackError::from(BridgeError::OperationFailed("reset".into())).is_transient());
        assert!(!PlaybackError::NotAuthenticated.is_transient());
        assert!(!PlaybackError::InvalidResponse("eof".into()).is_transient());
    }
}
