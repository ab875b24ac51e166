use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Device refused the request: {0}")]
    Rejected(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the host refused the call by policy rather than
    /// failing (e.g. autoplay blocked until a user gesture).
    pub fn is_rejection(&self) -> bool {
        matches!(self, BridgeError::Rejected(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
