use thiserror::Error;

/// Failure crossing the host boundary: transport, backend status or payload.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The request did not complete within the transport timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A response body did not have the expected shape.
    #[error("Malformed payload: {0}")]
    Decode(String),

    /// The external platform account is not connected to this user.
    #[error("Platform account not linked: {0}")]
    NotLinked(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl BridgeError {
    /// Whether this error reports a missing platform account link.
    pub fn is_not_linked(&self) -> bool {
        matches!(self, BridgeError::NotLinked(_))
    }

    /// HTTP status reported by the backend, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
