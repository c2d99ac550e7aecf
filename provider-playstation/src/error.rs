//! Error types for the PlayStation Network provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// PlayStation Network provider errors
#[derive(Error, Debug)]
pub enum PlayStationError {
    /// No PSN account is linked to the backend user
    #[error("PSN account not linked: {0}")]
    AccountNotLinked(String),

    /// A per-title route referenced an unknown title id
    #[error("PSN title not found: {title_id}")]
    TitleNotFound { title_id: String },

    /// Backend returned a non-success status
    #[error("PSN library API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse PSN library response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for PlayStation operations
pub type Result<T> = std::result::Result<T, PlayStationError>;

impl From<PlayStationError> for BridgeError {
    fn from(error: PlayStationError) -> Self {
        match error {
            PlayStationError::AccountNotLinked(msg) => BridgeError::NotLinked(msg),
            PlayStationError::TitleNotFound { title_id } => BridgeError::Api {
                status: 404,
                message: format!("PSN title not found: {}", title_id),
            },
            PlayStationError::ApiError {
                status_code,
                message,
            } => BridgeError::Api {
                status: status_code,
                message,
            },
            PlayStationError::ParseError(msg) => BridgeError::Decode(msg),
            PlayStationError::BridgeError(e) => e,
        }
    }
}
