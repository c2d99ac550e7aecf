//! Error types for the Steam provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Steam provider errors
#[derive(Error, Debug)]
pub enum SteamError {
    /// The user has no Steam account linked to the backend
    #[error("Steam account not linked: {0}")]
    AccountNotLinked(String),

    /// Backend returned a non-success status
    #[error("Steam library API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse Steam library response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Steam operations
pub type Result<T> = std::result::Result<T, SteamError>;

impl From<SteamError> for BridgeError {
    fn from(error: SteamError) -> Self {
        match error {
            SteamError::AccountNotLinked(msg) => BridgeError::NotLinked(msg),
            SteamError::ApiError {
                status_code,
                message,
            } => BridgeError::Api {
                status: status_code,
                message,
            },
            SteamError::ParseError(msg) => BridgeError::Decode(msg),
            SteamError::BridgeError(e) => e,
        }
    }
}
