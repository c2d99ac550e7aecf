//! Error types for catalog search

use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Search endpoint returned a non-success status
    #[error("Catalog search failed (status {status_code}): {message}")]
    SearchFailed { status_code: u16, message: String },

    #[error("Failed to parse catalog response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for BridgeError {
    fn from(error: CatalogError) -> Self {
        match error {
            CatalogError::SearchFailed {
                status_code,
                message,
            } => BridgeError::Api {
                status: status_code,
                message,
            },
            CatalogError::ParseError(msg) => BridgeError::Decode(msg),
            CatalogError::Bridge(e) => e,
        }
    }
}
