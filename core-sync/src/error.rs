use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to load library: {0}")]
    FetchFailure(String),

    #[error("Failed to sync library: {0}")]
    SyncFailure(String),

    #[error("Failed to {action}: {message}")]
    ActionFailure { action: String, message: String },

    /// The manual match was saved but the follow-up import failed.
    #[error("Match saved for {platform_id} (catalog {catalog_id}), but import failed: {message}")]
    PartialCommitFailure {
        platform_id: String,
        catalog_id: u64,
        message: String,
    },

    #[error("{operation} already in progress")]
    Busy { operation: String },

    #[error("Candidate {0} not found")]
    CandidateNotFound(String),

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Catalog search failed: {0}")]
    Catalog(String),
}

impl SyncError {
    pub(crate) fn action(action: &str, error: BridgeError) -> Self {
        SyncError::ActionFailure {
            action: action.to_string(),
            message: error.to_string(),
        }
    }

    pub(crate) fn busy(operation: &str) -> Self {
        SyncError::Busy {
            operation: operation.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_failure_message() {
        let error = SyncError::action(
            "skip",
            BridgeError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        );
        assert_eq!(
            error.to_string(),
            "Failed to skip: API error (status 500): boom"
        );
    }

    #[test]
    fn test_busy_message() {
        assert_eq!(
            SyncError::busy("Bulk action").to_string(),
            "Bulk action already in progress"
        );
    }
}
