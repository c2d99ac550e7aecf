//! Collaborators shared by a review session and the helpers it hands out.

use bridge_traits::catalog::CatalogSearch;
use bridge_traits::library::{ImportCandidate, LibraryPlatform, ListType};
use core_runtime::events::{CoreEvent, EventBus, Notification, SyncEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, SyncError};
use crate::store::{Bucket, DispatchOnDrop, SyncAction, SyncState, SyncStore};

/// Unique identifier for a review session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tunables of a review session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Collection list every import lands in
    pub list_type: ListType,
    /// Whether loads include skipped titles (needed for the skipped tab)
    pub include_hidden: bool,
    pub search_debounce: Duration,
    pub search_limit: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            list_type: ListType::default(),
            include_hidden: true,
            search_debounce: Duration::from_millis(300),
            search_limit: 10,
        }
    }
}

#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) id: SessionId,
    pub(crate) store: SyncStore,
    pub(crate) platform: Arc<dyn LibraryPlatform>,
    pub(crate) catalog: Arc<dyn CatalogSearch>,
    pub(crate) events: EventBus,
    pub(crate) settings: SessionSettings,
}

impl SessionContext {
    pub(crate) fn session_id(&self) -> String {
        self.id.to_string()
    }

    pub(crate) fn emit(&self, event: SyncEvent) {
        self.events.emit(CoreEvent::Sync(event));
    }

    pub(crate) fn notify(&self, notification: Notification) {
        self.events.emit(CoreEvent::Notification(notification));
    }

    /// Hold `platform_id` for one operation.
    ///
    /// The candidate must sit in one of `allowed` and no other operation may
    /// hold it. It stays faded until the returned guard drops, whichever way
    /// the operation ends.
    pub(crate) fn claim(
        &self,
        platform_id: &str,
        allowed: &[Bucket],
        to: &str,
    ) -> Result<(ImportCandidate, DispatchOnDrop)> {
        let ids = vec![platform_id.to_string()];
        let candidate = self.store.transact(|state| -> Result<_> {
            let candidate = actionable(state, platform_id, allowed, to)?;
            Ok((candidate, vec![SyncAction::SetFading(ids.clone())]))
        })?;
        let release = DispatchOnDrop::new(self.store.clone(), SyncAction::ClearFading(ids));
        Ok((candidate, release))
    }

    /// Record a failure in the store and surface it as a dismissible error.
    pub(crate) fn report_failure(&self, operation: &str, error: &SyncError) {
        let message = error.to_string();
        warn!(session_id = %self.id, operation, error = %message, "Operation failed");

        self.store.dispatch(SyncAction::Failed(message.clone()));
        self.emit(SyncEvent::Failed {
            session_id: self.session_id(),
            operation: operation.to_string(),
            message: message.clone(),
        });
        self.notify(Notification::error(message));
    }
}

/// Candidate `platform_id`, if its bucket is one of `allowed` and no
/// operation is committing it.
pub(crate) fn actionable(
    state: &SyncState,
    platform_id: &str,
    allowed: &[Bucket],
    to: &str,
) -> Result<ImportCandidate> {
    let candidate = state
        .candidate(platform_id)
        .ok_or_else(|| SyncError::CandidateNotFound(platform_id.to_string()))?;
    if state.fading.contains(platform_id) {
        return Err(SyncError::busy(&format!("Action on {}", platform_id)));
    }
    match state.bucket_of(platform_id) {
        Some(bucket) if allowed.contains(&bucket) => Ok(candidate.clone()),
        bucket => Err(SyncError::InvalidStateTransition {
            from: bucket.map_or("imported", |b| b.as_str()).to_string(),
            to: to.to_string(),
            reason: format!("Candidate {} cannot be {}", platform_id, to),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context, matched, MockCatalog, MockPlatform};

    #[test]
    fn test_claim_holds_id_until_released() {
        let ctx = context(MockPlatform::new(), MockCatalog::new(), vec![matched("a", 1)]);

        let (candidate, release) = ctx.claim("a", &[Bucket::Ready], "imported").unwrap();
        assert_eq!(candidate.platform_id, "a");
        assert!(ctx.store.read(|s| s.fading.contains("a")));

        let err = ctx.claim("a", &[Bucket::Ready], "imported").unwrap_err();
        assert!(matches!(err, SyncError::Busy { .. }));

        drop(release);
        assert!(ctx.store.read(|s| s.fading.is_empty()));
        assert!(ctx.claim("a", &[Bucket::Ready], "imported").is_ok());
    }

    #[test]
    fn test_claim_checks_bucket() {
        let ctx = context(MockPlatform::new(), MockCatalog::new(), vec![matched("a", 1)]);

        let err = ctx.claim("a", &[Bucket::Skipped], "restored").unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert!(matches!(
            ctx.claim("missing", &[Bucket::Ready], "imported"),
            Err(SyncError::CandidateNotFound(_))
        ));
        assert!(ctx.store.read(|s| s.fading.is_empty()));
    }
}
