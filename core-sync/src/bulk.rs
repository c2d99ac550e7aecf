//! # Bulk Action Coordinator
//!
//! Runs multi-item commits against the platform with progress reporting.
//!
//! Fault isolation differs by action:
//!
//! - **Import** is one batched `import_many` call. It either lands for every
//!   item or for none; selection survives a failure so the user can retry.
//!   Progress jumps from `0/total` to `total/total`.
//! - **Skip** is a sequential per-item loop. Each success is applied as soon
//!   as its call returns; the loop stops at the first failure and keeps what
//!   was already skipped.
//!
//! Only one bulk action runs per session at a time. A batch holds its ids
//! like any single-item action does; ids another operation already holds are
//! left out of the batch.

use bridge_traits::library::ImportItem;
use core_runtime::events::{BulkKind, Notification, SyncEvent};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::context::SessionContext;
use crate::error::{Result, SyncError};
use crate::reconcile;
use crate::store::{Bucket, DispatchOnDrop, SyncAction, SyncState};

/// Result of a bulk action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BulkOutcome {
    /// Items the action was issued for
    pub attempted: usize,
    /// Items that were committed
    pub succeeded: usize,
}

impl BulkOutcome {
    fn empty() -> Self {
        Self::default()
    }
}

/// Bulk import/skip over a session's store.
///
/// Obtained from [`SyncReviewSession::bulk`](crate::SyncReviewSession::bulk).
pub struct BulkActionCoordinator {
    ctx: SessionContext,
}

impl BulkActionCoordinator {
    pub(crate) fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Import the selected candidates that are in the ready bucket.
    pub async fn import_selected(&self) -> Result<BulkOutcome> {
        let ids = self.ctx.store.read(|state| selected_in(state, &[Bucket::Ready]));
        self.import_ids(ids).await
    }

    /// Import every candidate in the ready bucket, regardless of selection.
    pub async fn import_all_ready(&self) -> Result<BulkOutcome> {
        let ids = self
            .ctx
            .store
            .read(|state| reconcile::ids_in_bucket(state, Bucket::Ready));
        self.import_ids(ids).await
    }

    /// Skip the selected candidates that are still actionable.
    pub async fn skip_selected(&self) -> Result<BulkOutcome> {
        let ids = self
            .ctx
            .store
            .read(|state| selected_in(state, &[Bucket::Ready, Bucket::Unmatched]));
        self.skip_ids(ids).await
    }

    /// Skip every candidate in the unmatched bucket.
    pub async fn skip_all_unmatched(&self) -> Result<BulkOutcome> {
        let ids = self
            .ctx
            .store
            .read(|state| reconcile::ids_in_bucket(state, Bucket::Unmatched));
        self.skip_ids(ids).await
    }

    /// Mark the session as processing and hold `ids` for this action.
    ///
    /// Fails if a bulk action is running. Returns `None` when every id is
    /// held by another operation.
    fn begin(&self, ids: Vec<String>) -> Result<Option<Batch>> {
        let ids = self.ctx.store.transact(|state| -> Result<_> {
            if state.is_processing {
                return Err(SyncError::busy("Bulk action"));
            }
            let free: Vec<String> = ids
                .into_iter()
                .filter(|id| !state.fading.contains(id))
                .collect();
            if free.is_empty() {
                return Ok((free, Vec::new()));
            }
            let actions = vec![
                SyncAction::ProcessingStarted { total: free.len() },
                SyncAction::SetFading(free.clone()),
            ];
            Ok((free, actions))
        })?;
        if ids.is_empty() {
            debug!("Every id is held by another operation");
            return Ok(None);
        }

        let store = self.ctx.store.clone();
        Ok(Some(Batch {
            _release: DispatchOnDrop::new(store.clone(), SyncAction::ClearFading(ids.clone())),
            _processing: DispatchOnDrop::new(store, SyncAction::ProcessingFinished),
            ids,
        }))
    }

    fn progress(&self, kind: BulkKind, current: usize, total: usize) {
        self.ctx
            .store
            .dispatch(SyncAction::ProgressAdvanced { current });
        self.ctx.emit(SyncEvent::BulkProgress {
            session_id: self.ctx.session_id(),
            kind,
            current,
            total,
        });
    }

    #[instrument(skip(self, ids), fields(session_id = %self.ctx.id, count = ids.len()))]
    async fn import_ids(&self, ids: Vec<String>) -> Result<BulkOutcome> {
        let mut items: Vec<ImportItem> = self.ctx.store.read(|state| {
            ids.iter()
                .filter_map(|id| state.candidate(id))
                .filter_map(|c| {
                    c.catalog_id.map(|catalog_id| ImportItem {
                        platform_id: c.platform_id.clone(),
                        catalog_id,
                        list_type: self.ctx.settings.list_type,
                    })
                })
                .collect()
        });
        if items.is_empty() {
            return Ok(BulkOutcome::empty());
        }

        let wanted = items.iter().map(|item| item.platform_id.clone()).collect();
        let Some(batch) = self.begin(wanted)? else {
            return Ok(BulkOutcome::empty());
        };
        items.retain(|item| batch.ids.contains(&item.platform_id));
        let total = items.len();
        self.progress(BulkKind::Import, 0, total);

        if let Err(e) = self.ctx.platform.import_many(&items).await {
            let error = SyncError::action("import games", e);
            self.ctx.report_failure("import", &error);
            return Err(error);
        }

        self.ctx
            .store
            .dispatch(SyncAction::MarkImported(batch.ids.clone()));
        self.ctx.store.dispatch(SyncAction::ClearSelection);
        self.progress(BulkKind::Import, total, total);

        info!(count = total, "Bulk import committed");
        self.ctx.emit(SyncEvent::Imported {
            session_id: self.ctx.session_id(),
            count: total,
        });
        self.ctx.notify(Notification::success(format!(
            "Imported {} {}",
            total,
            games(total)
        )));

        Ok(BulkOutcome {
            attempted: total,
            succeeded: total,
        })
    }

    #[instrument(skip(self, ids), fields(session_id = %self.ctx.id, count = ids.len()))]
    async fn skip_ids(&self, ids: Vec<String>) -> Result<BulkOutcome> {
        if ids.is_empty() {
            return Ok(BulkOutcome::empty());
        }

        let Some(batch) = self.begin(ids)? else {
            return Ok(BulkOutcome::empty());
        };
        let total = batch.ids.len();
        self.progress(BulkKind::Skip, 0, total);

        for (index, id) in batch.ids.iter().enumerate() {
            if let Err(e) = self.ctx.platform.skip(id).await {
                let error = SyncError::action("skip games", e);
                info!(skipped = index, total, "Bulk skip stopped at first failure");
                self.ctx.report_failure("skip", &error);
                return Err(error);
            }

            self.ctx.store.dispatch(SyncAction::MarkSkipped(id.clone()));
            self.ctx
                .store
                .dispatch(SyncAction::ClearFading(vec![id.clone()]));
            self.progress(BulkKind::Skip, index + 1, total);
        }

        self.ctx.store.dispatch(SyncAction::ClearSelection);
        info!(count = total, "Bulk skip committed");
        self.ctx.emit(SyncEvent::Skipped {
            session_id: self.ctx.session_id(),
            count: total,
        });
        self.ctx.notify(Notification::success(format!(
            "Skipped {} {}",
            total,
            games(total)
        )));

        Ok(BulkOutcome {
            attempted: total,
            succeeded: total,
        })
    }
}

/// Ids a running bulk action holds, released when it drops.
struct Batch {
    ids: Vec<String>,
    _release: DispatchOnDrop,
    _processing: DispatchOnDrop,
}

fn selected_in(state: &SyncState, buckets: &[Bucket]) -> Vec<String> {
    state
        .selection
        .iter()
        .filter(|id| {
            state
                .bucket_of(id)
                .is_some_and(|bucket| buckets.contains(&bucket))
        })
        .cloned()
        .collect()
}

fn games(count: usize) -> &'static str {
    if count == 1 {
        "game"
    } else {
        "games"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Overlay, SyncStore};
    use crate::test_support::{context, matched, server_error, MockCatalog, MockPlatform};
    use bridge_traits::library::ImportCandidate;
    use core_runtime::events::{CoreEvent, EventBus, EventSeverity};

    fn coordinator(
        platform: MockPlatform,
        library: Vec<ImportCandidate>,
    ) -> (BulkActionCoordinator, SyncStore, EventBus) {
        let ctx = context(platform, MockCatalog::new(), library);
        let (store, events) = (ctx.store.clone(), ctx.events.clone());
        (BulkActionCoordinator::new(ctx), store, events)
    }

    #[tokio::test]
    async fn test_import_selected_marks_batch_imported() {
        let mut platform = MockPlatform::new();
        platform
            .expect_import_many()
            .withf(|items: &[ImportItem]| {
                items.len() == 1 && items[0].platform_id == "p42" && items[0].catalog_id == 42
            })
            .times(1)
            .returning(|_| Ok(()));

        let (bulk, store, events) = coordinator(platform, vec![matched("p42", 42)]);
        let mut rx = events.subscribe();
        store.dispatch(SyncAction::ToggleSelection("p42".to_string()));

        let outcome = bulk.import_selected().await.unwrap();

        assert_eq!(outcome, BulkOutcome { attempted: 1, succeeded: 1 });
        let state = store.snapshot();
        assert_eq!(state.overlay("p42"), Some(Overlay::ImportedLocally));
        assert_eq!(state.bucket_of("p42"), None);
        assert!(state.selection.is_empty());
        assert!(!state.is_processing);
        assert!(state.fading.is_empty());

        let mut saw_success = false;
        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            match event {
                CoreEvent::Notification(n) => saw_success |= n.severity == EventSeverity::Success,
                CoreEvent::Sync(SyncEvent::BulkProgress { current, total, .. }) => {
                    progress.push((current, total))
                }
                _ => {}
            }
        }
        assert!(saw_success);
        assert_eq!(progress, vec![(0, 1), (1, 1)]);
    }

    #[tokio::test]
    async fn test_import_progress_jumps_to_total() {
        let mut platform = MockPlatform::new();
        platform.expect_import_many().times(1).returning(|_| Ok(()));

        let (bulk, _store, events) =
            coordinator(platform, vec![matched("a", 1), matched("b", 2), matched("c", 3)]);
        let mut rx = events.subscribe();

        bulk.import_all_ready().await.unwrap();

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::Sync(SyncEvent::BulkProgress { current, total, .. }) = event {
                progress.push((current, total));
            }
        }
        assert_eq!(progress, vec![(0, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_import_leaves_out_ids_held_elsewhere() {
        let mut platform = MockPlatform::new();
        platform
            .expect_import_many()
            .withf(|items: &[ImportItem]| items.len() == 1 && items[0].platform_id == "b")
            .times(1)
            .returning(|_| Ok(()));

        let (bulk, store, _events) = coordinator(platform, vec![matched("a", 1), matched("b", 2)]);
        store.dispatch(SyncAction::SetFading(vec!["a".to_string()]));

        let outcome = bulk.import_all_ready().await.unwrap();

        assert_eq!(outcome, BulkOutcome { attempted: 1, succeeded: 1 });
        let state = store.snapshot();
        assert_eq!(state.overlay("a"), None);
        assert_eq!(state.overlay("b"), Some(Overlay::ImportedLocally));
        assert!(state.fading.contains("a"));
    }

    #[tokio::test]
    async fn test_skip_with_every_id_held_makes_no_call() {
        let mut platform = MockPlatform::new();
        platform.expect_skip().never();

        let (bulk, store, _events) = coordinator(platform, vec![ImportCandidate::new("u", "u")]);
        store.dispatch(SyncAction::SetFading(vec!["u".to_string()]));

        assert_eq!(bulk.skip_all_unmatched().await.unwrap(), BulkOutcome::default());
        assert!(!store.read(|s| s.is_processing));
    }

    #[tokio::test]
    async fn test_failed_import_marks_nothing_and_keeps_selection() {
        let mut platform = MockPlatform::new();
        platform
            .expect_import_many()
            .times(1)
            .returning(|_| Err(server_error()));

        let (bulk, store, _events) =
            coordinator(platform, vec![matched("a", 1), matched("b", 2), matched("c", 3)]);
        store.dispatch(SyncAction::SelectAllVisible);

        let err = bulk.import_selected().await.unwrap_err();

        assert!(matches!(err, SyncError::ActionFailure { .. }));
        let state = store.snapshot();
        assert!(state.overlays.is_empty());
        assert_eq!(state.selection.len(), 3);
        assert!(state.fading.is_empty());
        assert!(!state.is_processing);
        assert!(state.last_error.is_some());
    }

    #[tokio::test]
    async fn test_import_all_ready_ignores_selection() {
        let mut platform = MockPlatform::new();
        platform
            .expect_import_many()
            .withf(|items: &[ImportItem]| items.len() == 2)
            .times(1)
            .returning(|_| Ok(()));

        let (bulk, store, _events) = coordinator(
            platform,
            vec![matched("a", 1), ImportCandidate::new("u", "u"), matched("b", 2)],
        );

        let outcome = bulk.import_all_ready().await.unwrap();
        assert_eq!(outcome.succeeded, 2);
        assert_eq!(store.read(|s| s.bucket_of("u")), Some(Bucket::Unmatched));
    }

    #[tokio::test]
    async fn test_nothing_to_import_makes_no_call() {
        let mut platform = MockPlatform::new();
        platform.expect_import_many().never();

        let (bulk, _store, _events) = coordinator(platform, vec![ImportCandidate::new("u", "u")]);
        assert_eq!(bulk.import_all_ready().await.unwrap(), BulkOutcome::default());
    }

    #[tokio::test]
    async fn test_skip_stops_at_first_failure_and_keeps_progress() {
        let mut platform = MockPlatform::new();
        platform
            .expect_skip()
            .withf(|id: &str| id == "u1" || id == "u2")
            .times(2)
            .returning(|_| Ok(()));
        platform
            .expect_skip()
            .withf(|id: &str| id == "u3")
            .times(1)
            .returning(|_| Err(server_error()));
        platform
            .expect_skip()
            .withf(|id: &str| id == "u4")
            .never();

        let library = ["u1", "u2", "u3", "u4"]
            .iter()
            .map(|id| ImportCandidate::new(*id, *id))
            .collect();
        let (bulk, store, _events) = coordinator(platform, library);

        let err = bulk.skip_all_unmatched().await.unwrap_err();
        assert!(matches!(err, SyncError::ActionFailure { ref action, .. } if action == "skip games"));

        let state = store.snapshot();
        assert_eq!(state.overlay("u1"), Some(Overlay::SkippedLocally));
        assert_eq!(state.overlay("u2"), Some(Overlay::SkippedLocally));
        assert_eq!(state.overlay("u3"), None);
        assert_eq!(state.overlay("u4"), None);
        assert!(state.fading.is_empty());
        assert!(!state.is_processing);
    }

    #[tokio::test]
    async fn test_skip_selected_reports_progress() {
        let mut platform = MockPlatform::new();
        platform.expect_skip().times(2).returning(|_| Ok(()));

        let (bulk, store, events) = coordinator(
            platform,
            vec![ImportCandidate::new("u1", "u1"), ImportCandidate::new("u2", "u2")],
        );
        store.dispatch(SyncAction::SetTab(Bucket::Unmatched));
        store.dispatch(SyncAction::SelectAllVisible);
        let mut rx = events.subscribe();

        let outcome = bulk.skip_selected().await.unwrap();
        assert_eq!(outcome, BulkOutcome { attempted: 2, succeeded: 2 });

        let mut progress = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let CoreEvent::Sync(SyncEvent::BulkProgress { current, total, .. }) = event {
                progress.push((current, total));
            }
        }
        assert_eq!(progress, vec![(0, 2), (1, 2), (2, 2)]);
        assert!(store.read(|s| s.selection.is_empty()));
    }

    #[tokio::test]
    async fn test_second_bulk_action_while_processing_is_busy() {
        let platform = MockPlatform::new();
        let (bulk, store, _events) = coordinator(platform, vec![matched("a", 1)]);
        store.dispatch(SyncAction::ProcessingStarted { total: 5 });

        let err = bulk.import_all_ready().await.unwrap_err();
        assert!(matches!(err, SyncError::Busy { .. }));
        assert_eq!(store.read(|s| s.progress.total), 5);
    }
}
