//! # Manual Match Resolver
//!
//! Lets the user attach a catalog entry to one candidate the automatic
//! matcher got wrong (or could not match), then imports it.
//!
//! ## Lifecycle
//!
//! ```text
//! Closed ──open──▶ Searching ◀──search──▶ Reviewing
//!                      │                      │
//!                      └──────confirm─────────┴──▶ Confirming ──▶ Closed
//!                                                      │
//!                                     failure ◀────────┘ (back to Reviewing)
//! ```
//!
//! Closing from any phase discards every piece of resolver state and
//! invalidates pending searches. Nothing is written to the store or the
//! platform before `confirm`.
//!
//! ## Confirm
//!
//! Confirm issues two platform calls in order: persist the manual match, then
//! import the item. When the import fails after the match was saved, the
//! match stays applied in the store (the backend remembers it too) and the
//! caller gets [`SyncError::PartialCommitFailure`].

use bridge_traits::catalog::CatalogMatch;
use bridge_traits::library::{ImportCandidate, ImportItem, ManualMatch};
use core_runtime::events::{Notification, SyncEvent};
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, instrument};

use crate::context::SessionContext;
use crate::debounce::SearchDebouncer;
use crate::error::{Result, SyncError};
use crate::store::{Bucket, SyncAction};

/// Phase of the resolver state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverPhase {
    #[default]
    Closed,
    Searching,
    Reviewing,
    Confirming,
}

impl ResolverPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverPhase::Closed => "closed",
            ResolverPhase::Searching => "searching",
            ResolverPhase::Reviewing => "reviewing",
            ResolverPhase::Confirming => "confirming",
        }
    }

    fn can_transition(self, to: ResolverPhase) -> bool {
        match (self, to) {
            (_, ResolverPhase::Closed) => true,
            (ResolverPhase::Closed, ResolverPhase::Searching) => true,
            (ResolverPhase::Searching, ResolverPhase::Reviewing) => true,
            (ResolverPhase::Reviewing, ResolverPhase::Searching) => true,
            (ResolverPhase::Searching, ResolverPhase::Searching) => true,
            (ResolverPhase::Searching, ResolverPhase::Confirming) => true,
            (ResolverPhase::Reviewing, ResolverPhase::Confirming) => true,
            (ResolverPhase::Confirming, ResolverPhase::Reviewing) => true,
            _ => false,
        }
    }
}

impl fmt::Display for ResolverPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the resolver for rendering
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResolverView {
    pub phase: ResolverPhase,
    pub candidate: Option<ImportCandidate>,
    pub query: String,
    pub results: Vec<CatalogMatch>,
    pub selected: Option<CatalogMatch>,
    pub is_searching: bool,
}

#[derive(Debug, Default)]
struct ResolverInner {
    phase: ResolverPhase,
    candidate: Option<ImportCandidate>,
    query: String,
    results: Vec<CatalogMatch>,
    selected: Option<CatalogMatch>,
    is_searching: bool,
}

impl ResolverInner {
    fn transition(&mut self, to: ResolverPhase) -> Result<()> {
        if !self.phase.can_transition(to) {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!("Cannot transition from {} to {}", self.phase, to),
            });
        }
        debug!(from = %self.phase, to = %to, "resolver transition");
        self.phase = to;
        Ok(())
    }

    fn reset(&mut self) {
        *self = ResolverInner::default();
    }
}

/// Fix-match flow for one candidate at a time.
///
/// Obtained from [`SyncReviewSession::fix_match`](crate::SyncReviewSession::fix_match),
/// already opened against the candidate being fixed and showing the results
/// for its platform title. Share it behind an
/// `Arc` to drive searches from several tasks.
pub struct ManualMatchResolver {
    ctx: SessionContext,
    debouncer: SearchDebouncer,
    inner: Mutex<ResolverInner>,
}

impl ManualMatchResolver {
    pub(crate) fn new(ctx: SessionContext) -> Self {
        let debouncer = SearchDebouncer::new(ctx.settings.search_debounce);
        Self {
            ctx,
            debouncer,
            inner: Mutex::new(ResolverInner::default()),
        }
    }

    /// Open the resolver against `candidate`.
    ///
    /// The query starts as the platform's own title. A candidate that is
    /// already matched has its current catalog entry pre-selected.
    pub fn open(&self, candidate: ImportCandidate) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.transition(ResolverPhase::Searching)?;

        inner.query = candidate.platform_name.clone();
        inner.selected = candidate.catalog_id.map(|catalog_id| CatalogMatch {
            catalog_id,
            name: candidate.display_name().to_string(),
            cover_url: candidate.catalog_cover_url.clone(),
            release_date: None,
        });
        inner.candidate = Some(candidate);
        Ok(())
    }

    /// Search the catalog for the query `open` seeded.
    pub async fn start(&self) -> Result<Option<Vec<CatalogMatch>>> {
        let query = self.inner.lock().query.clone();
        self.search(query).await
    }

    /// Search the catalog for `query` once the debounce delay passes.
    ///
    /// Returns `Ok(None)` when a newer search or a close superseded this one;
    /// its results are discarded and the resolver state is left to the newer
    /// call.
    #[instrument(skip(self, query), fields(session_id = %self.ctx.id))]
    pub async fn search(&self, query: impl Into<String>) -> Result<Option<Vec<CatalogMatch>>> {
        let query = query.into();
        {
            let mut inner = self.inner.lock();
            if inner.phase == ResolverPhase::Closed {
                return Err(SyncError::InvalidStateTransition {
                    from: inner.phase.as_str().to_string(),
                    to: ResolverPhase::Searching.as_str().to_string(),
                    reason: "Resolver must be opened against a candidate first".to_string(),
                });
            }
            inner.transition(ResolverPhase::Searching)?;
            inner.query = query.clone();
            inner.is_searching = true;
        }

        let catalog = self.ctx.catalog.clone();
        let limit = self.ctx.settings.search_limit;
        let outcome = self
            .debouncer
            .run(move || async move { catalog.search_games(&query, limit).await })
            .await;

        let Some(outcome) = outcome else {
            return Ok(None);
        };

        let mut inner = self.inner.lock();
        if inner.phase != ResolverPhase::Searching {
            return Ok(None);
        }
        inner.is_searching = false;
        match outcome {
            Ok(results) => {
                debug!(count = results.len(), "catalog search completed");
                inner.results = results.clone();
                inner.transition(ResolverPhase::Reviewing)?;
                Ok(Some(results))
            }
            Err(e) => {
                inner.results.clear();
                inner.transition(ResolverPhase::Reviewing)?;
                drop(inner);

                let error = SyncError::Catalog(e.to_string());
                self.ctx.report_failure("search", &error);
                Err(error)
            }
        }
    }

    /// Select `catalog_id` from the results, or deselect it if it already is.
    ///
    /// Returns the selection after the toggle.
    pub fn toggle(&self, catalog_id: u64) -> Result<Option<CatalogMatch>> {
        let mut inner = self.inner.lock();
        if !matches!(
            inner.phase,
            ResolverPhase::Searching | ResolverPhase::Reviewing
        ) {
            return Err(SyncError::InvalidStateTransition {
                from: inner.phase.as_str().to_string(),
                to: "toggle".to_string(),
                reason: "Resolver must be open to change the selection".to_string(),
            });
        }

        if inner
            .selected
            .as_ref()
            .is_some_and(|selected| selected.catalog_id == catalog_id)
        {
            inner.selected = None;
            return Ok(None);
        }

        let found = inner
            .results
            .iter()
            .find(|result| result.catalog_id == catalog_id)
            .cloned()
            .ok_or_else(|| SyncError::CandidateNotFound(format!("catalog {}", catalog_id)))?;
        inner.selected = Some(found.clone());
        Ok(Some(found))
    }

    /// Persist the selected match, then import the candidate.
    ///
    /// The candidate is held for both calls; confirming while another
    /// operation holds it fails with [`SyncError::Busy`].
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn confirm(&self) -> Result<ManualMatch> {
        let (manual_match, _claim) = {
            let mut inner = self.inner.lock();
            let (Some(candidate), Some(selected)) = (&inner.candidate, &inner.selected) else {
                return Err(SyncError::InvalidStateTransition {
                    from: inner.phase.as_str().to_string(),
                    to: ResolverPhase::Confirming.as_str().to_string(),
                    reason: "A catalog entry must be selected to confirm".to_string(),
                });
            };
            let manual_match = ManualMatch {
                platform_id: candidate.platform_id.clone(),
                catalog_id: selected.catalog_id,
                catalog_name: selected.name.clone(),
                catalog_cover_url: selected.cover_url.clone(),
            };
            let (_, claim) = self.ctx.claim(
                &manual_match.platform_id,
                &[Bucket::Ready, Bucket::Unmatched],
                "fixed",
            )?;
            inner.transition(ResolverPhase::Confirming)?;
            (manual_match, claim)
        };
        // Results still in flight belong to a query the user moved past.
        self.debouncer.invalidate();

        if let Err(e) = self.ctx.platform.set_manual_match(&manual_match).await {
            self.back_to_reviewing();
            let error = SyncError::action("save match", e);
            self.ctx.report_failure("fix match", &error);
            return Err(error);
        }

        self.ctx
            .store
            .dispatch(SyncAction::ApplyManualMatch(manual_match.clone()));
        self.ctx.emit(SyncEvent::MatchFixed {
            session_id: self.ctx.session_id(),
            platform_id: manual_match.platform_id.clone(),
            catalog_id: manual_match.catalog_id,
        });
        info!(
            platform_id = %manual_match.platform_id,
            catalog_id = manual_match.catalog_id,
            "Manual match saved"
        );

        let item = ImportItem {
            platform_id: manual_match.platform_id.clone(),
            catalog_id: manual_match.catalog_id,
            list_type: self.ctx.settings.list_type,
        };
        if let Err(e) = self
            .ctx
            .platform
            .import_many(std::slice::from_ref(&item))
            .await
        {
            self.back_to_reviewing();
            let error = SyncError::PartialCommitFailure {
                platform_id: manual_match.platform_id.clone(),
                catalog_id: manual_match.catalog_id,
                message: e.to_string(),
            };
            self.ctx.report_failure("import", &error);
            return Err(error);
        }

        self.ctx
            .store
            .dispatch(SyncAction::MarkImported(vec![manual_match.platform_id.clone()]));
        self.ctx.emit(SyncEvent::Imported {
            session_id: self.ctx.session_id(),
            count: 1,
        });
        self.ctx.notify(Notification::success(format!(
            "Imported {}",
            manual_match.catalog_name
        )));

        self.inner.lock().reset();
        Ok(manual_match)
    }

    /// Discard all resolver state. Pending searches never land.
    pub fn close(&self) {
        self.debouncer.invalidate();
        self.inner.lock().reset();
    }

    pub fn phase(&self) -> ResolverPhase {
        self.inner.lock().phase
    }

    pub fn view(&self) -> ResolverView {
        let inner = self.inner.lock();
        ResolverView {
            phase: inner.phase,
            candidate: inner.candidate.clone(),
            query: inner.query.clone(),
            results: inner.results.clone(),
            selected: inner.selected.clone(),
            is_searching: inner.is_searching,
        }
    }

    fn back_to_reviewing(&self) {
        let mut inner = self.inner.lock();
        if inner.phase == ResolverPhase::Confirming {
            inner.phase = ResolverPhase::Reviewing;
        }
    }
}

impl fmt::Debug for ManualMatchResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualMatchResolver")
            .field("session_id", &self.ctx.id)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{SessionId, SessionSettings};
    use crate::store::{Overlay, SyncStore};
    use crate::test_support::{context, server_error, MockCatalog, MockPlatform};
    use bridge_traits::error::BridgeError;
    use bridge_traits::library::MatchMethod;
    use core_runtime::events::EventBus;
    use mockall::Sequence;
    use std::sync::Arc;
    use std::time::Duration;

    fn game_x() -> CatalogMatch {
        CatalogMatch {
            catalog_id: 99,
            name: "Game X".to_string(),
            cover_url: Some("https://img.example/x.jpg".to_string()),
            release_date: Some("2019-03-01".to_string()),
        }
    }

    fn build_resolver(
        platform: MockPlatform,
        catalog: MockCatalog,
    ) -> (ManualMatchResolver, SyncStore) {
        let ctx = context(platform, catalog, vec![unmatched_p1()]);
        let store = ctx.store.clone();
        (ManualMatchResolver::new(ctx), store)
    }

    fn unmatched_p1() -> ImportCandidate {
        ImportCandidate::new("p1", "GAME X (PS4)")
    }

    fn catalog_returning(results: Vec<CatalogMatch>) -> MockCatalog {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_search_games()
            .returning(move |_, _| Ok(results.clone()));
        catalog
    }

    #[test]
    fn test_open_seeds_query_and_preselects_existing_match() {
        let (resolver, _store) = build_resolver(MockPlatform::new(), MockCatalog::new());
        let mut candidate = unmatched_p1();
        candidate.catalog_id = Some(7);
        candidate.catalog_name = Some("Old Guess".to_string());

        resolver.open(candidate).unwrap();

        let view = resolver.view();
        assert_eq!(view.phase, ResolverPhase::Searching);
        assert_eq!(view.query, "GAME X (PS4)");
        assert_eq!(view.selected.map(|s| s.catalog_id), Some(7));
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let (resolver, _store) = build_resolver(MockPlatform::new(), MockCatalog::new());
        resolver.open(unmatched_p1()).unwrap();

        let err = resolver.open(unmatched_p1()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_search_moves_to_reviewing() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_search_games()
            .withf(|query: &str, limit: &u32| query == "game x" && *limit == 10)
            .times(1)
            .returning(|_, _| Ok(vec![game_x()]));
        let (resolver, _store) = build_resolver(MockPlatform::new(), catalog);
        resolver.open(unmatched_p1()).unwrap();

        let results = resolver.search("game x").await.unwrap().unwrap();

        assert_eq!(results, vec![game_x()]);
        let view = resolver.view();
        assert_eq!(view.phase, ResolverPhase::Reviewing);
        assert!(!view.is_searching);
    }

    #[tokio::test]
    async fn test_search_before_open_is_rejected() {
        let (resolver, _store) = build_resolver(MockPlatform::new(), MockCatalog::new());
        let err = resolver.search("x").await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
    }

    #[tokio::test]
    async fn test_search_failure_is_surfaced() {
        let mut catalog = MockCatalog::new();
        catalog.expect_search_games().returning(|_, _| {
            Err(BridgeError::Api {
                status: 503,
                message: "catalog offline".to_string(),
            })
        });
        let (resolver, store) = build_resolver(MockPlatform::new(), catalog);
        resolver.open(unmatched_p1()).unwrap();

        let err = resolver.search("x").await.unwrap_err();

        assert!(matches!(err, SyncError::Catalog(_)));
        assert_eq!(resolver.phase(), ResolverPhase::Reviewing);
        assert!(store.read(|s| s.last_error.is_some()));
    }

    #[tokio::test]
    async fn test_toggle_selects_then_deselects() {
        let (resolver, _store) = build_resolver(MockPlatform::new(), catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game").await.unwrap();

        assert_eq!(resolver.toggle(99).unwrap(), Some(game_x()));
        assert_eq!(resolver.toggle(99).unwrap(), None);
        assert!(matches!(
            resolver.toggle(12345),
            Err(SyncError::CandidateNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_confirm_without_selection_is_rejected() {
        let (resolver, _store) = build_resolver(MockPlatform::new(), catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game").await.unwrap();

        let err = resolver.confirm().await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert_eq!(resolver.phase(), ResolverPhase::Reviewing);
    }

    #[tokio::test]
    async fn test_confirm_saves_match_then_imports() {
        let mut seq = Sequence::new();
        let mut platform = MockPlatform::new();
        platform
            .expect_set_manual_match()
            .withf(|m: &ManualMatch| {
                m.platform_id == "p1" && m.catalog_id == 99 && m.catalog_name == "Game X"
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        platform
            .expect_import_many()
            .withf(|items: &[ImportItem]| {
                items.len() == 1 && items[0].platform_id == "p1" && items[0].catalog_id == 99
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let (resolver, store) = build_resolver(platform, catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();

        let saved = resolver.confirm().await.unwrap();

        assert_eq!(saved.catalog_id, 99);
        assert_eq!(resolver.phase(), ResolverPhase::Closed);
        assert_eq!(resolver.view(), ResolverView::default());
        let state = store.snapshot();
        assert_eq!(state.overlay("p1"), Some(Overlay::ImportedLocally));
        let candidate = state.candidate("p1").unwrap();
        assert_eq!(candidate.catalog_id, Some(99));
        assert_eq!(candidate.match_method, Some(MatchMethod::Manual));
    }

    #[tokio::test]
    async fn test_import_failure_after_saved_match_is_partial_commit() {
        let mut platform = MockPlatform::new();
        platform
            .expect_set_manual_match()
            .times(1)
            .returning(|_| Ok(()));
        platform
            .expect_import_many()
            .times(1)
            .returning(|_| Err(server_error()));

        let (resolver, store) = build_resolver(platform, catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();

        let err = resolver.confirm().await.unwrap_err();

        assert!(matches!(
            err,
            SyncError::PartialCommitFailure { catalog_id: 99, .. }
        ));
        assert_eq!(resolver.phase(), ResolverPhase::Reviewing);
        let state = store.snapshot();
        assert_eq!(state.candidate("p1").unwrap().catalog_id, Some(99));
        assert_eq!(state.bucket_of("p1"), Some(Bucket::Ready));
        assert_eq!(state.overlay("p1"), None);
    }

    #[tokio::test]
    async fn test_failed_match_save_skips_import() {
        let mut platform = MockPlatform::new();
        platform.expect_set_manual_match().times(1).returning(|_| {
            Err(BridgeError::Api {
                status: 422,
                message: "bad match".to_string(),
            })
        });
        platform.expect_import_many().never();

        let (resolver, store) = build_resolver(platform, catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();

        let err = resolver.confirm().await.unwrap_err();

        assert!(matches!(err, SyncError::ActionFailure { .. }));
        assert_eq!(store.read(|s| s.candidate("p1").unwrap().catalog_id), None);
    }

    #[tokio::test]
    async fn test_start_searches_platform_title() {
        let mut catalog = MockCatalog::new();
        catalog
            .expect_search_games()
            .withf(|query: &str, _: &u32| query == "GAME X (PS4)")
            .times(1)
            .returning(|_, _| Ok(vec![game_x()]));
        let (resolver, _store) = build_resolver(MockPlatform::new(), catalog);
        resolver.open(unmatched_p1()).unwrap();

        let results = resolver.start().await.unwrap().unwrap();

        assert_eq!(results, vec![game_x()]);
        assert_eq!(resolver.phase(), ResolverPhase::Reviewing);
    }

    #[tokio::test]
    async fn test_confirm_rejected_while_candidate_is_held() {
        let mut platform = MockPlatform::new();
        platform.expect_set_manual_match().never();
        platform.expect_import_many().never();

        let (resolver, store) = build_resolver(platform, catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();
        store.dispatch(SyncAction::SetFading(vec!["p1".to_string()]));

        let err = resolver.confirm().await.unwrap_err();

        assert!(matches!(err, SyncError::Busy { .. }));
        assert_eq!(resolver.phase(), ResolverPhase::Reviewing);
        assert_eq!(resolver.view().selected.map(|s| s.catalog_id), Some(99));
    }

    #[tokio::test]
    async fn test_confirm_releases_candidate_after_partial_commit() {
        let mut platform = MockPlatform::new();
        platform
            .expect_set_manual_match()
            .times(1)
            .returning(|_| Ok(()));
        platform
            .expect_import_many()
            .times(1)
            .returning(|_| Err(server_error()));

        let (resolver, store) = build_resolver(platform, catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();

        assert!(resolver.confirm().await.is_err());
        assert!(store.read(|s| s.fading.is_empty()));
    }

    #[tokio::test]
    async fn test_close_discards_state_without_touching_store() {
        let (resolver, store) = build_resolver(MockPlatform::new(), catalog_returning(vec![game_x()]));
        resolver.open(unmatched_p1()).unwrap();
        resolver.search("game x").await.unwrap();
        resolver.toggle(99).unwrap();

        resolver.close();

        assert_eq!(resolver.view(), ResolverView::default());
        assert_eq!(store.read(|s| s.candidate("p1").unwrap().catalog_id), None);
        resolver.open(unmatched_p1()).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_pending_search() {
        let store = SyncStore::new();
        let ctx = SessionContext {
            id: SessionId::new(),
            store,
            platform: Arc::new(MockPlatform::new()),
            catalog: Arc::new(catalog_returning(vec![game_x()])),
            events: EventBus::new(8),
            settings: SessionSettings::default(),
        };
        let resolver = Arc::new(ManualMatchResolver::new(ctx));
        resolver.open(unmatched_p1()).unwrap();

        let pending = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.search("game").await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        resolver.close();

        assert_eq!(pending.await.unwrap().unwrap(), None);
        assert_eq!(resolver.view(), ResolverView::default());
    }
}
