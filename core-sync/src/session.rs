//! # Review Session
//!
//! Page-level controller for reviewing one platform's imported library.
//!
//! A [`SyncReviewSession`] owns the [`SyncStore`] and the collaborators every
//! operation needs, and hands out the [`BulkActionCoordinator`] and
//! [`ManualMatchResolver`] wired to the same store. Nothing is global: each
//! session is explicitly constructed and dropped with its page.
//!
//! ## Failure policy
//!
//! Every operation catches platform errors at the call site, records them as
//! the session's dismissible error and emits a notification. A missing
//! account link during load or resync is not a failure; it yields an empty
//! library with `needs_sync` set.
//!
//! ## One operation per candidate
//!
//! Import, skip, restore, manual match confirm and bulk actions hold the ids
//! they commit (the store's `fading` set) until they finish or are dropped.
//! An action on an id that is already held fails with [`SyncError::Busy`].
//!
//! ## Example
//!
//! ```ignore
//! let session = SyncReviewSession::new(platform, catalog, events, SessionSettings::default());
//! session.load(false).await?;
//! session.set_tab(Bucket::Unmatched);
//! let resolver = session.fix_match("p1").await?;
//! resolver.search("hollow knight").await?;
//! ```

use bridge_traits::catalog::CatalogSearch;
use bridge_traits::library::{
    ImportItem, LibraryPlatform, PlatformKind, ResyncSummary,
};
use core_runtime::events::{EventBus, Notification, SyncEvent};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::bulk::BulkActionCoordinator;
use crate::context::{self, SessionContext, SessionId, SessionSettings};
use crate::error::{Result, SyncError};
use crate::reconcile::{self, ReviewView};
use crate::resolver::ManualMatchResolver;
use crate::store::{Bucket, DispatchOnDrop, SortKey, SyncAction, SyncStore};

/// What a call to [`SyncReviewSession::load`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The library snapshot replaced the session state
    Loaded { count: usize },
    /// No account is linked; the session shows an empty library
    NotLinked,
    /// Another load was outstanding, nothing was fetched
    Suppressed,
}

/// What a call to [`SyncReviewSession::resync`] did
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResyncOutcome {
    /// The platform re-read the library and the session reloaded it
    Synced(ResyncSummary),
    /// No account is linked; the session shows an empty library
    NotLinked,
}

pub struct SyncReviewSession {
    ctx: SessionContext,
}

impl SyncReviewSession {
    pub fn new(
        platform: Arc<dyn LibraryPlatform>,
        catalog: Arc<dyn CatalogSearch>,
        events: EventBus,
        settings: SessionSettings,
    ) -> Self {
        let ctx = SessionContext {
            id: SessionId::new(),
            store: SyncStore::new(),
            platform,
            catalog,
            events,
            settings,
        };
        info!(
            session_id = %ctx.id,
            platform = %ctx.platform.kind(),
            "Review session created"
        );
        Self { ctx }
    }

    pub fn id(&self) -> SessionId {
        self.ctx.id
    }

    /// Handle to the session's store, for subscribers that render snapshots.
    pub fn store(&self) -> SyncStore {
        self.ctx.store.clone()
    }

    pub fn platform_kind(&self) -> PlatformKind {
        self.ctx.platform.kind()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.ctx.settings
    }

    pub fn events(&self) -> &EventBus {
        &self.ctx.events
    }

    // ------------------------------------------------------------------------
    // Library
    // ------------------------------------------------------------------------

    /// Fetch the library and replace the session state with it.
    ///
    /// A silent load keeps the loading indicator off; it is used to refresh
    /// after a resync. Only one load runs at a time; overlapping calls return
    /// [`LoadOutcome::Suppressed`]. On failure the previous library stays.
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn load(&self, silent: bool) -> Result<LoadOutcome> {
        let started = self.ctx.store.dispatch_unless(
            |state| state.load_in_flight,
            SyncAction::LoadStarted { silent },
        );
        if !started {
            debug!("Load already outstanding, suppressing");
            return Ok(LoadOutcome::Suppressed);
        }
        let _loading = DispatchOnDrop::new(self.ctx.store.clone(), SyncAction::LoadFinished);

        let fetched = self
            .ctx
            .platform
            .fetch_library(self.ctx.settings.include_hidden)
            .await;

        let (candidates, outcome) = match fetched {
            Ok(candidates) => {
                let count = candidates.len();
                (candidates, LoadOutcome::Loaded { count })
            }
            Err(e) if e.is_not_linked() => {
                info!(platform = %self.platform_kind(), "Account not linked, showing empty library");
                (Vec::new(), LoadOutcome::NotLinked)
            }
            Err(e) => {
                let error = SyncError::FetchFailure(e.to_string());
                self.ctx.report_failure("load", &error);
                return Err(error);
            }
        };

        let count = candidates.len();
        self.ctx.store.dispatch(SyncAction::LibraryLoaded(candidates));
        let needs_sync = self.ctx.store.read(|state| state.needs_sync);
        self.ctx.emit(SyncEvent::LibraryLoaded {
            session_id: self.ctx.session_id(),
            platform: self.platform_kind().to_string(),
            candidates: count,
            needs_sync,
        });
        info!(count, needs_sync, "Library loaded");

        Ok(outcome)
    }

    /// Ask the platform to re-read the external library, then reload quietly.
    ///
    /// Existing candidates are left untouched when the resync fails. An
    /// account that is not linked empties the library and sets `needs_sync`
    /// without reporting an error.
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn resync(&self) -> Result<ResyncOutcome> {
        let started = self
            .ctx
            .store
            .dispatch_unless(|state| state.is_syncing, SyncAction::SyncStarted);
        if !started {
            return Err(SyncError::busy("Sync"));
        }
        let _syncing = DispatchOnDrop::new(self.ctx.store.clone(), SyncAction::SyncFinished);

        let kind = self.platform_kind();
        self.ctx.emit(SyncEvent::ResyncStarted {
            session_id: self.ctx.session_id(),
            platform: kind.to_string(),
        });

        let summary = match self.ctx.platform.resync().await {
            Ok(summary) => summary,
            Err(e) if e.is_not_linked() => {
                info!(platform = %kind, "Account not linked, showing empty library");
                self.ctx.store.dispatch(SyncAction::LibraryLoaded(Vec::new()));
                self.ctx.emit(SyncEvent::LibraryLoaded {
                    session_id: self.ctx.session_id(),
                    platform: kind.to_string(),
                    candidates: 0,
                    needs_sync: true,
                });
                return Ok(ResyncOutcome::NotLinked);
            }
            Err(e) => {
                let error = SyncError::SyncFailure(e.to_string());
                self.ctx.report_failure("resync", &error);
                return Err(error);
            }
        };

        info!(new_count = summary.new_count, "Resync completed");
        self.ctx.emit(SyncEvent::ResyncCompleted {
            session_id: self.ctx.session_id(),
            platform: kind.to_string(),
            new_count: summary.new_count,
        });
        let message = match summary.new_count {
            0 => format!("{} library is up to date", kind.display_name()),
            1 => "Found 1 new game".to_string(),
            n => format!("Found {} new games", n),
        };
        self.ctx.notify(Notification::success(message));

        self.load(true).await?;
        Ok(ResyncOutcome::Synced(summary))
    }

    // ------------------------------------------------------------------------
    // Single-item actions
    // ------------------------------------------------------------------------

    /// Import one ready candidate.
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn import_one(&self, platform_id: &str) -> Result<()> {
        let (candidate, _claim) = self.ctx.claim(platform_id, &[Bucket::Ready], "imported")?;
        let Some(catalog_id) = candidate.catalog_id else {
            return Err(SyncError::CandidateNotFound(platform_id.to_string()));
        };
        let ids = vec![platform_id.to_string()];
        let item = ImportItem {
            platform_id: platform_id.to_string(),
            catalog_id,
            list_type: self.ctx.settings.list_type,
        };

        let result = self
            .ctx
            .platform
            .import_many(std::slice::from_ref(&item))
            .await;
        if let Err(e) = result {
            let error = SyncError::action("import game", e);
            self.ctx.report_failure("import", &error);
            return Err(error);
        }

        self.ctx.store.dispatch(SyncAction::MarkImported(ids.clone()));
        self.ctx.store.dispatch(SyncAction::Deselect(ids));
        self.ctx.emit(SyncEvent::Imported {
            session_id: self.ctx.session_id(),
            count: 1,
        });
        self.ctx.notify(Notification::success(format!(
            "Imported {}",
            candidate.display_name()
        )));
        Ok(())
    }

    /// Hide one ready or unmatched candidate from triage.
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn skip_one(&self, platform_id: &str) -> Result<()> {
        let (candidate, _claim) = self.ctx.claim(
            platform_id,
            &[Bucket::Ready, Bucket::Unmatched],
            "skipped",
        )?;

        if let Err(e) = self.ctx.platform.skip(platform_id).await {
            let error = SyncError::action("skip game", e);
            self.ctx.report_failure("skip", &error);
            return Err(error);
        }

        self.ctx
            .store
            .dispatch(SyncAction::MarkSkipped(platform_id.to_string()));
        self.ctx
            .store
            .dispatch(SyncAction::Deselect(vec![platform_id.to_string()]));
        self.ctx.emit(SyncEvent::Skipped {
            session_id: self.ctx.session_id(),
            count: 1,
        });
        self.ctx.notify(Notification::info(format!(
            "Skipped {}",
            candidate.display_name()
        )));
        Ok(())
    }

    /// Bring a skipped candidate back into triage.
    #[instrument(skip(self), fields(session_id = %self.ctx.id))]
    pub async fn restore(&self, platform_id: &str) -> Result<()> {
        let (candidate, _claim) = self.ctx.claim(platform_id, &[Bucket::Skipped], "restored")?;

        if let Err(e) = self.ctx.platform.restore(platform_id).await {
            let error = SyncError::action("restore game", e);
            self.ctx.report_failure("restore", &error);
            return Err(error);
        }

        self.ctx
            .store
            .dispatch(SyncAction::Restore(platform_id.to_string()));
        self.ctx
            .store
            .dispatch(SyncAction::Deselect(vec![platform_id.to_string()]));
        self.ctx.emit(SyncEvent::Restored {
            session_id: self.ctx.session_id(),
            platform_id: platform_id.to_string(),
        });
        self.ctx.notify(Notification::success(format!(
            "Restored {}",
            candidate.display_name()
        )));
        Ok(())
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    /// Switch tabs. Selection never carries across tabs.
    pub fn set_tab(&self, tab: Bucket) {
        self.ctx.store.dispatch(SyncAction::SetTab(tab));
    }

    pub fn set_search(&self, search: impl Into<String>) {
        self.ctx.store.dispatch(SyncAction::SetSearch(search.into()));
    }

    pub fn set_sort(&self, sort: SortKey) {
        self.ctx.store.dispatch(SyncAction::SetSort(sort));
    }

    pub fn toggle_selection(&self, platform_id: &str) {
        self.ctx
            .store
            .dispatch(SyncAction::ToggleSelection(platform_id.to_string()));
    }

    pub fn select_all_visible(&self) {
        self.ctx.store.dispatch(SyncAction::SelectAllVisible);
    }

    pub fn clear_selection(&self) {
        self.ctx.store.dispatch(SyncAction::ClearSelection);
    }

    pub fn dismiss_error(&self) {
        self.ctx.store.dispatch(SyncAction::DismissError);
    }

    /// Project the current state into what the review screen renders.
    pub fn view(&self) -> ReviewView {
        self.ctx.store.read(reconcile::project)
    }

    // ------------------------------------------------------------------------
    // Helpers handed to the page
    // ------------------------------------------------------------------------

    pub fn bulk(&self) -> BulkActionCoordinator {
        BulkActionCoordinator::new(self.ctx.clone())
    }

    /// Open a manual match resolver against one actionable candidate and run
    /// the first catalog search for its platform title.
    ///
    /// A failed first search is reported like any other search failure; the
    /// resolver is still handed out so the user can try another query.
    pub async fn fix_match(&self, platform_id: &str) -> Result<ManualMatchResolver> {
        let allowed = [Bucket::Ready, Bucket::Unmatched];
        let candidate = self
            .ctx
            .store
            .read(|state| context::actionable(state, platform_id, &allowed, "fixed"))?;
        let resolver = ManualMatchResolver::new(self.ctx.clone());
        resolver.open(candidate)?;
        if let Err(e) = resolver.start().await {
            debug!(error = %e, "Initial catalog search failed");
        }
        Ok(resolver)
    }
}

impl fmt::Debug for SyncReviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncReviewSession")
            .field("id", &self.ctx.id)
            .field("platform", &self.ctx.platform.kind())
            .field("store", &self.ctx.store)
            .finish()
    }
}
