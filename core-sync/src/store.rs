//! # Sync State Store
//!
//! Single source of truth for one review session.
//!
//! ## Overview
//!
//! [`SyncState`] is plain data. It changes only through
//! [`SyncState::apply`], which folds one [`SyncAction`] into the state the
//! way a reducer would. [`SyncStore`] wraps the state in a shared lock so the
//! session, the bulk coordinator and the match resolver all write through the
//! same `dispatch` entry point and read frozen snapshots.
//!
//! The lock is only held for the duration of a single `apply`; no caller may
//! hold it across an `.await`.
//!
//! ## Overlays
//!
//! Optimistic updates are recorded as one [`Overlay`] per platform id, so a
//! candidate can never be locally imported and locally skipped at once. Every
//! library load drops all overlays; the server status is authoritative again.

use bridge_traits::library::{CandidateStatus, ImportCandidate, ManualMatch, MatchMethod};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::trace;

use crate::error::SyncError;
use crate::reconcile;

// ============================================================================
// View Types
// ============================================================================

/// Client-side annotation layered over the server status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    ImportedLocally,
    SkippedLocally,
}

/// Triage bucket of a candidate. Derived on demand, never stored per item.
///
/// The active tab is expressed as a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    #[default]
    Ready,
    Unmatched,
    Skipped,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Ready, Bucket::Unmatched, Bucket::Skipped];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Ready => "ready",
            Bucket::Unmatched => "unmatched",
            Bucket::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort policy for the active tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Most recently played first, never-played last
    #[default]
    LastPlayed,
    /// Longest playtime first, missing playtime counts as zero
    PlaytimeDesc,
    /// Display name, case-folded ascending
    NameAsc,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::LastPlayed => "last_played",
            SortKey::PlaytimeDesc => "playtime_desc",
            SortKey::NameAsc => "name_asc",
        }
    }
}

impl FromStr for SortKey {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "last_played" | "lastPlayed" => Ok(SortKey::LastPlayed),
            "playtime_desc" | "playtimeDesc" => Ok(SortKey::PlaytimeDesc),
            "name_asc" | "nameAsc" => Ok(SortKey::NameAsc),
            other => Err(SyncError::InvalidStateTransition {
                from: "sort".to_string(),
                to: other.to_string(),
                reason: "unknown sort key".to_string(),
            }),
        }
    }
}

/// Bulk operation progress. `total == 0` means no operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

// ============================================================================
// State
// ============================================================================

/// Complete review state for one session.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
    pub candidates: Vec<ImportCandidate>,
    pub overlays: HashMap<String, Overlay>,
    /// Selected platform ids in selection order
    pub selection: Vec<String>,
    /// Ids an operation is committing. Each id is held by at most one
    /// operation; the screen fades these rows.
    pub fading: HashSet<String>,
    pub tab: Bucket,
    pub search: String,
    pub sort: SortKey,
    /// A load is outstanding, silent or not
    pub load_in_flight: bool,
    /// A visible (non-silent) load is outstanding
    pub is_loading: bool,
    pub is_syncing: bool,
    pub is_processing: bool,
    pub progress: Progress,
    /// The last load came back empty: the platform has never been synced
    pub needs_sync: bool,
    pub last_error: Option<String>,
}

/// Every way the review state can change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncAction {
    LoadStarted { silent: bool },
    LibraryLoaded(Vec<ImportCandidate>),
    LoadFinished,
    SyncStarted,
    SyncFinished,
    ProcessingStarted { total: usize },
    ProgressAdvanced { current: usize },
    ProcessingFinished,
    MarkImported(Vec<String>),
    MarkSkipped(String),
    Restore(String),
    ApplyManualMatch(ManualMatch),
    SetFading(Vec<String>),
    ClearFading(Vec<String>),
    SetTab(Bucket),
    SetSearch(String),
    SetSort(SortKey),
    ToggleSelection(String),
    SelectAllVisible,
    Deselect(Vec<String>),
    ClearSelection,
    Failed(String),
    DismissError,
}

impl SyncAction {
    /// Short name used in traces.
    pub fn name(&self) -> &'static str {
        match self {
            SyncAction::LoadStarted { .. } => "load_started",
            SyncAction::LibraryLoaded(_) => "library_loaded",
            SyncAction::LoadFinished => "load_finished",
            SyncAction::SyncStarted => "sync_started",
            SyncAction::SyncFinished => "sync_finished",
            SyncAction::ProcessingStarted { .. } => "processing_started",
            SyncAction::ProgressAdvanced { .. } => "progress_advanced",
            SyncAction::ProcessingFinished => "processing_finished",
            SyncAction::MarkImported(_) => "mark_imported",
            SyncAction::MarkSkipped(_) => "mark_skipped",
            SyncAction::Restore(_) => "restore",
            SyncAction::ApplyManualMatch(_) => "apply_manual_match",
            SyncAction::SetFading(_) => "set_fading",
            SyncAction::ClearFading(_) => "clear_fading",
            SyncAction::SetTab(_) => "set_tab",
            SyncAction::SetSearch(_) => "set_search",
            SyncAction::SetSort(_) => "set_sort",
            SyncAction::ToggleSelection(_) => "toggle_selection",
            SyncAction::SelectAllVisible => "select_all_visible",
            SyncAction::Deselect(_) => "deselect",
            SyncAction::ClearSelection => "clear_selection",
            SyncAction::Failed(_) => "failed",
            SyncAction::DismissError => "dismiss_error",
        }
    }
}

impl SyncState {
    pub fn candidate(&self, platform_id: &str) -> Option<&ImportCandidate> {
        self.candidates
            .iter()
            .find(|c| c.platform_id == platform_id)
    }

    fn candidate_mut(&mut self, platform_id: &str) -> Option<&mut ImportCandidate> {
        self.candidates
            .iter_mut()
            .find(|c| c.platform_id == platform_id)
    }

    pub fn overlay(&self, platform_id: &str) -> Option<Overlay> {
        self.overlays.get(platform_id).copied()
    }

    /// Bucket of a candidate in this state, `None` once imported or unknown.
    pub fn bucket_of(&self, platform_id: &str) -> Option<Bucket> {
        self.candidate(platform_id)
            .and_then(|c| reconcile::bucket_of(c, self.overlay(platform_id)))
    }

    pub fn is_selected(&self, platform_id: &str) -> bool {
        self.selection.iter().any(|id| id == platform_id)
    }

    fn deselect(&mut self, ids: &[String]) {
        self.selection.retain(|id| !ids.contains(id));
    }

    /// Fold one action into the state.
    pub fn apply(&mut self, action: SyncAction) {
        match action {
            SyncAction::LoadStarted { silent } => {
                self.load_in_flight = true;
                self.is_loading = !silent;
            }
            SyncAction::LibraryLoaded(candidates) => {
                self.needs_sync = candidates.is_empty();
                self.candidates = candidates;
                self.overlays.clear();
                self.selection.clear();
                self.fading.clear();
            }
            SyncAction::LoadFinished => {
                self.load_in_flight = false;
                self.is_loading = false;
            }
            SyncAction::SyncStarted => self.is_syncing = true,
            SyncAction::SyncFinished => self.is_syncing = false,
            SyncAction::ProcessingStarted { total } => {
                self.is_processing = true;
                self.progress = Progress { current: 0, total };
            }
            SyncAction::ProgressAdvanced { current } => {
                self.progress.current = current.min(self.progress.total);
            }
            SyncAction::ProcessingFinished => {
                self.is_processing = false;
                self.progress = Progress::default();
            }
            SyncAction::MarkImported(ids) => {
                for id in &ids {
                    if self.candidate(id).is_some() {
                        self.overlays.insert(id.clone(), Overlay::ImportedLocally);
                    }
                }
                self.deselect(&ids);
            }
            SyncAction::MarkSkipped(id) => {
                if self.candidate(&id).is_some() {
                    self.overlays.insert(id.clone(), Overlay::SkippedLocally);
                }
                self.deselect(std::slice::from_ref(&id));
            }
            SyncAction::Restore(id) => {
                self.overlays.remove(&id);
                if let Some(candidate) = self.candidate_mut(&id) {
                    if candidate.status == CandidateStatus::Hidden {
                        candidate.status = CandidateStatus::Pending;
                    }
                    if candidate.match_method == Some(MatchMethod::Skipped) {
                        candidate.match_method = None;
                    }
                }
                self.deselect(std::slice::from_ref(&id));
            }
            SyncAction::ApplyManualMatch(manual_match) => {
                if let Some(candidate) = self.candidate_mut(&manual_match.platform_id) {
                    candidate.catalog_id = Some(manual_match.catalog_id);
                    candidate.catalog_name = Some(manual_match.catalog_name);
                    candidate.catalog_cover_url = manual_match.catalog_cover_url;
                    candidate.match_confidence = Some(1.0);
                    candidate.match_method = Some(MatchMethod::Manual);
                }
            }
            SyncAction::SetFading(ids) => self.fading.extend(ids),
            SyncAction::ClearFading(ids) => {
                for id in &ids {
                    self.fading.remove(id);
                }
            }
            SyncAction::SetTab(tab) => {
                self.tab = tab;
                self.selection.clear();
            }
            SyncAction::SetSearch(search) => self.search = search,
            SyncAction::SetSort(sort) => self.sort = sort,
            SyncAction::ToggleSelection(id) => {
                if self.is_selected(&id) {
                    self.deselect(std::slice::from_ref(&id));
                } else if self.bucket_of(&id) == Some(self.tab) && !self.fading.contains(&id) {
                    self.selection.push(id);
                }
            }
            SyncAction::SelectAllVisible => {
                for id in reconcile::visible_ids(self) {
                    if !self.is_selected(&id) && !self.fading.contains(&id) {
                        self.selection.push(id);
                    }
                }
            }
            SyncAction::Deselect(ids) => self.deselect(&ids),
            SyncAction::ClearSelection => self.selection.clear(),
            SyncAction::Failed(message) => self.last_error = Some(message),
            SyncAction::DismissError => self.last_error = None,
        }
    }
}

// ============================================================================
// Store Handle
// ============================================================================

/// Shared handle to a session's [`SyncState`].
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct SyncStore {
    state: Arc<RwLock<SyncState>>,
}

impl SyncStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one action.
    pub fn dispatch(&self, action: SyncAction) {
        trace!(action = action.name(), "dispatch");
        self.state.write().apply(action);
    }

    /// Apply `action` unless `busy` holds for the current state.
    ///
    /// The check and the update happen under one write lock. Returns whether
    /// the action was applied.
    pub fn dispatch_unless<F>(&self, busy: F, action: SyncAction) -> bool
    where
        F: FnOnce(&SyncState) -> bool,
    {
        let mut state = self.state.write();
        if busy(&state) {
            trace!(action = action.name(), "dispatch skipped, operation busy");
            return false;
        }
        state.apply(action);
        true
    }

    /// Decide on the current state and apply the actions that decision
    /// yields, all under one write lock.
    ///
    /// Nothing is applied when `f` fails.
    pub fn transact<R, E, F>(&self, f: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&SyncState) -> std::result::Result<(R, Vec<SyncAction>), E>,
    {
        let mut state = self.state.write();
        let (value, actions) = f(&state)?;
        for action in actions {
            trace!(action = action.name(), "dispatch");
            state.apply(action);
        }
        Ok(value)
    }

    /// Read from the current state without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&SyncState) -> R) -> R {
        f(&self.state.read())
    }

    /// Frozen copy of the current state.
    pub fn snapshot(&self) -> SyncState {
        self.state.read().clone()
    }
}

impl fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|state| {
            f.debug_struct("SyncStore")
                .field("candidates", &state.candidates.len())
                .field("tab", &state.tab)
                .field("is_processing", &state.is_processing)
                .finish()
        })
    }
}

/// Dispatches an action when dropped.
///
/// Used to clear busy flags on every exit path of an async operation,
/// including early returns and errors.
pub(crate) struct DispatchOnDrop {
    store: SyncStore,
    action: Option<SyncAction>,
}

impl DispatchOnDrop {
    pub(crate) fn new(store: SyncStore, action: SyncAction) -> Self {
        Self {
            store,
            action: Some(action),
        }
    }
}

impl std::fmt::Debug for DispatchOnDrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchOnDrop")
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl Drop for DispatchOnDrop {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            self.store.dispatch(action);
        }
    }
}
