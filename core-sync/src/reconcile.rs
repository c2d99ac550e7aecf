//! # Reconciliation Engine
//!
//! Pure classification and projection of a [`SyncState`] into what a review
//! screen shows: the sorted, filtered list for the active tab and per-tab
//! counts.
//!
//! Bucketing precedence:
//!
//! ```text
//! effective status imported        → no bucket
//! effective status hidden          → skipped
//! matched (catalog id present)     → ready
//! otherwise                        → unmatched
//! ```
//!
//! Counts are taken over the unfiltered buckets; the search text only
//! narrows the active tab's list.

use bridge_traits::library::{CandidateStatus, ImportCandidate};
use serde::Serialize;
use std::cmp::{Ordering, Reverse};

use crate::store::{Bucket, Overlay, Progress, SortKey, SyncState};

/// Overlay wins over the server status.
pub fn effective_status(status: CandidateStatus, overlay: Option<Overlay>) -> CandidateStatus {
    match overlay {
        Some(Overlay::ImportedLocally) => CandidateStatus::Imported,
        Some(Overlay::SkippedLocally) => CandidateStatus::Hidden,
        None => status,
    }
}

/// Bucket of one candidate, or `None` once it is imported.
pub fn bucket_of(candidate: &ImportCandidate, overlay: Option<Overlay>) -> Option<Bucket> {
    match effective_status(candidate.status, overlay) {
        CandidateStatus::Imported => None,
        CandidateStatus::Hidden => Some(Bucket::Skipped),
        CandidateStatus::Pending if candidate.is_matched() => Some(Bucket::Ready),
        CandidateStatus::Pending => Some(Bucket::Unmatched),
    }
}

/// Case-insensitive substring match on the platform or catalog name.
///
/// A blank query matches everything.
pub fn matches_search(candidate: &ImportCandidate, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }

    candidate.platform_name.to_lowercase().contains(&query)
        || candidate
            .catalog_name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(&query))
}

/// Sort in place. All policies are stable, so ties keep input order.
pub fn sort_candidates(candidates: &mut [&ImportCandidate], key: SortKey) {
    match key {
        SortKey::LastPlayed => candidates.sort_by(|a, b| {
            match (a.last_played_at, b.last_played_at) {
                (Some(a), Some(b)) => b.cmp(&a),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
        SortKey::PlaytimeDesc => {
            candidates.sort_by_key(|c| Reverse(c.playtime_minutes.unwrap_or(0)))
        }
        SortKey::NameAsc => candidates.sort_by_cached_key(|c| c.display_name().to_lowercase()),
    }
}

/// Tab badge counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BucketCounts {
    pub ready: usize,
    pub unmatched: usize,
    pub skipped: usize,
}

impl BucketCounts {
    pub fn total(&self) -> usize {
        self.ready + self.unmatched + self.skipped
    }
}

pub fn bucket_counts(state: &SyncState) -> BucketCounts {
    let mut counts = BucketCounts::default();
    for candidate in &state.candidates {
        match bucket_of(candidate, state.overlay(&candidate.platform_id)) {
            Some(Bucket::Ready) => counts.ready += 1,
            Some(Bucket::Unmatched) => counts.unmatched += 1,
            Some(Bucket::Skipped) => counts.skipped += 1,
            None => {}
        }
    }
    counts
}

/// Ids of every candidate in `bucket`, in collection order, ignoring search.
pub fn ids_in_bucket(state: &SyncState, bucket: Bucket) -> Vec<String> {
    state
        .candidates
        .iter()
        .filter(|c| bucket_of(c, state.overlay(&c.platform_id)) == Some(bucket))
        .map(|c| c.platform_id.clone())
        .collect()
}

fn visible(state: &SyncState) -> Vec<&ImportCandidate> {
    let mut items: Vec<&ImportCandidate> = state
        .candidates
        .iter()
        .filter(|c| bucket_of(c, state.overlay(&c.platform_id)) == Some(state.tab))
        .filter(|c| matches_search(c, &state.search))
        .collect();
    sort_candidates(&mut items, state.sort);
    items
}

/// Ids of the active tab's list after search and sort.
pub fn visible_ids(state: &SyncState) -> Vec<String> {
    visible(state)
        .into_iter()
        .map(|c| c.platform_id.clone())
        .collect()
}

/// One row of the active tab.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewItem {
    pub candidate: ImportCandidate,
    pub selected: bool,
    pub fading: bool,
}

/// Everything a review screen renders, derived from one state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub tab: Bucket,
    pub items: Vec<ReviewItem>,
    pub counts: BucketCounts,
    pub selected_count: usize,
    pub search: String,
    pub sort: SortKey,
    pub is_loading: bool,
    pub is_syncing: bool,
    pub is_processing: bool,
    pub progress: Progress,
    pub needs_sync: bool,
    pub last_error: Option<String>,
}

pub fn project(state: &SyncState) -> ReviewView {
    let items = visible(state)
        .into_iter()
        .map(|c| ReviewItem {
            candidate: c.clone(),
            selected: state.is_selected(&c.platform_id),
            fading: state.fading.contains(&c.platform_id),
        })
        .collect();

    ReviewView {
        tab: state.tab,
        items,
        counts: bucket_counts(state),
        selected_count: state.selection.len(),
        search: state.search.clone(),
        sort: state.sort,
        is_loading: state.is_loading,
        is_syncing: state.is_syncing,
        is_processing: state.is_processing,
        progress: state.progress,
        needs_sync: state.needs_sync,
        last_error: state.last_error.clone(),
    }
}
