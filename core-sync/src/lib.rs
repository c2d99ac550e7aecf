//! # Library Sync Review
//!
//! Reconciles a user's imported platform library against the catalog and
//! drives the triage that commits games into their collection.
//!
//! ## Overview
//!
//! A [`SyncReviewSession`] is created per review page. It loads the platform
//! library into a [`SyncStore`], and every change after that goes through
//! `dispatch`:
//!
//! - Single-item import, skip and restore on the session itself
//! - Batched import and sequential skip through [`BulkActionCoordinator`]
//! - Catalog search and match correction through [`ManualMatchResolver`]
//!
//! The screen renders a [`ReviewView`], a pure projection of the store state
//! computed by the [`reconcile`] functions.
//!
//! ## Components
//!
//! - **Store** (`store`): State, actions and the reducer that applies them
//! - **Reconciliation** (`reconcile`): Bucketing, search filter, sort and view projection
//! - **Bulk actions** (`bulk`): Batched import and sequential skip with progress
//! - **Resolver** (`resolver`): Manual match state machine
//! - **Debounce** (`debounce`): Latest-wins search timer
//! - **Session** (`session`): Page controller tying the above together

pub mod bulk;
pub mod context;
pub mod debounce;
pub mod error;
pub mod reconcile;
pub mod resolver;
pub mod session;
pub mod store;

#[cfg(test)]
mod test_support;

pub use bulk::{BulkActionCoordinator, BulkOutcome};
pub use context::{SessionId, SessionSettings};
pub use debounce::SearchDebouncer;
pub use error::{Result, SyncError};
pub use reconcile::{BucketCounts, ReviewItem, ReviewView};
pub use resolver::{ManualMatchResolver, ResolverPhase, ResolverView};
pub use session::{LoadOutcome, ResyncOutcome, SyncReviewSession};
pub use store::{Bucket, Overlay, Progress, SortKey, SyncAction, SyncState, SyncStore};
