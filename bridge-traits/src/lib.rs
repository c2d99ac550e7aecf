//! # Host Bridge Traits
//!
//! Contracts between the library-sync core and everything outside it.
//!
//! ## Overview
//!
//! The core never talks to the network, the catalog or the host logger
//! directly. Each capability is a trait defined here and implemented by a
//! separate crate:
//!
//! | Trait | Implementations |
//! |-------|-----------------|
//! | [`HttpClient`](http::HttpClient) | `bridge-desktop` (`reqwest`) |
//! | [`LibraryPlatform`](library::LibraryPlatform) | `provider-steam`, `provider-playstation` |
//! | [`CatalogSearch`](catalog::CatalogSearch) | `core-catalog` |
//! | [`LoggerSink`](log::LoggerSink) | host supplied, [`ConsoleLogger`](log::ConsoleLogger) |
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! convert their own error shapes into it, so callers only ever match on one
//! taxonomy. A missing platform account link is reported as
//! [`BridgeError::NotLinked`](error::BridgeError::NotLinked).
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so handles can be shared across
//! async tasks behind `Arc`.

pub mod catalog;
pub mod error;
pub mod http;
pub mod library;
pub mod log;

pub use error::BridgeError;

// Re-export commonly used types
pub use catalog::{CatalogMatch, CatalogSearch};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use library::{
    CandidateStatus, ImportCandidate, ImportItem, LibraryPlatform, ListType, ManualMatch,
    MatchMethod, PlatformKind, ResyncSummary,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
