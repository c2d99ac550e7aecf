//! Platform Library Abstractions
//!
//! Shared data model for titles discovered on an external game platform and
//! the `LibraryPlatform` contract every platform binding implements.
//!
//! ## Overview
//!
//! A binding is selected once, by [`PlatformKind`], and callers never branch on
//! the platform afterwards. Bindings own no state beyond their configuration;
//! they translate the backend's per-platform records into [`ImportCandidate`]
//! and their own error shapes into [`BridgeError`](crate::error::BridgeError).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{BridgeError, Result};

/// External platforms that can feed a library import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    Steam,
    #[serde(rename = "psn")]
    PlayStation,
}

impl PlatformKind {
    /// Route segment used by the backend (`/{platform}/library`).
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKind::Steam => "steam",
            PlatformKind::PlayStation => "psn",
        }
    }

    /// Human readable platform name for notifications.
    pub fn display_name(&self) -> &'static str {
        match self {
            PlatformKind::Steam => "Steam",
            PlatformKind::PlayStation => "PlayStation",
        }
    }
}

impl FromStr for PlatformKind {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "steam" => Ok(PlatformKind::Steam),
            "psn" | "playstation" => Ok(PlatformKind::PlayStation),
            other => Err(BridgeError::NotAvailable(format!(
                "Unknown platform: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Server-authoritative lifecycle status of a candidate.
///
/// `Hidden` is how the backend represents a skipped title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Imported,
    Hidden,
}

/// How a candidate got associated with a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMethod {
    Automatic,
    Manual,
    Skipped,
}

/// One title discovered on the external platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportCandidate {
    /// Stable id from the external platform, never reused
    pub platform_id: String,
    /// Resolved identifier into the application's catalog
    pub catalog_id: Option<u64>,
    /// Title as reported by the external platform
    pub platform_name: String,
    pub catalog_name: Option<String>,
    pub catalog_cover_url: Option<String>,
    pub playtime_minutes: Option<u64>,
    pub last_played_at: Option<DateTime<Utc>>,
    /// Free-form subgroup label (e.g. console generation)
    pub platform_category: Option<String>,
    /// Match confidence in `0.0..=1.0`
    pub match_confidence: Option<f32>,
    pub match_method: Option<MatchMethod>,
    pub status: CandidateStatus,
}

impl ImportCandidate {
    /// Create an unmatched, pending candidate.
    pub fn new(platform_id: impl Into<String>, platform_name: impl Into<String>) -> Self {
        Self {
            platform_id: platform_id.into(),
            catalog_id: None,
            platform_name: platform_name.into(),
            catalog_name: None,
            catalog_cover_url: None,
            playtime_minutes: None,
            last_played_at: None,
            platform_category: None,
            match_confidence: None,
            match_method: None,
            status: CandidateStatus::Pending,
        }
    }

    /// A candidate is matched iff it carries a catalog id.
    pub fn is_matched(&self) -> bool {
        self.catalog_id.is_some()
    }

    /// Confidence and method, only when the candidate is matched.
    pub fn match_info(&self) -> Option<(Option<f32>, Option<MatchMethod>)> {
        self.is_matched()
            .then_some((self.match_confidence, self.match_method))
    }

    /// Catalog name when matched, otherwise the platform's own title.
    pub fn display_name(&self) -> &str {
        self.catalog_name.as_deref().unwrap_or(&self.platform_name)
    }
}

/// Collection list an imported title lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    #[default]
    Played,
    Playing,
    Backlog,
    Wishlist,
}

impl FromStr for ListType {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "played" => Ok(ListType::Played),
            "playing" => Ok(ListType::Playing),
            "backlog" => Ok(ListType::Backlog),
            "wishlist" => Ok(ListType::Wishlist),
            other => Err(BridgeError::NotAvailable(format!(
                "Unknown list type: {}",
                other
            ))),
        }
    }
}

/// One entry of a batched import request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportItem {
    pub platform_id: String,
    pub catalog_id: u64,
    pub list_type: ListType,
}

/// A user-confirmed catalog association for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMatch {
    pub platform_id: String,
    pub catalog_id: u64,
    pub catalog_name: String,
    pub catalog_cover_url: Option<String>,
}

/// Result of a platform resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResyncSummary {
    pub new_count: u32,
}

/// Returns true when a backend message signals a missing account link.
///
/// The backend has no dedicated status code for this; it is recognized by
/// the wording of the error detail.
pub fn is_not_linked_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not linked") || lower.contains("account linked")
}

/// Uniform contract over an external game platform library.
///
/// Only [`resync`](LibraryPlatform::resync) may add or remove candidates
/// outright; every other operation mutates existing candidates' match or
/// status fields.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::library::LibraryPlatform;
///
/// async fn pending_titles(platform: &dyn LibraryPlatform) -> Result<usize> {
///     let library = platform.fetch_library(false).await?;
///     Ok(library.len())
/// }
/// ```
#[async_trait]
pub trait LibraryPlatform: Send + Sync {
    /// Platform this binding talks to
    fn kind(&self) -> PlatformKind;

    /// Fetch the cached library snapshot
    async fn fetch_library(&self, include_hidden: bool) -> Result<Vec<ImportCandidate>>;

    /// Ask the backend to re-read the external library
    async fn resync(&self) -> Result<ResyncSummary>;

    /// Import several items in a single batched call
    async fn import_many(&self, items: &[ImportItem]) -> Result<()>;

    /// Hide one candidate from triage
    async fn skip(&self, platform_id: &str) -> Result<()>;

    /// Undo a previous skip
    async fn restore(&self, platform_id: &str) -> Result<()>;

    /// Persist a manual catalog match so future resyncs remember it
    async fn set_manual_match(&self, manual_match: &ManualMatch) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_kind_round_trip() {
        assert_eq!("steam".parse::<PlatformKind>().unwrap(), PlatformKind::Steam);
        assert_eq!("PSN".parse::<PlatformKind>().unwrap(), PlatformKind::PlayStation);
        assert_eq!(
            "playstation".parse::<PlatformKind>().unwrap(),
            PlatformKind::PlayStation
        );
        assert!("xbox".parse::<PlatformKind>().is_err());
        assert_eq!(PlatformKind::PlayStation.to_string(), "psn");
    }

    #[test]
    fn test_match_info_only_when_matched() {
        let mut candidate = ImportCandidate::new("p1", "Hollow Knight");
        candidate.match_confidence = Some(0.4);
        assert_eq!(candidate.match_info(), None);

        candidate.catalog_id = Some(42);
        candidate.match_method = Some(MatchMethod::Automatic);
        assert_eq!(
            candidate.match_info(),
            Some((Some(0.4), Some(MatchMethod::Automatic)))
        );
    }

    #[test]
    fn test_display_name_prefers_catalog_name() {
        let mut candidate = ImportCandidate::new("p1", "HOLLOW KNIGHT (PS4)");
        assert_eq!(candidate.display_name(), "HOLLOW KNIGHT (PS4)");

        candidate.catalog_name = Some("Hollow Knight".to_string());
        assert_eq!(candidate.display_name(), "Hollow Knight");
    }

    #[test]
    fn test_not_linked_detection() {
        assert!(is_not_linked_message("Steam account not linked"));
        assert!(is_not_linked_message("No PSN account linked to this user"));
        assert!(!is_not_linked_message("Internal server error"));
    }

    #[test]
    fn test_import_item_wire_shape() {
        let item = ImportItem {
            platform_id: "p1".to_string(),
            catalog_id: 99,
            list_type: ListType::Played,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "platform_id": "p1", "catalog_id": 99, "list_type": "played" })
        );
    }
}
