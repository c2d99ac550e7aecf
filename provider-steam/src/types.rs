//! Steam library wire records
//!
//! Shapes returned by the backend's `/steam/*` routes.

use bridge_traits::library::{CandidateStatus, MatchMethod};
use serde::Deserialize;

/// One owned Steam game as cached by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SteamGame {
    /// Steam application id
    pub steam_app_id: u64,

    /// Store title
    pub name: String,

    /// Total playtime (`playtime_forever`) in minutes
    #[serde(default)]
    pub playtime_minutes: Option<u64>,

    /// Last launch time (RFC 3339)
    #[serde(default)]
    pub last_played_at: Option<String>,

    /// Matched catalog entry
    #[serde(default)]
    pub igdb_id: Option<u64>,

    #[serde(default)]
    pub igdb_name: Option<String>,

    #[serde(default)]
    pub igdb_cover_url: Option<String>,

    #[serde(default)]
    pub match_confidence: Option<f32>,

    #[serde(default)]
    pub match_method: Option<MatchMethod>,

    pub status: CandidateStatus,
}

/// `POST /steam/sync` response
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SteamSyncResponse {
    pub new_count: u32,
}
