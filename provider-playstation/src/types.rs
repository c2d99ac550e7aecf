//! PlayStation Network library wire records
//!
//! Shapes returned by the backend's `/psn/*` routes.

use bridge_traits::library::{CandidateStatus, MatchMethod};
use serde::Deserialize;

/// One played PSN title as cached by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct PsnTitle {
    /// NP title id, e.g. `PPSA01284_00`
    pub psn_title_id: String,

    pub name: String,

    /// Console generation reported by PSN (`PS4`, `PS5`, ...)
    #[serde(default)]
    pub platform: Option<String>,

    /// Total play duration in minutes
    #[serde(default)]
    pub play_duration_minutes: Option<u64>,

    /// Last played timestamp (RFC 3339)
    #[serde(default)]
    pub last_played_date_time: Option<String>,

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

/// `POST /psn/sync` response
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PsnSyncResponse {
    pub new_count: u32,
}
