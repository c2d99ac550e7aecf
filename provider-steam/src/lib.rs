//! # Steam Provider
//!
//! Implements `LibraryPlatform` for a Steam account linked to the backend.
//!
//! ## Overview
//!
//! This module provides:
//! - Library snapshot fetches with hidden-title filtering
//! - Backend-driven resync of the owned games list
//! - Batched import, skip/restore and manual match persistence
//!
//! Steam reports titles by numeric app id; the connector exposes them as
//! string platform ids so the review core never sees platform-specific keys.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::SteamLibraryConnector;
pub use error::{Result, SteamError};
