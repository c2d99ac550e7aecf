//! # PlayStation Network Provider
//!
//! Implements `LibraryPlatform` for a PSN account linked to the backend.
//!
//! PSN titles carry a string title id (e.g. `CUSA07604_00`) and a console
//! generation, which is surfaced as the candidate's platform category.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::PlayStationLibraryConnector;
pub use error::{PlayStationError, Result};
