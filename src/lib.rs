//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (e.g., `core-service`, `provider-steam`,
//! `provider-playstation`). Host applications can depend on `shelf-workspace`
//! and enable the documented features without needing to wire each crate
//! individually.

#[cfg(any(feature = "desktop-shims", feature = "steam", feature = "playstation"))]
pub use core_service::*;
