//! # Catalog Search
//!
//! HTTP client for the application's game catalog search endpoint, used by
//! the manual match flow to find the right catalog entry for an imported
//! title.

pub mod client;
pub mod error;

pub use client::HttpCatalogClient;
pub use error::{CatalogError, Result};
