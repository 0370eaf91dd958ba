//! Local cache of Skedda venues and spaces.
//!
//! Uses `rusqlite` (bundled `SQLite`). The cache holds the catalog gathered
//! by `skedda cache` so later commands can skip the fan-out fetch.

/// Venue and space cache operations.
pub mod catalog;
mod connection;
mod migrations;

pub use catalog::{CachedCatalog, CachedSpace, CachedVenue, load_catalog, save_catalog};
#[allow(clippy::module_name_repetitions)]
pub use connection::open_db;
