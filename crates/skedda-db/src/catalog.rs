//! Venue and space cache operations.
//!
//! The cache is all-or-nothing: a save replaces every row, and a load with
//! no venues reports a miss.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// A cached venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedVenue {
    /// Venue ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Owning tenant (subdomain label).
    pub tenant: String,
}

/// A cached space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedSpace {
    /// Space ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Owning venue ID.
    pub venue_id: u64,
}

/// Venues and spaces restored from the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachedCatalog {
    /// Venues ordered by ID.
    pub venues: Vec<CachedVenue>,
    /// Spaces ordered by venue ID, then name.
    pub spaces: Vec<CachedSpace>,
}

/// Replaces the cached catalog.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub fn save_catalog(conn: &Connection, venues: &[CachedVenue], spaces: &[CachedSpace]) -> Result<()> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to begin transaction")?;

    clear_catalog(&tx)?;

    let mut venue_stmt = tx
        .prepare("INSERT OR REPLACE INTO venues (id, name, tenant) VALUES (?1, ?2, ?3)")
        .context("failed to prepare venues insert")?;
    for v in venues {
        venue_stmt
            .execute(rusqlite::params![v.id, v.name, v.tenant])
            .with_context(|| format!("failed to insert venue {}", v.id))?;
    }

    let mut space_stmt = tx
        .prepare("INSERT OR REPLACE INTO spaces (id, name, venue_id) VALUES (?1, ?2, ?3)")
        .context("failed to prepare spaces insert")?;
    for s in spaces {
        space_stmt
            .execute(rusqlite::params![s.id, s.name, s.venue_id])
            .with_context(|| format!("failed to insert space {}", s.id))?;
    }

    drop(venue_stmt);
    drop(space_stmt);
    tx.commit().context("failed to commit catalog")?;

    tracing::debug!(venues = venues.len(), spaces = spaces.len(), "Saved catalog to cache");
    Ok(())
}

/// Loads the cached catalog.
///
/// Returns `None` if the cache holds no venues.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub fn load_catalog(conn: &Connection) -> Result<Option<CachedCatalog>> {
    let mut stmt = conn
        .prepare("SELECT id, name, tenant FROM venues ORDER BY id")
        .context("failed to prepare venues query")?;
    let venues = stmt
        .query_map([], |row| {
            Ok(CachedVenue {
                id: row.get(0)?,
                name: row.get(1)?,
                tenant: row.get(2)?,
            })
        })
        .context("failed to query venues")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read venues rows")?;

    if venues.is_empty() {
        tracing::debug!("Catalog cache is empty");
        return Ok(None);
    }

    let mut stmt = conn
        .prepare("SELECT id, name, venue_id FROM spaces ORDER BY venue_id, name")
        .context("failed to prepare spaces query")?;
    let spaces = stmt
        .query_map([], |row| {
            Ok(CachedSpace {
                id: row.get(0)?,
                name: row.get(1)?,
                venue_id: row.get(2)?,
            })
        })
        .context("failed to query spaces")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("failed to read spaces rows")?;

    Ok(Some(CachedCatalog { venues, spaces }))
}

/// Deletes every cached venue and space.
fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch("DELETE FROM spaces; DELETE FROM venues;")
        .context("failed to clear catalog")
}
