//! Venue and space catalog loading with the local cache in front.

use std::path::PathBuf;

use anyhow::{Context, Result};
use skedda_api::{Catalog, SkeddaClient, Space, Tenant, Venue, fetch_all};
use skedda_db::{CachedCatalog, CachedSpace, CachedVenue, open_db, save_catalog};
use tracing::instrument;

/// Converts a cache row set into a catalog.
pub fn from_cached(cached: CachedCatalog) -> Catalog {
    Catalog {
        venues: cached
            .venues
            .into_iter()
            .map(|v| Venue {
                id: v.id,
                name: v.name,
                tenant: Tenant::new(v.tenant),
            })
            .collect(),
        spaces: cached
            .spaces
            .into_iter()
            .map(|s| Space {
                id: s.id,
                name: s.name,
                venue_id: s.venue_id,
            })
            .collect(),
    }
}

/// Converts a catalog into cache rows.
pub fn to_cached(catalog: &Catalog) -> (Vec<CachedVenue>, Vec<CachedSpace>) {
    let venues = catalog
        .venues
        .iter()
        .map(|v| CachedVenue {
            id: v.id,
            name: v.name.clone(),
            tenant: String::from(v.tenant.as_str()),
        })
        .collect();
    let spaces = catalog
        .spaces
        .iter()
        .map(|s| CachedSpace {
            id: s.id,
            name: s.name.clone(),
            venue_id: s.venue_id,
        })
        .collect();
    (venues, spaces)
}

/// Discovers the account's tenants and fetches every venue and space.
///
/// # Errors
///
/// Returns an error if authentication, discovery or any venue fetch fails.
#[instrument(skip_all)]
pub async fn fetch_catalog(client: &SkeddaClient) -> Result<Catalog> {
    let primary = client
        .primary_tenant()
        .await
        .context("failed to find primary domain")?;
    let tenants: Vec<Tenant> = client
        .list_tenants(&primary)
        .await
        .context("failed to list domains")?
        .into_iter()
        .collect();
    tracing::debug!(primary = %primary, count = tenants.len(), "Discovered tenants");

    fetch_all(client, &tenants, client.max_in_flight())
        .await
        .context("failed to fetch venues")
}

/// Writes `catalog` to the cache database.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or written.
pub fn store_catalog(catalog: &Catalog, dir: Option<&PathBuf>) -> Result<()> {
    let conn = open_db(dir).context("failed to open database")?;
    let (venues, spaces) = to_cached(catalog);
    save_catalog(&conn, &venues, &spaces).context("failed to save catalog")
}

/// Reads the cached catalog, or `None` on a miss.
fn read_cache(dir: Option<&PathBuf>) -> Result<Option<Catalog>> {
    let conn = open_db(dir).context("failed to open database")?;
    let cached = skedda_db::load_catalog(&conn).context("failed to load catalog")?;
    Ok(cached.map(from_cached))
}

/// Returns the catalog from the cache, fetching and caching it on a miss or
/// when `no_cache` is set.
///
/// A failed cache read or write is logged and otherwise ignored.
///
/// # Errors
///
/// Returns an error if the catalog has to be fetched and the fetch fails.
#[instrument(skip_all)]
pub async fn load_catalog(
    client: &SkeddaClient,
    no_cache: bool,
    dir: Option<&PathBuf>,
) -> Result<Catalog> {
    if !no_cache {
        match read_cache(dir) {
            Ok(Some(catalog)) => return Ok(catalog),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "Failed to read cache"),
        }
    }

    tracing::info!("Loading venues and spaces from Skedda...");
    let catalog = fetch_catalog(client).await?;

    if let Err(e) = store_catalog(&catalog, dir) {
        tracing::warn!(error = %format!("{e:#}"), "Failed to cache");
    }
    Ok(catalog)
}
