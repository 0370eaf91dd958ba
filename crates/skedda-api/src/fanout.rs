//! Concurrent per-tenant and per-venue retrieval.
//!
//! Each call is launched eagerly up to the in-flight cap and every call is
//! allowed to finish. Results are kept in launch order, so the error that
//! surfaces is the first one in that order, not the first to complete.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::instrument;

use super::api::LocalSkeddaApi;
use super::error::{Result, SkeddaError};
use super::params::TimeWindow;
use super::types::{Booking, Catalog, Tenant, Venue};

/// Bookings of one venue.
#[derive(Debug, Clone)]
pub struct VenueBookings {
    /// Venue the bookings belong to.
    pub venue: Venue,
    /// Bookings in upstream order.
    pub bookings: Vec<Booking>,
}

/// Fetches the venue and spaces of every tenant and merges them.
///
/// # Errors
///
/// Returns the first error in `tenants` order; partial results are
/// discarded.
#[instrument(skip_all, fields(tenants = tenants.len()))]
pub async fn fetch_all(
    api: &(impl LocalSkeddaApi + Sync),
    tenants: &[Tenant],
    max_in_flight: usize,
) -> Result<Catalog> {
    let results: Vec<_> = stream::iter(tenants)
        .map(|tenant| api.fetch_venue(tenant))
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut catalog = Catalog::default();
    for result in results {
        let (venue, spaces) = result?;
        catalog.venues.push(venue);
        catalog.spaces.extend(spaces);
    }

    tracing::debug!(
        venues = catalog.venues.len(),
        spaces = catalog.spaces.len(),
        "Fetched catalog"
    );
    Ok(catalog)
}

/// Fetches the bookings of each distinct venue inside `window`.
///
/// Venues repeated in `venues` are queried once; the output follows the
/// order of first appearance.
///
/// # Errors
///
/// Returns the first error in venue order; partial results are discarded.
#[instrument(skip_all, fields(venues = venues.len()))]
pub async fn fetch_bookings_across_venues(
    api: &(impl LocalSkeddaApi + Sync),
    venues: &[Venue],
    window: &TimeWindow,
    max_in_flight: usize,
) -> Result<Vec<VenueBookings>> {
    let mut seen = HashSet::new();
    let distinct: Vec<&Venue> = venues.iter().filter(|v| seen.insert(v.id)).collect();

    let results: Vec<_> = stream::iter(&distinct)
        .map(|venue| async move {
            let bookings = api.fetch_bookings(&venue.tenant, window).await?;
            Ok::<_, SkeddaError>(VenueBookings {
                venue: (*venue).clone(),
                bookings,
            })
        })
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    results.into_iter().collect()
}
