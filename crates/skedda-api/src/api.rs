//! `SkeddaApi` trait definition.
#![allow(clippy::future_not_send)]

use super::error::Result;
use super::params::{NewBooking, TimeWindow};
use super::types::{Booking, Space, Tenant, Venue};

/// Tenant-scoped Skedda operations.
///
/// Abstracts the gateway for mock substitution in tests.
/// Uses `trait_variant::make` to generate a `Send`-bound async trait.
#[allow(clippy::module_name_repetitions)]
#[trait_variant::make(SkeddaApi: Send)]
pub trait LocalSkeddaApi {
    /// Fetches the tenant's venue and its spaces.
    ///
    /// # Errors
    ///
    /// Returns an error if token resolution, the HTTP request or JSON decoding
    /// fails, or if the response does not hold exactly one venue.
    async fn fetch_venue(&self, tenant: &Tenant) -> Result<(Venue, Vec<Space>)>;

    /// Fetches the bookings of a tenant inside `window`.
    ///
    /// Recurring bookings are kept only when their time of day overlaps the
    /// window.
    ///
    /// # Errors
    ///
    /// Returns an error if token resolution, the HTTP request or JSON decoding
    /// fails.
    async fn fetch_bookings(&self, tenant: &Tenant, window: &TimeWindow) -> Result<Vec<Booking>>;

    /// Creates a booking.
    ///
    /// # Errors
    ///
    /// Returns the upstream error detail (or the status code) when the
    /// booking is refused.
    async fn create_booking(&self, tenant: &Tenant, booking: &NewBooking) -> Result<()>;
}
