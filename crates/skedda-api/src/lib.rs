//! Protocol client for the Skedda space-booking service.
//!
//! Skedda has no public API. Sessions are cookie based, every tenant-scoped
//! call carries an anti-forgery token scraped from a tenant page, and the
//! account's tenants are discovered through login redirects.

/// Trait abstraction for tenant-scoped operations.
pub mod api;

/// `SkeddaClient`, its builder and the login session.
pub mod client;

/// Primary tenant and sibling tenant discovery.
pub mod directory;

/// Error taxonomy.
pub mod error;

/// Concurrent retrieval across tenants and venues.
pub mod fanout;

/// Venue, booking and booking-creation requests.
pub mod gateway;

/// Interval overlap test.
pub mod overlap;

/// Request parameter types.
pub mod params;

/// Recurrence rule sets and recurring-booking inclusion.
pub mod recurrence;

/// Anti-forgery token resolution.
pub mod token;

/// Response data types.
pub mod types;

pub use api::{LocalSkeddaApi, SkeddaApi};
pub use client::{Credentials, ServiceEndpoint, SkeddaClient, SkeddaClientBuilder};
pub use error::{Result, SkeddaError};
pub use fanout::{VenueBookings, fetch_all, fetch_bookings_across_venues};
pub use params::{NewBooking, TimeWindow};
pub use types::{Booking, Catalog, Space, Tenant, Venue, space_order};
