//! Terminal output for `list` and `find`.

use skedda_api::{Booking, Catalog, Space, TimeWindow, Venue, VenueBookings, space_order};

/// Day format used in headers (`Mon 06 May`).
const DAY_FORMAT: &str = "%a %d %b";

/// Clock format used in headers (`9:00am`).
const CLOCK_FORMAT: &str = "%-I:%M%P";

/// Bookings occupying one space.
#[derive(Debug)]
pub struct SpaceBookings<'a> {
    /// Owning venue.
    pub venue: &'a Venue,
    /// The space.
    pub space: &'a Space,
    /// Bookings that include the space, in upstream order.
    pub bookings: Vec<&'a Booking>,
}

/// Groups fetched bookings under each selected space.
///
/// Spaces whose venue is not in `catalog` are skipped. The result is sorted
/// by venue ID, then space name.
pub fn group_by_space<'a>(
    catalog: &'a Catalog,
    spaces: &[&'a Space],
    fetched: &'a [VenueBookings],
) -> Vec<SpaceBookings<'a>> {
    let mut grouped: Vec<SpaceBookings<'a>> = spaces
        .iter()
        .filter_map(|space| {
            let venue = catalog.venue(space.venue_id)?;
            let bookings = fetched
                .iter()
                .filter(|vb| vb.venue.id == space.venue_id)
                .flat_map(|vb| &vb.bookings)
                .filter(|b| b.space_ids.contains(&space.id))
                .collect();
            Some(SpaceBookings {
                venue,
                space,
                bookings,
            })
        })
        .collect();

    grouped.sort_by(|a, b| space_order(a.space, b.space));
    grouped
}

/// Joins the display names of `items` with `", "`.
pub fn join_names<T: std::fmt::Display>(items: &[&T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Formats `on <day>, between <start> and <end>`.
pub fn describe_window(window: &TimeWindow) -> String {
    format!(
        "on {}, between {} and {}",
        window.start.format(DAY_FORMAT),
        window.start.format(CLOCK_FORMAT),
        window.end.format(CLOCK_FORMAT),
    )
}

/// Prints every venue followed by its spaces.
pub fn render_catalog(catalog: &Catalog) {
    for venue in &catalog.venues {
        tracing::info!("{}", venue.name);
        for space in catalog.spaces_of(venue.id) {
            tracing::info!("\t{}", space.name);
        }
    }
}

/// Prints the bookings of each space, or an availability line when empty.
pub fn render_availability(grouped: &[SpaceBookings<'_>]) {
    for entry in grouped {
        tracing::info!("\n{} -- {}", entry.venue.name, entry.space.name);
        if entry.bookings.is_empty() {
            tracing::info!("\t* Slot is available *");
            continue;
        }
        for (i, booking) in entry.bookings.iter().enumerate() {
            tracing::info!("\t{}. {}", i.saturating_add(1), booking);
        }
    }
}
