//! `SkeddaApi` implementation: venue, bookings and booking creation.

use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::api::LocalSkeddaApi;
use super::client::{SkeddaClient, TOKEN_HEADER};
use super::error::{Result, SkeddaError};
use super::params::{DATE_TIME_FORMAT, NewBooking, TimeWindow};
use super::recurrence::reconcile;
use super::types::{Booking, Space, Tenant, Venue};

/// Booking type sent on creation.
const BOOKING_TYPE: u8 = 1;

/// `GET /webs` response.
#[derive(Debug, Deserialize)]
struct VenueEnvelope {
    #[serde(default)]
    venue: Vec<Venue>,
    #[serde(default)]
    spaces: Vec<Space>,
}

/// `GET /bookingslists` response.
#[derive(Debug, Deserialize)]
struct BookingsEnvelope {
    #[serde(default)]
    bookings: Vec<Booking>,
}

/// `POST /bookings` request body.
#[derive(Debug, Serialize)]
struct CreateBookingEnvelope<'a> {
    booking: CreateBookingBody<'a>,
}

#[derive(Debug, Serialize)]
struct CreateBookingBody<'a> {
    start: String,
    end: String,
    title: &'a str,
    venue: u64,
    spaces: &'a [u64],
    #[serde(rename = "type")]
    kind: u8,
    price: u32,
}

impl<'a> CreateBookingBody<'a> {
    fn new(booking: &'a NewBooking) -> Self {
        let window = booking.window.truncated_to_minute();
        Self {
            start: window.start.format(DATE_TIME_FORMAT).to_string(),
            end: window.end.format(DATE_TIME_FORMAT).to_string(),
            title: &booking.title,
            venue: booking.venue_id,
            spaces: &booking.space_ids,
            kind: BOOKING_TYPE,
            price: 0,
        }
    }
}

impl LocalSkeddaApi for SkeddaClient {
    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn fetch_venue(&self, tenant: &Tenant) -> Result<(Venue, Vec<Space>)> {
        let token = self.resolve_token(tenant).await?;
        let url = self.endpoint.tenant_url(tenant.as_str(), "webs")?;

        tracing::debug!(%url, "Skedda venue request");
        let response = self.http.get(url).header(TOKEN_HEADER, token).send().await?;
        let response = Self::expect_ok(response).await?;

        let envelope: VenueEnvelope = Self::decode(response, "venue").await?;
        let count = envelope.venue.len();
        let venue = match <[Venue; 1]>::try_from(envelope.venue) {
            Ok([venue]) => venue,
            Err(_) => return Err(SkeddaError::VenueCountMismatch(count)),
        };

        tracing::debug!(venue = venue.id, spaces = envelope.spaces.len(), "Fetched venue");
        Ok((venue, envelope.spaces))
    }

    #[instrument(skip_all, fields(tenant = %tenant))]
    async fn fetch_bookings(&self, tenant: &Tenant, window: &TimeWindow) -> Result<Vec<Booking>> {
        let token = self.resolve_token(tenant).await?;
        let url = self.endpoint.tenant_url(tenant.as_str(), "bookingslists")?;

        tracing::debug!(%url, start = %window.start, end = %window.end, "Skedda bookings request");
        let response = self
            .http
            .get(url)
            .query(&[("start", window.start_param()), ("end", window.end_param())])
            .header(TOKEN_HEADER, token)
            .send()
            .await?;
        let response = Self::expect_ok(response).await?;

        let envelope: BookingsEnvelope = Self::decode(response, "bookings").await?;
        let total = envelope.bookings.len();
        let bookings: Vec<Booking> = envelope
            .bookings
            .into_iter()
            .filter(|booking| reconcile(window, booking))
            .collect();

        tracing::debug!(total, kept = bookings.len(), "Fetched bookings");
        Ok(bookings)
    }

    #[instrument(skip_all, fields(tenant = %tenant, venue = booking.venue_id))]
    async fn create_booking(&self, tenant: &Tenant, booking: &NewBooking) -> Result<()> {
        let token = self.resolve_token(tenant).await?;
        let url = self.endpoint.tenant_url(tenant.as_str(), "bookings")?;
        let body = CreateBookingEnvelope {
            booking: CreateBookingBody::new(booking),
        };
        let body = serde_json::to_vec(&body)
            .map_err(|source| SkeddaError::Decode { what: "booking request", source })?;

        tracing::debug!(%url, "Skedda create booking request");
        let response = self
            .http
            .post(url)
            .header(TOKEN_HEADER, token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        Self::expect_ok(response).await?;

        tracing::debug!("Booking created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use chrono::{NaiveDate, NaiveDateTime};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::{HostLabel, client_for};

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    async fn mount_token(server: &MockServer, label: &'static str) {
        Mock::given(method("GET"))
            .and(path("/booking"))
            .and(HostLabel(label))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<input name="__RequestVerificationToken" type="hidden" value="tok">"#,
            ))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_venue_with_spaces() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/webs"))
            .and(HostLabel("acme"))
            .and(header(TOKEN_HEADER, "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"venue":[{"id":1,"name":"HQ","subdomain":"acme"}],"spaces":[{"id":10,"name":"Room A","venue":1},{"id":11,"name":"Room B","venue":1}]}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let (venue, spaces) = client.fetch_venue(&Tenant::new("acme")).await.unwrap();

        // Assert
        assert_eq!(venue.id, 1);
        assert_eq!(venue.tenant, Tenant::new("acme"));
        assert_eq!(spaces.len(), 2);
        assert!(spaces.iter().all(|s| s.venue_id == venue.id));
    }

    #[tokio::test]
    async fn test_fetch_venue_logs_in_first() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logins"))
            .and(HostLabel("www"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/webs"))
            .and(HostLabel("acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"venue":[{"id":1,"name":"HQ","subdomain":"acme"}],"spaces":[]}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, Some(("user@example.com", "secret")), &["acme"]);

        // Act
        let (venue, _) = client.fetch_venue(&Tenant::new("acme")).await.unwrap();

        // Assert
        assert_eq!(venue.id, 1);
        assert!(client.is_authenticated());
    }

    #[tokio::test]
    async fn test_fetch_venue_with_rejected_login_stops_before_token() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logins"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/booking"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = client_for(&server, Some(("user@example.com", "wrong")), &["acme"]);

        // Act
        let err = client.fetch_venue(&Tenant::new("acme")).await.unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn test_fetch_venue_count_mismatch() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/webs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"venue":[{"id":1,"name":"A","subdomain":"acme"},{"id":2,"name":"B","subdomain":"acme"}],"spaces":[]}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let err = client.fetch_venue(&Tenant::new("acme")).await.unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::VenueCountMismatch(2)));
    }

    #[tokio::test]
    async fn test_fetch_venue_without_venue() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/webs"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"venue":[]}"#))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let err = client.fetch_venue(&Tenant::new("acme")).await.unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::VenueCountMismatch(0)));
    }

    #[tokio::test]
    async fn test_fetch_venue_error_detail() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/webs"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_string(r#"{"errors":[{"detail":"Access denied"}]}"#),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let err = client.fetch_venue(&Tenant::new("acme")).await.unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "Access denied");
    }

    #[tokio::test]
    async fn test_fetch_bookings_filters_recurring_by_time_of_day() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/bookingslists"))
            .and(HostLabel("acme"))
            .and(query_param("start", "2024-05-06T09:00:00"))
            .and(query_param("end", "2024-05-06T10:00:00"))
            .and(header(TOKEN_HEADER, "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"bookings":[
                    {"id":1,"title":"One-off","start":"2024-05-06T09:30:00","end":"2024-05-06T10:30:00","recurrenceRule":null,"spaces":[10],"venue":1},
                    {"id":2,"title":"Standup","start":"2019-01-07T09:15:00","end":"2019-01-07T09:30:00","recurrenceRule":"DTSTART:20190107T091500Z\nRRULE:FREQ=DAILY","spaces":[10],"venue":1},
                    {"id":3,"title":"Lunch","start":"2019-01-07T12:00:00","end":"2019-01-07T13:00:00","recurrenceRule":"DTSTART:20190107T120000Z\nRRULE:FREQ=DAILY","spaces":[11],"venue":1}
                ]}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);
        let window = TimeWindow::new(at(9, 0, 0), at(10, 0, 0)).unwrap();

        // Act
        let bookings = client
            .fetch_bookings(&Tenant::new("acme"), &window)
            .await
            .unwrap();

        // Assert
        let ids: Vec<u64> = bookings.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fetch_bookings_malformed_rule_fails() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("GET"))
            .and(path("/bookingslists"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"bookings":[{"id":2,"start":"2019-01-07T09:15:00","end":"2019-01-07T09:30:00","recurrenceRule":"RRULE:FREQ=WHENEVER","spaces":[10],"venue":1}]}"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);
        let window = TimeWindow::new(at(9, 0, 0), at(10, 0, 0)).unwrap();

        // Act
        let err = client
            .fetch_bookings(&Tenant::new("acme"), &window)
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::Decode { what: "bookings", .. }));
    }

    #[tokio::test]
    async fn test_create_booking_payload() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .and(HostLabel("acme"))
            .and(header(TOKEN_HEADER, "tok"))
            .and(body_json(serde_json::json!({
                "booking": {
                    "start": "2024-05-06T09:00:00",
                    "end": "2024-05-06T09:30:00",
                    "title": "Planning",
                    "venue": 1,
                    "spaces": [10, 11],
                    "type": 1,
                    "price": 0,
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);
        let booking = NewBooking {
            venue_id: 1,
            space_ids: vec![10, 11],
            title: String::from("Planning"),
            window: TimeWindow::new(at(9, 0, 42), at(9, 30, 5)).unwrap(),
        };

        // Act
        let result = client.create_booking(&Tenant::new("acme"), &booking).await;

        // Assert
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_create_booking_rejected_with_detail() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_string(r#"{"errors":[{"detail":"Space unavailable"}]}"#),
            )
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);
        let booking = NewBooking {
            venue_id: 1,
            space_ids: vec![10],
            title: String::from("Planning"),
            window: TimeWindow::new(at(9, 0, 0), at(9, 30, 0)).unwrap(),
        };

        // Act
        let err = client
            .create_booking(&Tenant::new("acme"), &booking)
            .await
            .unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "Space unavailable");
    }

    #[tokio::test]
    async fn test_create_booking_rejected_without_detail() {
        // Arrange
        let server = MockServer::start().await;
        mount_token(&server, "acme").await;
        Mock::given(method("POST"))
            .and(path("/bookings"))
            .respond_with(ResponseTemplate::new(409).set_body_string("conflict"))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);
        let booking = NewBooking {
            venue_id: 1,
            space_ids: vec![10],
            title: String::from("Planning"),
            window: TimeWindow::new(at(9, 0, 0), at(9, 30, 0)).unwrap(),
        };

        // Act
        let err = client
            .create_booking(&Tenant::new("acme"), &booking)
            .await
            .unwrap_err();

        // Assert
        assert_eq!(err.to_string(), "unknown status: 409");
    }
}
