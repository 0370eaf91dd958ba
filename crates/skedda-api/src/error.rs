//! Error taxonomy for the Skedda client.

use thiserror::Error;

/// Errors returned by the Skedda client.
///
/// Every operation fails fast with one of these; nothing retries internally.
#[derive(Debug, Error)]
#[allow(clippy::module_name_repetitions)]
pub enum SkeddaError {
    /// Username or password is empty.
    #[error("missing credentials")]
    CredentialsMissing,

    /// The login endpoint rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The token page redirected away from the tenant.
    #[error("invalid domain: {0}")]
    InvalidTenant(String),

    /// The primary-tenant login redirected somewhere unexpected.
    #[error("unknown URL: {0}")]
    UnexpectedRedirect(String),

    /// The primary-tenant login redirect carried an `err` parameter.
    #[error("request failed: {0}")]
    RequestRejected(String),

    /// The token page did not contain exactly one anti-forgery input.
    #[error("verification token not found")]
    TokenNotFound,

    /// Non-success status without a readable error envelope.
    #[error("unknown status: {0}")]
    UnknownStatus(u16),

    /// The venue endpoint returned zero or several venues.
    #[error("expected exactly one venue, found {0}")]
    VenueCountMismatch(usize),

    /// Error detail reported by the upstream error envelope.
    #[error("{0}")]
    Upstream(String),

    /// A time window whose start is after its end.
    #[error("invalid time window: {start} is after {end}")]
    InvalidWindow {
        /// Window start.
        start: chrono::NaiveDateTime,
        /// Window end.
        end: chrono::NaiveDateTime,
    },

    /// Recurrence rule text that could not be parsed.
    #[error("invalid recurrence rule: {0}")]
    Recurrence(String),

    /// Response body that could not be decoded.
    #[error("failed to decode {what}: {source}")]
    Decode {
        /// What was being decoded.
        what: &'static str,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A service URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SkeddaError>;
