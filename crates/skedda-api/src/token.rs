//! Anti-forgery token resolution.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use tracing::instrument;

use super::client::SkeddaClient;
use super::error::{Result, SkeddaError};
use super::types::Tenant;

/// Name of the hidden form field carrying the token.
pub const TOKEN_FIELD: &str = "__RequestVerificationToken";

/// Tenant page that embeds the token.
const TOKEN_PAGE: &str = "booking";

/// Matches a whole `<input ...>` tag.
#[allow(clippy::expect_used)]
static INPUT_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<input\b([^>]*)>").expect("failed to compile input tag regex"));

/// Matches one `name=value` attribute (double, single or unquoted). An
/// unquoted value never ends in `/`, so `value=abc/>` yields `abc`.
#[allow(clippy::expect_used)]
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|((?:[^\s"'>/]|/[^\s"'>])+))"#)
        .expect("failed to compile attribute regex")
});

/// Returns the value of attribute `name` (case-insensitive) in a tag body.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    ATTRIBUTE_RE.captures_iter(tag).find_map(|caps| {
        let key = caps.get(1)?.as_str();
        if !key.eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
    })
}

/// Extracts the anti-forgery token from an HTML page.
///
/// Returns the `value` attribute of the unique `<input>` element whose
/// `name` attribute equals [`TOKEN_FIELD`], verbatim.
///
/// # Errors
///
/// Returns `SkeddaError::TokenNotFound` if no such element exists, if more
/// than one exists, or if it has no `value`.
pub fn extract_verification_token(html: &str) -> Result<String> {
    let mut candidates = INPUT_TAG_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|tag| attribute(tag, "name") == Some(TOKEN_FIELD));

    let tag = candidates.next().ok_or(SkeddaError::TokenNotFound)?;
    if candidates.next().is_some() {
        return Err(SkeddaError::TokenNotFound);
    }
    attribute(tag, "value")
        .map(str::to_owned)
        .ok_or(SkeddaError::TokenNotFound)
}

impl SkeddaClient {
    /// Fetches a fresh anti-forgery token for `tenant`.
    ///
    /// Tokens are never cached; every tenant-scoped operation resolves its
    /// own.
    ///
    /// # Errors
    ///
    /// - `SkeddaError::InvalidTenant` if the page redirects to the `www` host.
    /// - `SkeddaError::UnknownStatus` for any other non-200 response.
    /// - `SkeddaError::TokenNotFound` if the page lacks a unique token input.
    #[instrument(skip_all, fields(tenant = %tenant))]
    pub async fn resolve_token(&self, tenant: &Tenant) -> Result<String> {
        self.ensure_session().await?;

        let url = self.endpoint.tenant_url(tenant.as_str(), TOKEN_PAGE)?;
        tracing::debug!(%url, "Skedda token page request");
        let response = self.tenant_bound.get(url).send().await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::FOUND => return Err(SkeddaError::InvalidTenant(tenant.to_string())),
            status => return Err(SkeddaError::UnknownStatus(status.as_u16())),
        }

        let html = response.text().await?;
        extract_verification_token(&html)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::client::tests::{HostLabel, TEST_APEX, client_for};

    #[test]
    fn test_extract_single_token_verbatim() {
        // Arrange
        let html = r#"<form><input name="__RequestVerificationToken" type="hidden" value="CfDJ8-abc_DEF+/=="/></form>"#;

        // Act
        let token = extract_verification_token(html).unwrap();

        // Assert
        assert_eq!(token, "CfDJ8-abc_DEF+/==");
    }

    #[test]
    fn test_extract_ignores_other_inputs_and_attribute_order() {
        // Arrange
        let html = r#"
            <input type="text" name="username" value="someone">
            <INPUT value='tok-123'
                   type=hidden
                   name=__RequestVerificationToken>
            <input type="hidden" name="__RequestVerificationTokenOld" value="old">
        "#;

        // Act
        let token = extract_verification_token(html).unwrap();

        // Assert
        assert_eq!(token, "tok-123");
    }

    #[test]
    fn test_extract_unquoted_value_before_self_closing_slash() {
        // Arrange
        let html = "<input name=__RequestVerificationToken value=abc/def/>";

        // Act
        let token = extract_verification_token(html).unwrap();

        // Assert
        assert_eq!(token, "abc/def");
    }

    #[test]
    fn test_extract_missing_token() {
        // Arrange
        let html = r#"<html><body><input name="username" value="x"></body></html>"#;

        // Act
        let result = extract_verification_token(html);

        // Assert
        assert!(matches!(result, Err(SkeddaError::TokenNotFound)));
    }

    #[test]
    fn test_extract_duplicate_tokens_rejected() {
        // Arrange
        let html = r#"
            <input name="__RequestVerificationToken" value="a">
            <input name="__RequestVerificationToken" value="b">
        "#;

        // Act
        let result = extract_verification_token(html);

        // Assert
        assert!(matches!(result, Err(SkeddaError::TokenNotFound)));
    }

    #[test]
    fn test_extract_token_without_value() {
        // Arrange
        let html = r#"<input type="hidden" name="__RequestVerificationToken">"#;

        // Act & Assert
        assert!(matches!(
            extract_verification_token(html),
            Err(SkeddaError::TokenNotFound)
        ));
    }

    #[tokio::test]
    async fn test_resolve_token_from_tenant_page() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/booking"))
            .and(HostLabel("acme"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<input name="__RequestVerificationToken" type="hidden" value="tok-acme">"#,
            ))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let token = client.resolve_token(&Tenant::new("acme")).await.unwrap();

        // Assert
        assert_eq!(token, "tok-acme");
    }

    #[tokio::test]
    async fn test_resolve_token_redirect_to_www_is_invalid_tenant() {
        // Arrange
        let server = MockServer::start().await;
        let location = format!("http://www.{TEST_APEX}:{}/", server.address().port());
        Mock::given(method("GET"))
            .and(path("/booking"))
            .and(HostLabel("nowhere"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", location.as_str()))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["nowhere"]);

        // Act
        let err = client
            .resolve_token(&Tenant::new("nowhere"))
            .await
            .unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::InvalidTenant(_)));
        assert_eq!(err.to_string(), "invalid domain: nowhere");
    }

    #[tokio::test]
    async fn test_resolve_token_server_error_is_unknown_status() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/booking"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let client = client_for(&server, None, &["acme"]);

        // Act
        let err = client.resolve_token(&Tenant::new("acme")).await.unwrap_err();

        // Assert
        assert!(matches!(err, SkeddaError::UnknownStatus(503)));
    }
}
