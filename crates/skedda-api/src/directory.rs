//! Tenant discovery: the account's primary tenant and its siblings.

use std::collections::{BTreeMap, BTreeSet};

use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, LOCATION};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::client::{SkeddaClient, TOKEN_HEADER};
use super::error::{Result, SkeddaError};
use super::types::Tenant;

/// `POST /webs` response, reduced to the sibling map.
#[derive(Debug, Deserialize)]
struct WebsEnvelope {
    web: WebInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebInfo {
    #[serde(default)]
    other_subdomains: BTreeMap<String, serde_json::Value>,
}

/// Maps the login redirect target to a tenant.
///
/// The host must be a subdomain of `apex` other than `www`. A `www` host
/// carrying an `err` query parameter reports the upstream rejection.
///
/// # Errors
///
/// - `SkeddaError::RequestRejected` for a `www` redirect with `err`.
/// - `SkeddaError::UnexpectedRedirect` for any other foreign target.
pub fn parse_primary_redirect(location: &Url, apex: &str) -> Result<Tenant> {
    let suffix = format!(".{apex}");
    let host = location.host_str().unwrap_or_default();
    let on_apex = host.ends_with(&suffix);

    if host.starts_with("www.") || !on_apex {
        if on_apex
            && let Some((_, err)) = location.query_pairs().find(|(key, _)| key == "err")
        {
            return Err(SkeddaError::RequestRejected(err.into_owned()));
        }
        return Err(SkeddaError::UnexpectedRedirect(location.to_string()));
    }

    Ok(Tenant::new(host.strip_suffix(&suffix).unwrap_or(host)))
}

impl SkeddaClient {
    /// Resolves the tenant the account lands on after login.
    ///
    /// Posts the login form without following redirects and reads the
    /// tenant from the `Location` header.
    ///
    /// # Errors
    ///
    /// - `SkeddaError::UnknownStatus` unless the login redirect answers `302`.
    /// - `SkeddaError::UnexpectedRedirect` / `RequestRejected` per
    ///   [`parse_primary_redirect`].
    /// - Any authentication error.
    #[instrument(skip_all)]
    pub async fn primary_tenant(&self) -> Result<Tenant> {
        self.authenticate().await?;
        let username = self
            .session
            .credentials
            .as_ref()
            .map(|c| c.username.as_str())
            .ok_or(SkeddaError::CredentialsMissing)?;

        let url = self.endpoint.www_url("account/login")?;
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .finish();

        tracing::debug!(%url, "Skedda primary tenant request");
        let response = self
            .no_redirect
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::FOUND {
            return Err(SkeddaError::UnknownStatus(status.as_u16()));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let target = url.join(location)?;

        let tenant = parse_primary_redirect(&target, self.endpoint.apex())?;
        tracing::debug!(%tenant, "Resolved primary tenant");
        Ok(tenant)
    }

    /// Lists the sibling tenants visible from `primary`.
    ///
    /// The result holds the keys of the upstream sibling map; `primary`
    /// itself is not added.
    ///
    /// # Errors
    ///
    /// Returns an error if token resolution or the request fails, on a
    /// non-200 response, or if the body cannot be decoded.
    #[instrument(skip_all, fields(tenant = %primary))]
    pub async fn list_tenants(&self, primary: &Tenant) -> Result<BTreeSet<Tenant>> {
        let token = self.resolve_token(primary).await?;
        let url = self.endpoint.tenant_url(primary.as_str(), "webs")?;

        tracing::debug!(%url, "Skedda tenant listing request");
        let response = self
            .http
            .post(url)
            .header(TOKEN_HEADER, token)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SkeddaError::UnknownStatus(status.as_u16()));
        }

        let envelope: WebsEnvelope = Self::decode(response, "tenant listing").await?;
        let tenants: BTreeSet<Tenant> = envelope
            .web
            .other_subdomains
            .into_keys()
            .map(Tenant::from)
            .collect();

        tracing::debug!(count = tenants.len(), "Listed tenants");
        Ok(tenants)
    }
}
