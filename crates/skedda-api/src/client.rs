//! `SkeddaClient` - session-bound HTTP client for Skedda.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::redirect::{Attempt, Policy};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::instrument;
use url::Url;

use super::error::{Result, SkeddaError};

/// Skedda apex domain.
pub const DEFAULT_APEX: &str = "skedda.com";

/// Header carrying the per-tenant anti-forgery token.
pub const TOKEN_HEADER: &str = "X-Skedda-RequestVerificationToken";

/// Maximum number of redirects followed by any client.
const MAX_REDIRECTS: usize = 10;

/// Default cap on concurrent per-tenant requests.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Default User-Agent.
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Login username (e-mail).
    pub username: String,
    /// Login password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns `true` if neither part is empty.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

/// Where the Skedda hosts live: `<scheme>://<label>.<apex>[:port]/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    scheme: String,
    apex: String,
    port: Option<u16>,
}

impl Default for ServiceEndpoint {
    fn default() -> Self {
        Self {
            scheme: String::from("https"),
            apex: String::from(DEFAULT_APEX),
            port: None,
        }
    }
}

impl ServiceEndpoint {
    /// Creates an endpoint (tests point this at a mock server).
    #[must_use]
    pub fn new(scheme: impl Into<String>, apex: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.into(),
            apex: apex.into(),
            port,
        }
    }

    /// Returns the apex domain.
    #[must_use]
    pub fn apex(&self) -> &str {
        &self.apex
    }

    /// Returns the fully qualified host for a subdomain label.
    #[must_use]
    pub fn host(&self, label: &str) -> String {
        format!("{label}.{}", self.apex)
    }

    /// Builds a URL on the shared `www` host.
    pub(crate) fn www_url(&self, path: &str) -> Result<Url> {
        self.url("www", path)
    }

    /// Builds a URL on a tenant host.
    pub(crate) fn tenant_url(&self, tenant: &str, path: &str) -> Result<Url> {
        self.url(tenant, path)
    }

    fn url(&self, label: &str, path: &str) -> Result<Url> {
        let port = self.port.map(|p| format!(":{p}")).unwrap_or_default();
        let base = Url::parse(&format!("{}://{}{port}/", self.scheme, self.host(label)))?;
        Ok(base.join(path)?)
    }
}

/// Outcome of the one login exchange a client performs.
#[derive(Debug, Clone)]
pub(crate) enum LoginOutcome {
    Succeeded,
    MissingCredentials,
    Rejected(String),
}

impl LoginOutcome {
    fn from_error(err: &SkeddaError) -> Self {
        match err {
            SkeddaError::CredentialsMissing => Self::MissingCredentials,
            SkeddaError::AuthenticationFailed(detail) => Self::Rejected(detail.clone()),
            other => Self::Rejected(other.to_string()),
        }
    }

    fn to_result(&self) -> Result<()> {
        match self {
            Self::Succeeded => Ok(()),
            Self::MissingCredentials => Err(SkeddaError::CredentialsMissing),
            Self::Rejected(detail) => Err(SkeddaError::AuthenticationFailed(detail.clone())),
        }
    }
}

/// Login state owned by one client.
///
/// Cookies live in the jar shared by the client's HTTP handles; they are
/// written by the login exchange and only read afterwards.
#[derive(Debug)]
pub(crate) struct Session {
    /// Credentials, `None` for an anonymous session.
    pub(crate) credentials: Option<Credentials>,
    /// Set by the first login exchange, successful or not.
    pub(crate) login: OnceCell<LoginOutcome>,
}

/// Skedda client.
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub struct SkeddaClient {
    /// Follows redirects.
    pub(crate) http: Client,
    /// Never follows redirects.
    pub(crate) no_redirect: Client,
    /// Follows redirects until the target leaves for the `www` host.
    pub(crate) tenant_bound: Client,
    /// Host layout.
    pub(crate) endpoint: ServiceEndpoint,
    /// Login state.
    pub(crate) session: Session,
    /// Fan-out cap.
    max_in_flight: usize,
}

/// Builder for `SkeddaClient`.
#[derive(Debug, Default)]
#[allow(clippy::module_name_repetitions)]
pub struct SkeddaClientBuilder {
    credentials: Option<Credentials>,
    user_agent: Option<String>,
    endpoint: Option<ServiceEndpoint>,
    resolve: Vec<(String, SocketAddr)>,
    max_in_flight: Option<usize>,
}

impl SkeddaClientBuilder {
    /// Sets the login credentials. Without them the client is anonymous.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Overrides the User-Agent.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Overrides the host layout (for wiremock in tests).
    #[must_use]
    pub fn endpoint(mut self, endpoint: ServiceEndpoint) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Resolves `host` to `addr` instead of using DNS (for wiremock in tests).
    #[must_use]
    pub fn resolve(mut self, host: impl Into<String>, addr: SocketAddr) -> Self {
        self.resolve.push((host.into(), addr));
        self
    }

    /// Caps the number of concurrent requests a fan-out keeps in flight.
    #[must_use]
    pub const fn max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if a `reqwest::Client` fails to build.
    pub fn build(self) -> Result<SkeddaClient> {
        let user_agent = self
            .user_agent
            .clone()
            .unwrap_or_else(|| String::from(DEFAULT_USER_AGENT));
        let jar = Arc::new(Jar::default());

        let http = self.http_client(&user_agent, &jar, Policy::limited(MAX_REDIRECTS))?;
        let no_redirect = self.http_client(&user_agent, &jar, Policy::none())?;
        let tenant_bound = self.http_client(&user_agent, &jar, Policy::custom(stop_at_www))?;

        Ok(SkeddaClient {
            http,
            no_redirect,
            tenant_bound,
            endpoint: self.endpoint.unwrap_or_default(),
            session: Session {
                credentials: self.credentials,
                login: OnceCell::new(),
            },
            max_in_flight: self.max_in_flight.unwrap_or(DEFAULT_MAX_IN_FLIGHT).max(1),
        })
    }

    fn http_client(&self, user_agent: &str, jar: &Arc<Jar>, policy: Policy) -> Result<Client> {
        let mut builder = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .cookie_provider(Arc::clone(jar))
            .redirect(policy);
        for (host, addr) in &self.resolve {
            builder = builder.resolve(host, *addr);
        }
        Ok(builder.build()?)
    }
}

/// Redirect policy that stops before landing on the `www` host.
fn stop_at_www(attempt: Attempt<'_>) -> reqwest::redirect::Action {
    if attempt.previous().len() > MAX_REDIRECTS {
        return attempt.error("too many redirects");
    }
    let leaves_tenant = attempt
        .url()
        .host_str()
        .and_then(|host| host.split('.').next())
        .is_some_and(|label| label == "www");
    if leaves_tenant {
        attempt.stop()
    } else {
        attempt.follow()
    }
}

/// Skedda error envelope: `{"errors":[{"detail":"..."}]}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ErrorItem {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Extracts `errors[0].detail` from an error body.
///
/// Returns `None` for anything that is not that exact shape.
pub(crate) fn parse_error_detail(body: &str) -> Option<String> {
    let envelope: ErrorEnvelope = serde_json::from_str(body).ok()?;
    match envelope.errors.into_iter().next()?.detail? {
        serde_json::Value::String(detail) => Some(detail),
        _ => None,
    }
}

impl SkeddaClient {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> SkeddaClientBuilder {
        SkeddaClientBuilder::default()
    }

    /// Returns `true` if the client carries credentials.
    #[must_use]
    pub const fn has_credentials(&self) -> bool {
        self.session.credentials.is_some()
    }

    /// Returns `true` once the login exchange has succeeded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.session.login.get(), Some(LoginOutcome::Succeeded))
    }

    /// Returns the fan-out cap.
    #[must_use]
    pub const fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Logs in and keeps the session cookies.
    ///
    /// Concurrent callers share a single login exchange. Its outcome is
    /// kept: later calls return immediately, and a failed login is reported
    /// again without another request.
    ///
    /// # Errors
    ///
    /// - `SkeddaError::CredentialsMissing` if username or password is empty.
    /// - `SkeddaError::AuthenticationFailed` if Skedda rejects the login. A
    ///   repeated call after a transport failure also reports this kind.
    /// - `SkeddaError::Http` on transport failure.
    #[instrument(skip_all)]
    pub async fn authenticate(&self) -> Result<()> {
        let mut first_error = None;
        let slot = &mut first_error;
        let outcome = self
            .session
            .login
            .get_or_init(|| async move {
                match self.login().await {
                    Ok(()) => LoginOutcome::Succeeded,
                    Err(err) => {
                        let outcome = LoginOutcome::from_error(&err);
                        *slot = Some(err);
                        outcome
                    }
                }
            })
            .await;
        match first_error {
            Some(err) => Err(err),
            None => outcome.to_result(),
        }
    }

    /// Authenticates first when the client carries credentials.
    pub(crate) async fn ensure_session(&self) -> Result<()> {
        if self.has_credentials() {
            self.authenticate().await?;
        }
        Ok(())
    }

    async fn login(&self) -> Result<()> {
        let credentials = self
            .session
            .credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or(SkeddaError::CredentialsMissing)?;

        let url = self.endpoint.www_url("logins")?;
        let body = serde_json::json!({
            "login": {
                "username": credentials.username,
                "password": credentials.password,
                "rememberMe": false,
                "arbitraryerrors": null,
            }
        });

        tracing::debug!(%url, username = %credentials.username, "Skedda login request");
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Skedda login rejected");
            let detail = Self::error_detail(response)
                .await
                .unwrap_or_else(|| format!("unknown status: {}", status.as_u16()));
            return Err(SkeddaError::AuthenticationFailed(detail));
        }

        tracing::debug!("Skedda login succeeded");
        Ok(())
    }

    /// Reads the body of a failed response and extracts its error detail.
    pub(crate) async fn error_detail(response: Response) -> Option<String> {
        let body = response.text().await.ok()?;
        parse_error_detail(&body)
    }

    /// Converts a failed response into `Upstream(detail)` or `UnknownStatus`.
    pub(crate) async fn status_error(response: Response) -> SkeddaError {
        let status = response.status();
        Self::error_detail(response)
            .await
            .map_or(SkeddaError::UnknownStatus(status.as_u16()), SkeddaError::Upstream)
    }

    /// Fails with the status error unless the response is `200 OK`.
    pub(crate) async fn expect_ok(response: Response) -> Result<Response> {
        if response.status() == StatusCode::OK {
            Ok(response)
        } else {
            Err(Self::status_error(response).await)
        }
    }

    /// Reads and decodes a JSON body.
    pub(crate) async fn decode<T: serde::de::DeserializeOwned>(
        response: Response,
        what: &'static str,
    ) -> Result<T> {
        let body = response.text().await?;
        tracing::trace!(what, body_preview = &body[..body.floor_char_boundary(500)], "Response body preview");
        serde_json::from_str(&body).map_err(|source| SkeddaError::Decode { what, source })
    }
}
