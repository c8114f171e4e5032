//! OAuth2 token acquisition against the platform's token endpoint.
//!
//! All grants POST a form-encoded body to `<service>/oauth2/token/<app_id>`.
//! A 200 answer is a [`TokenResponse`], anything else is decoded as an
//! [`OAuthError`]. Failing to reach the platform or to decode its answer is a
//! [`TransportError`] and never an `OAuthError`.

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TransportError;

/// Marks requests as coming from a native client rather than a browser.
pub const NATIVE_CLIENT_HEADER: &str = "X-CENTRIFY-NATIVE-CLIENT";
/// Identifies the calling application for platform-side telemetry.
pub const SOURCE_HEADER: &str = "X-CFY-SRC";
pub const DEFAULT_SOURCE: &str = "vault-auth-plugin";

const TOKEN_PATH: &str = "/oauth2/token/";

/// Successful answer from the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Value for the `Authorization` header of follow-up REST calls.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Grant failure reported by the platform (`error` / `error_description`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{error}: {description}")]
pub struct OAuthError {
    #[serde(default)]
    pub error: String,
    #[serde(rename = "error_description", default)]
    pub description: String,
}

/// What the token endpoint answered, once it could be reached and decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted(TokenResponse),
    Rejected(OAuthError),
}

impl GrantOutcome {
    pub fn into_result(self) -> Result<TokenResponse, OAuthError> {
        match self {
            GrantOutcome::Granted(token) => Ok(token),
            GrantOutcome::Rejected(failure) => Err(failure),
        }
    }
}

/// OAuth2 client bound to one tenant.
///
/// Each instance owns its own cookie jar, so platforms that pin a token
/// exchange to a node through cookies keep working across calls on the same
/// instance while separate instances never see each other's cookies.
pub struct OAuthClient {
    service: String,
    http: reqwest::Client,
    headers: HeaderMap,
    client_id: String,
    client_secret: String,
    source: String,
}

impl OAuthClient {
    /// Public client: no Basic auth is sent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn new(service: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(TransportError::Client)?;

        Ok(Self {
            service: service.into().trim_end_matches('/').to_string(),
            http,
            headers: HeaderMap::new(),
            client_id: String::new(),
            client_secret: String::new(),
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Confidential client authenticating with HTTP Basic auth.
    ///
    /// Basic auth is only attached when both `client_id` and `client_secret`
    /// are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn confidential(
        service: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let mut client = Self::new(service)?;
        client.client_id = client_id.into();
        client.client_secret = client_secret.into();
        Ok(client)
    }

    /// Override the `X-CFY-SRC` value (default: `vault-auth-plugin`).
    #[must_use]
    pub fn with_source_header(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Extra headers sent on every token request.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Resource owner password credentials grant (`grant_type=password`).
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the platform cannot be reached or its
    /// answer is not valid JSON.
    #[tracing::instrument(skip(self, password), fields(service = %self.service))]
    pub async fn resource_owner(
        &self,
        app_id: &str,
        scope: &str,
        username: &str,
        password: &str,
    ) -> Result<GrantOutcome, TransportError> {
        let params = [
            ("grant_type", "password"),
            ("username", username),
            ("password", password),
            ("scope", scope),
        ];
        self.post_token(app_id, &params).await
    }

    /// Client credentials grant (`grant_type=client_credentials`).
    ///
    /// # Errors
    ///
    /// See [`OAuthClient::resource_owner`].
    #[tracing::instrument(skip(self), fields(service = %self.service))]
    pub async fn client_credentials(
        &self,
        app_id: &str,
        scope: &str,
    ) -> Result<GrantOutcome, TransportError> {
        let params = [("grant_type", "client_credentials"), ("scope", scope)];
        self.post_token(app_id, &params).await
    }

    /// Refresh token grant (`grant_type=refresh_token`).
    ///
    /// # Errors
    ///
    /// See [`OAuthClient::resource_owner`].
    #[tracing::instrument(skip(self, refresh_token), fields(service = %self.service))]
    pub async fn refresh_token(
        &self,
        app_id: &str,
        refresh_token: &str,
    ) -> Result<GrantOutcome, TransportError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.post_token(app_id, &params).await
    }

    async fn post_token(
        &self,
        app_id: &str,
        params: &[(&str, &str)],
    ) -> Result<GrantOutcome, TransportError> {
        let url = format!("{}{}{}", self.service, TOKEN_PATH, app_id);

        let mut request = self
            .http
            .post(&url)
            .header(NATIVE_CLIENT_HEADER, "Yes")
            .header(SOURCE_HEADER, self.source.as_str())
            .headers(self.headers.clone())
            .form(params);

        if !self.client_id.is_empty() && !self.client_secret.is_empty() {
            request = request.basic_auth(&self.client_id, Some(&self.client_secret));
        }

        let response = request
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        if status == StatusCode::OK {
            let token = serde_json::from_slice::<TokenResponse>(&body)
                .map_err(|source| TransportError::InvalidJson { url, source })?;
            if token.expires_in == 0 {
                tracing::warn!(
                    service = %self.service,
                    "token granted without a lifetime, lease TTL will be 0"
                );
            }
            return Ok(GrantOutcome::Granted(token));
        }

        tracing::debug!(%status, "token endpoint rejected grant");
        let failure = serde_json::from_slice::<OAuthError>(&body)
            .map_err(|source| TransportError::InvalidJson { url, source })?;
        Ok(GrantOutcome::Rejected(failure))
    }
}
