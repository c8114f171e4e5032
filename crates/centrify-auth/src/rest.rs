//! Bearer-authenticated calls against the platform's generic REST API.
//!
//! Every endpoint answers with the same envelope (`success`, `Result`,
//! `Message`). The envelope is decoded first, then `Result` is decoded into
//! the typed shape the caller asked for, so business logic only ever sees
//! typed values.

use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{RestError, TransportError};
use crate::oauth::{DEFAULT_SOURCE, NATIVE_CLIENT_HEADER, SOURCE_HEADER, TokenResponse};

pub const WHOAMI_PATH: &str = "/security/whoami";
pub const ROLES_AND_RIGHTS_PATH: &str = "/usermgmt/GetUsersRolesAndAdministrativeRights";

/// Common response envelope of the platform REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope {
    #[serde(alias = "Success")]
    pub success: bool,
    #[serde(rename = "Result", default)]
    pub result: Option<JsonValue>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

/// Identity of the token holder as reported by `/security/whoami`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WhoAmI {
    #[serde(rename = "User")]
    pub user: String,
    #[serde(rename = "UserUuid")]
    pub user_uuid: String,
}

/// Tabular result: `{"Results": [{"Row": {...}}, ...]}`.
#[derive(Debug, Deserialize)]
struct QueryResult<R> {
    #[serde(rename = "Results")]
    results: Vec<ResultRow<R>>,
}

#[derive(Debug, Deserialize)]
struct ResultRow<R> {
    #[serde(rename = "Row")]
    row: R,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    #[serde(rename = "Name")]
    name: String,
}

/// REST client carrying one access token.
///
/// Built per login attempt; the underlying `reqwest::Client` may be shared
/// for connection pooling since it holds no cookies or credentials.
pub struct RestClient {
    service: String,
    http: reqwest::Client,
    authorization: String,
    source: String,
}

impl RestClient {
    pub fn new(http: reqwest::Client, service: impl Into<String>, token: &TokenResponse) -> Self {
        Self {
            service: service.into().trim_end_matches('/').to_string(),
            http,
            authorization: token.authorization(),
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    #[must_use]
    pub fn with_source_header(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// POST `args` (or `{}`) to `endpoint` and decode the envelope's `Result`
    /// into `T`.
    ///
    /// # Errors
    ///
    /// - [`RestError::Transport`] if the request cannot be sent or read
    /// - [`RestError::Http`] on a non-success HTTP status
    /// - [`RestError::Api`] if the envelope reports `success=false`
    /// - [`RestError::Decode`] if the envelope or `Result` has the wrong shape
    pub async fn call_generic_map_api<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        args: Option<&JsonValue>,
    ) -> Result<T, RestError> {
        let url = format!("{}{}", self.service, endpoint);
        let empty = JsonValue::Object(serde_json::Map::new());

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.authorization.as_str())
            .header(NATIVE_CLIENT_HEADER, "Yes")
            .header(SOURCE_HEADER, self.source.as_str())
            .json(args.unwrap_or(&empty))
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestError::Http { status, endpoint });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| TransportError::Request { url, source })?;

        let envelope: ApiEnvelope = serde_json::from_slice(&body)
            .map_err(|source| RestError::Decode { endpoint, source })?;

        if !envelope.success {
            return Err(RestError::Api {
                endpoint,
                message: envelope.message.unwrap_or_default(),
            });
        }

        serde_json::from_value(envelope.result.unwrap_or(JsonValue::Null))
            .map_err(|source| RestError::Decode { endpoint, source })
    }

    /// Username and unique id of the token holder.
    ///
    /// # Errors
    ///
    /// See [`RestClient::call_generic_map_api`].
    #[tracing::instrument(skip(self), fields(service = %self.service))]
    pub async fn who_am_i(&self) -> Result<WhoAmI, RestError> {
        self.call_generic_map_api(WHOAMI_PATH, None).await
    }

    /// Names of the roles the token holder belongs to, in platform order.
    ///
    /// # Errors
    ///
    /// See [`RestClient::call_generic_map_api`].
    #[tracing::instrument(skip(self), fields(service = %self.service))]
    pub async fn roles_and_rights(&self) -> Result<Vec<String>, RestError> {
        let rows: QueryResult<RoleRow> = self
            .call_generic_map_api(ROLES_AND_RIGHTS_PATH, None)
            .await?;
        Ok(rows.results.into_iter().map(|r| r.row.name).collect())
    }
}
