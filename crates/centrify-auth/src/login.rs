//! Username/password login against the identity platform.
//!
//! A login walks through [`LoginState`]:
//!
//! ```text
//! ValidatingInput -> AcquiringToken -> ResolvingIdentity -> Assembling -> Done
//! ```
//!
//! Any step may abort with a [`LoginError`]; no partial result is returned.
//! Input validation never touches the network. Identity lookup is mandatory
//! while role enumeration is best-effort: a failed role query is logged and
//! the login continues with no roles.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::config::CentrifyConfig;
use crate::error::{LoginError, TransportError};
use crate::oauth::{DEFAULT_SOURCE, OAuthClient, TokenResponse};
use crate::response::{Alias, AuthResponse, InternalData, LeaseOptions};
use crate::rest::RestClient;

/// How the submitted credentials are presented to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// `ro`: the user is the resource owner; the configured client
    /// authenticates the request.
    #[default]
    ResourceOwner,
    /// `cc`: the user's credentials are themselves a confidential client.
    ClientCredentials,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ResourceOwner => "ro",
            AuthMode::ClientCredentials => "cc",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = LoginError;

    /// An empty string selects the default mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "ro" => Ok(AuthMode::ResourceOwner),
            "cc" => Ok(AuthMode::ClientCredentials),
            other => Err(LoginError::InvalidMode(other.to_string())),
        }
    }
}

/// Login request as submitted by the host.
#[derive(Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            mode: None,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .finish()
    }
}

/// Identity resolved from the platform for one login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub unique_id: String,
    /// Platform-reported username, lower-cased.
    pub username: String,
    pub roles: Vec<String>,
}

/// Input that passed validation, ready to be sent to the platform.
#[derive(Clone)]
pub struct ValidatedLogin {
    username: String,
    password: String,
    mode: AuthMode,
    config: CentrifyConfig,
}

impl fmt::Debug for ValidatedLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedLogin")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mode", &self.mode)
            .field("config", &self.config)
            .finish()
    }
}

impl ValidatedLogin {
    /// Lower-cased submitted username.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn config(&self) -> &CentrifyConfig {
        &self.config
    }
}

pub enum LoginState {
    ValidatingInput,
    AcquiringToken(ValidatedLogin),
    ResolvingIdentity(ValidatedLogin, TokenResponse),
    Assembling(ValidatedLogin, TokenResponse, UserInfo),
    Done(AuthResponse),
}

impl LoginState {
    pub fn name(&self) -> &'static str {
        match self {
            LoginState::ValidatingInput => "validating_input",
            LoginState::AcquiringToken(..) => "acquiring_token",
            LoginState::ResolvingIdentity(..) => "resolving_identity",
            LoginState::Assembling(..) => "assembling",
            LoginState::Done(_) => "done",
        }
    }
}

/// Canonical form of a username for alias naming and comparisons.
pub fn canonical_username(username: &str) -> String {
    username.to_lowercase()
}

/// Policy name granted for a role when roles double as policies.
pub fn role_policy_name(role: &str) -> String {
    role.replace(' ', "_")
}

/// Alias a full login with `username` would produce, without any network call.
///
/// # Errors
///
/// Returns [`LoginError::MissingUsername`] for an empty username.
pub fn alias_lookahead(username: &str) -> Result<Alias, LoginError> {
    let username = canonical_username(username);
    if username.is_empty() {
        return Err(LoginError::MissingUsername);
    }
    Ok(Alias::new(username))
}

/// Check the request and configuration before anything is sent.
///
/// # Errors
///
/// - [`LoginError::MissingPassword`] for an empty password
/// - [`LoginError::InvalidMode`] for a mode other than `ro`/`cc`
/// - [`LoginError::NotConfigured`] when no configuration was stored
/// - [`LoginError::Configuration`] when the stored record lacks credentials
///   or a service URL
pub fn validate(
    config: Option<&CentrifyConfig>,
    request: &LoginRequest,
) -> Result<ValidatedLogin, LoginError> {
    if request.password.is_empty() {
        return Err(LoginError::MissingPassword);
    }
    let mode = request.mode.as_deref().unwrap_or_default().parse()?;
    let config = config.ok_or(LoginError::NotConfigured)?;
    config.require_fields()?;

    Ok(ValidatedLogin {
        username: canonical_username(&request.username),
        password: request.password.clone(),
        mode,
        config: config.clone(),
    })
}

/// Build the login result from the token and resolved identity.
pub fn assemble(login: &ValidatedLogin, token: TokenResponse, user: UserInfo) -> AuthResponse {
    let config = &login.config;

    let mut policies = config.static_policies.clone();
    if config.roles_as_policies {
        policies.extend(user.roles.iter().map(|role| role_policy_name(role)));
    }

    let group_aliases = user.roles.iter().cloned().map(Alias::new).collect();

    let mut metadata = BTreeMap::new();
    metadata.insert("username".to_string(), user.username);
    metadata.insert("user_uuid".to_string(), user.unique_id);

    AuthResponse {
        display_name: login.username.clone(),
        policies,
        metadata,
        lease: LeaseOptions::non_renewable(token.expires_in),
        internal_data: InternalData {
            access_token: token,
        },
        alias: Alias::new(login.username.clone()),
        group_aliases,
    }
}

/// Drives logins against the platform.
///
/// Holds only a pooled HTTP client for the REST calls and the source header;
/// nothing learned during one login is kept for the next.
#[derive(Clone)]
pub struct Authenticator {
    http: reqwest::Client,
    source: String,
}

impl Authenticator {
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(TransportError::Client)?;
        Ok(Self {
            http,
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    /// Use a custom HTTP client for the REST calls.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    #[must_use]
    pub fn with_source_header(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn source_header(&self) -> &str {
        &self.source
    }

    /// Run a full login.
    ///
    /// # Errors
    ///
    /// Any [`LoginError`]; see the module documentation for which failures
    /// are fatal.
    #[tracing::instrument(skip_all, fields(username = %request.username))]
    pub async fn login(
        &self,
        config: Option<&CentrifyConfig>,
        request: &LoginRequest,
    ) -> Result<AuthResponse, LoginError> {
        let mut state = LoginState::ValidatingInput;
        loop {
            tracing::debug!(state = state.name(), "login step");
            state = match state {
                LoginState::ValidatingInput => {
                    LoginState::AcquiringToken(validate(config, request)?)
                }
                LoginState::AcquiringToken(login) => {
                    let token = self.acquire_token(&login).await?;
                    LoginState::ResolvingIdentity(login, token)
                }
                LoginState::ResolvingIdentity(login, token) => {
                    let user = self.resolve_identity(&login, &token).await?;
                    LoginState::Assembling(login, token, user)
                }
                LoginState::Assembling(login, token, user) => {
                    LoginState::Done(assemble(&login, token, user))
                }
                LoginState::Done(response) => {
                    tracing::info!(
                        alias = %response.alias.name,
                        policies = response.policies.len(),
                        groups = response.group_aliases.len(),
                        "login succeeded"
                    );
                    return Ok(response);
                }
            };
        }
    }

    async fn acquire_token(&self, login: &ValidatedLogin) -> Result<TokenResponse, LoginError> {
        let config = &login.config;

        let outcome = match login.mode {
            AuthMode::ResourceOwner => {
                let client = OAuthClient::confidential(
                    &config.service_url,
                    &config.client_id,
                    &config.client_secret,
                )
                .map_err(transport_failure)?
                .with_source_header(&self.source);
                client
                    .resource_owner(&config.app_id, &config.scope, &login.username, &login.password)
                    .await
            }
            AuthMode::ClientCredentials => {
                let client =
                    OAuthClient::confidential(&config.service_url, &login.username, &login.password)
                        .map_err(transport_failure)?
                        .with_source_header(&self.source);
                client.client_credentials(&config.app_id, &config.scope).await
            }
        };

        outcome
            .map_err(transport_failure)?
            .into_result()
            .map_err(|rejection| {
                tracing::warn!(
                    error = %rejection.error,
                    mode = %login.mode,
                    "token request rejected"
                );
                LoginError::OAuthRejection(rejection)
            })
    }

    async fn resolve_identity(
        &self,
        login: &ValidatedLogin,
        token: &TokenResponse,
    ) -> Result<UserInfo, LoginError> {
        let rest = RestClient::new(self.http.clone(), &login.config.service_url, token)
            .with_source_header(&self.source);

        let who = rest.who_am_i().await.map_err(|e| {
            tracing::error!(error = %e, "identity lookup failed");
            LoginError::IdentityLookup(e)
        })?;

        let roles = match rest.roles_and_rights().await {
            Ok(roles) => roles,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    username = %login.username,
                    "role lookup failed, continuing without roles"
                );
                Vec::new()
            }
        };

        Ok(UserInfo {
            unique_id: who.user_uuid,
            username: canonical_username(&who.user),
            roles,
        })
    }
}

fn transport_failure(e: TransportError) -> LoginError {
    tracing::error!(error = %e, "token request transport failure");
    LoginError::Transport(e)
}
