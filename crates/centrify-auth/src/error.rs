use reqwest::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::oauth::OAuthError;
use crate::storage::StorageError;

/// Failure to talk to the identity platform at all.
///
/// Kept apart from [`OAuthError`] so a platform that answered "no" is never
/// confused with a platform that could not be reached.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Invalid JSON body from {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum RestError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("HTTP status {status} from {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: &'static str,
    },
    /// The envelope decoded but reported `success=false`.
    #[error("{endpoint} failed: {message}")]
    Api {
        endpoint: &'static str,
        message: String,
    },
    #[error("Unexpected payload shape from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("missing username")]
    MissingUsername,
    #[error("missing password")]
    MissingPassword,
    #[error("Invalid mode or no mode provided: {0}")]
    InvalidMode(String),
    #[error("backend is not configured")]
    NotConfigured,
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("authentication failed")]
    Transport(#[source] TransportError),
    #[error("OAuth2 token request failed: {0}")]
    OAuthRejection(#[source] OAuthError),
    #[error("authentication failed: unable to resolve identity")]
    IdentityLookup(#[source] RestError),
}

impl LoginError {
    /// Errors caused by the submitted request rather than the platform.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            LoginError::MissingUsername | LoginError::MissingPassword | LoginError::InvalidMode(_)
        )
    }

    /// Errors a host should present as a failed authentication.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            LoginError::Transport(_) | LoginError::OAuthRejection(_) | LoginError::IdentityLookup(_)
        )
    }
}
