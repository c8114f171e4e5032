//! Login core for authenticating against a Centrify Identity Platform tenant.
//!
//! This library exchanges a username and password for an OAuth2 access token,
//! resolves the caller's identity and roles through the platform REST API,
//! and turns them into an [`AuthResponse`] carrying policies, aliases and a
//! lease. Configuration is kept in a host-supplied [`Storage`].

pub mod backend;
pub mod config;
pub mod error;
pub mod login;
pub mod oauth;
pub mod response;
pub mod rest;
pub mod storage;

pub use backend::CentrifyBackend;
pub use config::{CentrifyConfig, ConfigError, ConfigUpdate, WriteOperation};
pub use error::{LoginError, RestError, TransportError};
pub use login::{AuthMode, Authenticator, LoginRequest};
pub use oauth::{GrantOutcome, OAuthClient, OAuthError, TokenResponse};
pub use response::{Alias, AuthResponse, LeaseOptions};
pub use rest::RestClient;
pub use storage::{MemoryStorage, Storage, StorageError};
