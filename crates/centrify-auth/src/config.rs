use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::login::LoginRequest;
use crate::oauth::DEFAULT_SOURCE;
use crate::storage::StorageError;

pub const DEFAULT_APP_ID: &str = "vault_io_auth";
pub const DEFAULT_SCOPE: &str = "vault_io_auth";
pub const DEFAULT_POLICY: &str = "centrify";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config parameter `{0}` cannot be empty")]
    MissingField(&'static str),
    #[error("Error parsing given service_url {url:?}: {source}")]
    InvalidServiceUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("service_url {0:?} must be an https URL with a host")]
    NotHttps(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
}

/// Backend configuration for one mount, persisted by the storage layer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentrifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub service_url: String,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default, alias = "policies")]
    pub static_policies: Vec<String>,
    #[serde(default)]
    pub roles_as_policies: bool,
}

fn default_app_id() -> String {
    DEFAULT_APP_ID.to_string()
}

fn default_scope() -> String {
    DEFAULT_SCOPE.to_string()
}

impl Default for CentrifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            service_url: String::new(),
            app_id: default_app_id(),
            scope: default_scope(),
            static_policies: vec![DEFAULT_POLICY.to_string()],
            roles_as_policies: false,
        }
    }
}

impl fmt::Debug for CentrifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CentrifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("service_url", &self.service_url)
            .field("app_id", &self.app_id)
            .field("scope", &self.scope)
            .field("static_policies", &self.static_policies)
            .field("roles_as_policies", &self.roles_as_policies)
            .finish()
    }
}

impl CentrifyConfig {
    /// Checks the invariants a stored configuration must hold.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] for empty credentials or URL and
    /// [`ConfigError::InvalidServiceUrl`] / [`ConfigError::NotHttps`] for a
    /// URL that is not an absolute https URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_fields()?;
        validate_service_url(&self.service_url)
    }

    /// Check that the credentials and service URL are present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] naming the first empty field.
    pub fn require_fields(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingField("client_id"));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::MissingField("client_secret"));
        }
        if self.service_url.is_empty() {
            return Err(ConfigError::MissingField("service_url"));
        }
        Ok(())
    }
}

/// How a [`ConfigUpdate`] is merged with what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    /// Fields absent from the update take their defaults.
    Create,
    /// Fields absent from the update keep their stored value.
    Update,
}

/// Policies given either as a list or as a comma-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PolicyList {
    List(Vec<String>),
    Csv(String),
}

impl PolicyList {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            PolicyList::List(items) => items
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
            PolicyList::Csv(raw) => parse_policy_list(&raw),
        }
    }
}

/// Partial configuration submitted by a config write.
#[derive(Clone, Default, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, alias = "static_policies")]
    pub policies: Option<PolicyList>,
    #[serde(default)]
    pub roles_as_policies: Option<bool>,
}

impl fmt::Debug for ConfigUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigUpdate")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("service_url", &self.service_url)
            .field("app_id", &self.app_id)
            .field("scope", &self.scope)
            .field("policies", &self.policies)
            .field("roles_as_policies", &self.roles_as_policies)
            .finish()
    }
}

/// Merge `update` into the stored configuration and validate the result.
///
/// An `Update` without anything stored behaves like a `Create`.
///
/// # Errors
///
/// Returns a [`ConfigError`] when a required field ends up empty or the
/// service URL does not parse after normalization.
pub fn apply_update(
    existing: Option<&CentrifyConfig>,
    operation: WriteOperation,
    update: ConfigUpdate,
) -> Result<CentrifyConfig, ConfigError> {
    let mut config = match (operation, existing) {
        (WriteOperation::Update, Some(current)) => current.clone(),
        _ => CentrifyConfig::default(),
    };

    if let Some(client_id) = update.client_id {
        config.client_id = client_id;
    }
    if let Some(client_secret) = update.client_secret {
        config.client_secret = client_secret;
    }
    if let Some(service_url) = update.service_url {
        config.service_url = service_url;
    }
    if let Some(app_id) = update.app_id {
        config.app_id = app_id;
    }
    if let Some(scope) = update.scope {
        config.scope = scope;
    }
    if let Some(policies) = update.policies {
        config.static_policies = policies.into_vec();
    }
    if let Some(roles_as_policies) = update.roles_as_policies {
        config.roles_as_policies = roles_as_policies;
    }

    if config.app_id.is_empty() {
        config.app_id = default_app_id();
    }
    if config.scope.is_empty() {
        config.scope = default_scope();
    }
    if !config.service_url.is_empty() {
        config.service_url = normalize_service_url(&config.service_url);
    }

    config.validate()?;
    Ok(config)
}

/// Force `https://` and drop trailing slashes.
///
/// Any number of leading `http://` / `https://` prefixes are removed first, so
/// `https://https://tenant/` still becomes `https://tenant`.
pub fn normalize_service_url(raw: &str) -> String {
    let mut rest = raw.trim();
    while let Some(stripped) =
        strip_scheme(rest, "https://").or_else(|| strip_scheme(rest, "http://"))
    {
        rest = stripped;
    }
    format!("https://{}", rest.trim_end_matches('/'))
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let prefix = value.get(..scheme.len())?;
    prefix
        .eq_ignore_ascii_case(scheme)
        .then(|| &value[scheme.len()..])
}

fn validate_service_url(service_url: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(service_url).map_err(|source| ConfigError::InvalidServiceUrl {
        url: service_url.to_string(),
        source,
    })?;
    if parsed.scheme() != "https" || parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::NotHttps(service_url.to_string()));
    }
    Ok(())
}

/// Split a comma-separated policy list, trimming blanks.
pub fn parse_policy_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Settings for the `centrify-login` binary.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub centrify: ConfigUpdate,
    pub login: LoginRequest,
    #[serde(default = "default_source_header")]
    pub source_header: String,
}

fn default_source_header() -> String {
    DEFAULT_SOURCE.to_string()
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Environment variables use the `CENTRIFY` prefix and double underscores as
/// key separators (e.g. `CENTRIFY__LOGIN__PASSWORD`).
///
/// Returns a `ConfigError` instead of panicking so the caller can decide how to fail.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from("config.yaml")
}

/// Same as [`load_config`] with an explicit file path. The file is optional
/// so everything can come from the environment.
pub fn load_config_from(path: &str) -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(Environment::with_prefix("CENTRIFY").separator("__"))
        .build()?;

    Ok(cfg.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_update() -> ConfigUpdate {
        ConfigUpdate {
            client_id: Some("vault-client@acme".into()),
            client_secret: Some("s3cret".into()),
            service_url: Some("acme.my.centrify.com/".into()),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_adds_scheme() {
        assert_eq!(
            normalize_service_url("acme.my.centrify.com"),
            "https://acme.my.centrify.com"
        );
    }

    #[test]
    fn normalize_rewrites_http_and_trailing_slash() {
        assert_eq!(
            normalize_service_url("http://acme.my.centrify.com/"),
            "https://acme.my.centrify.com"
        );
        assert_eq!(
            normalize_service_url("https://acme.my.centrify.com//"),
            "https://acme.my.centrify.com"
        );
    }

    #[test]
    fn normalize_never_duplicates_scheme() {
        assert_eq!(
            normalize_service_url("https://https://acme.my.centrify.com"),
            "https://acme.my.centrify.com"
        );
        assert_eq!(
            normalize_service_url("HTTPS://acme.my.centrify.com"),
            "https://acme.my.centrify.com"
        );
    }

    #[test]
    fn create_fills_defaults() {
        let config = apply_update(None, WriteOperation::Create, full_update()).unwrap();
        assert_eq!(config.service_url, "https://acme.my.centrify.com");
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.scope, DEFAULT_SCOPE);
        assert_eq!(config.static_policies, vec![DEFAULT_POLICY.to_string()]);
        assert!(!config.roles_as_policies);
    }

    #[test]
    fn create_requires_credentials() {
        let mut update = full_update();
        update.client_secret = None;
        let err = apply_update(None, WriteOperation::Create, update).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField("client_secret")));
        assert_eq!(err.to_string(), "config parameter `client_secret` cannot be empty");
    }

    #[test]
    fn update_keeps_unspecified_fields() {
        let mut first = full_update();
        first.roles_as_policies = Some(true);
        first.policies = Some(PolicyList::Csv("ops, dev".into()));
        let stored = apply_update(None, WriteOperation::Create, first).unwrap();

        let second = ConfigUpdate {
            scope: Some("all".into()),
            ..Default::default()
        };
        let updated = apply_update(Some(&stored), WriteOperation::Update, second).unwrap();
        assert_eq!(updated.scope, "all");
        assert_eq!(updated.client_id, "vault-client@acme");
        assert!(updated.roles_as_policies);
        assert_eq!(updated.static_policies, vec!["ops", "dev"]);
    }

    #[test]
    fn create_ignores_stored_values() {
        let mut first = full_update();
        first.roles_as_policies = Some(true);
        let stored = apply_update(None, WriteOperation::Create, first).unwrap();

        let recreated = apply_update(Some(&stored), WriteOperation::Create, full_update()).unwrap();
        assert!(!recreated.roles_as_policies);
    }

    #[test]
    fn empty_app_id_falls_back_to_sentinel() {
        let mut update = full_update();
        update.app_id = Some(String::new());
        update.scope = Some(String::new());
        let config = apply_update(None, WriteOperation::Create, update).unwrap();
        assert_eq!(config.app_id, DEFAULT_APP_ID);
        assert_eq!(config.scope, DEFAULT_SCOPE);
    }

    #[test]
    fn service_url_with_space_in_host_is_rejected() {
        let mut update = full_update();
        update.service_url = Some("acme tenant".into());
        let err = apply_update(None, WriteOperation::Create, update).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidServiceUrl { .. }));
    }

    #[test]
    fn parse_policy_list_drops_blanks() {
        assert_eq!(parse_policy_list(" a, ,b,"), vec!["a", "b"]);
        assert!(parse_policy_list("").is_empty());
    }

    #[test]
    fn debug_redacts_secret() {
        let config = apply_update(None, WriteOperation::Create, full_update()).unwrap();
        assert!(!format!("{:?}", config).contains("s3cret"));
        assert!(!format!("{:?}", full_update()).contains("s3cret"));
    }
}
