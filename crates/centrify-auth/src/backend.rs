use crate::config::{CentrifyConfig, ConfigError, ConfigUpdate, WriteOperation, apply_update};
use crate::error::{LoginError, TransportError};
use crate::login::{Authenticator, LoginRequest, alias_lookahead};
use crate::response::{Alias, AuthResponse};
use crate::storage::{Storage, load_config_record, save_config_record};

/// The auth backend as seen by its host: config read/write, login and alias
/// lookahead over a host-supplied [`Storage`].
///
/// Every operation reloads the stored configuration, so a config write is
/// picked up by the next login without any restart.
pub struct CentrifyBackend<S: Storage> {
    storage: S,
    authenticator: Authenticator,
}

impl<S: Storage> CentrifyBackend<S> {
    /// # Errors
    ///
    /// Returns [`TransportError::Client`] if the HTTP client cannot be built.
    pub fn new(storage: S) -> Result<Self, TransportError> {
        Ok(Self {
            storage,
            authenticator: Authenticator::new()?,
        })
    }

    #[must_use]
    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Current configuration, `None` if nothing was written yet.
    pub async fn read_config(&self) -> Result<Option<CentrifyConfig>, ConfigError> {
        Ok(load_config_record(&self.storage).await?)
    }

    /// Create or update the stored configuration.
    ///
    /// Nothing is written when the merged configuration fails validation.
    #[tracing::instrument(skip(self, update), fields(operation = ?op))]
    pub async fn write_config(
        &self,
        op: WriteOperation,
        update: ConfigUpdate,
    ) -> Result<CentrifyConfig, ConfigError> {
        let existing = load_config_record(&self.storage).await?;
        let config = apply_update(existing.as_ref(), op, update).inspect_err(|e| {
            tracing::warn!(error = %e, "rejected configuration write");
        })?;
        save_config_record(&self.storage, &config).await?;

        tracing::info!(
            service_url = %config.service_url,
            app_id = %config.app_id,
            policies = ?config.static_policies,
            roles_as_policies = config.roles_as_policies,
            "configuration saved"
        );
        Ok(config)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, LoginError> {
        let config = load_config_record(&self.storage).await?;
        self.authenticator.login(config.as_ref(), request).await
    }

    pub fn alias_lookahead(&self, username: &str) -> Result<Alias, LoginError> {
        alias_lookahead(username)
    }
}
