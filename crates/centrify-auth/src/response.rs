use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::oauth::TokenResponse;

/// Identity alias the host maps onto its own entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
}

impl Alias {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseOptions {
    pub ttl_seconds: u64,
    pub renewable: bool,
}

impl LeaseOptions {
    pub fn non_renewable(ttl_seconds: u64) -> Self {
        Self {
            ttl_seconds,
            renewable: false,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Opaque data kept by the host alongside the issued credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalData {
    pub access_token: TokenResponse,
}

/// Result of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub display_name: String,
    pub policies: Vec<String>,
    pub metadata: BTreeMap<String, String>,
    pub internal_data: InternalData,
    pub lease: LeaseOptions,
    pub alias: Alias,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_aliases: Vec<Alias>,
}

impl AuthResponse {
    pub fn group_alias_names(&self) -> impl Iterator<Item = &str> {
        self.group_aliases.iter().map(|a| a.name.as_str())
    }
}
