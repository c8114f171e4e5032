use centrify_auth::config::ConfigError;
use centrify_auth::error::{LoginError, RestError, TransportError};
use centrify_auth::oauth::OAuthError;
use centrify_auth::storage::StorageError;
use reqwest::StatusCode;
use std::error::Error;

#[test]
fn test_input_errors_display() {
    assert_eq!(LoginError::MissingUsername.to_string(), "missing username");
    assert_eq!(LoginError::MissingPassword.to_string(), "missing password");
    assert_eq!(
        LoginError::InvalidMode("xx".into()).to_string(),
        "Invalid mode or no mode provided: xx"
    );
    assert_eq!(
        LoginError::NotConfigured.to_string(),
        "backend is not configured"
    );

    assert!(LoginError::MissingPassword.is_input_error());
    assert!(LoginError::InvalidMode("xx".into()).is_input_error());
    assert!(!LoginError::NotConfigured.is_input_error());
    assert!(!LoginError::NotConfigured.is_authentication_failure());
}

#[test]
fn test_oauth_rejection_carries_platform_error() {
    let err = LoginError::OAuthRejection(OAuthError {
        error: "invalid_client".into(),
        description: "Client authentication failed".into(),
    });
    assert_eq!(
        err.to_string(),
        "OAuth2 token request failed: invalid_client: Client authentication failed"
    );
    assert!(err.is_authentication_failure());
    assert!(!err.is_input_error());
    assert!(err.source().is_some());
}

#[test]
fn test_identity_lookup_hides_details() {
    let err = LoginError::IdentityLookup(RestError::Http {
        status: StatusCode::FORBIDDEN,
        endpoint: "/security/whoami",
    });
    assert_eq!(
        err.to_string(),
        "authentication failed: unable to resolve identity"
    );
    let source = err.source().unwrap().to_string();
    assert!(source.contains("403"));
    assert!(source.contains("/security/whoami"));
}

#[test]
fn test_rest_api_error_display() {
    let err = RestError::Api {
        endpoint: "/usermgmt/GetUsersRolesAndAdministrativeRights",
        message: "Access denied".into(),
    };
    assert_eq!(
        err.to_string(),
        "/usermgmt/GetUsersRolesAndAdministrativeRights failed: Access denied"
    );
}

#[test]
fn test_transport_json_error_display() {
    let source = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
    let err = TransportError::InvalidJson {
        url: "https://acme.my.centrify.com/oauth2/token/vault_io_auth".into(),
        source,
    };
    assert!(err.to_string().starts_with(
        "Invalid JSON body from https://acme.my.centrify.com/oauth2/token/vault_io_auth"
    ));

    let wrapped = RestError::from(err);
    assert!(wrapped.to_string().contains("Invalid JSON body"));
}

#[test]
fn test_config_errors_convert_into_login_errors() {
    let err: LoginError = ConfigError::MissingField("client_id").into();
    assert_eq!(err.to_string(), "config parameter `client_id` cannot be empty");

    let storage: LoginError = StorageError::Backend("disk full".into()).into();
    assert!(storage.to_string().contains("disk full"));
}
