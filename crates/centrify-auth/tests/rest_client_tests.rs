use centrify_auth::error::RestError;
use centrify_auth::oauth::TokenResponse;
use centrify_auth::rest::{ROLES_AND_RIGHTS_PATH, RestClient, WHOAMI_PATH};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token() -> TokenResponse {
    TokenResponse {
        access_token: "at-123".into(),
        token_type: "Bearer".into(),
        expires_in: 3600,
        refresh_token: None,
    }
}

fn client(server: &MockServer) -> RestClient {
    RestClient::new(reqwest::Client::new(), server.uri(), &token())
}

#[tokio::test]
async fn test_who_am_i_sends_bearer_and_fixed_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WHOAMI_PATH))
        .and(header("authorization", "Bearer at-123"))
        .and(header("X-CENTRIFY-NATIVE-CLIENT", "Yes"))
        .and(header("X-CFY-SRC", "vault-auth-plugin"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "Result": {"User": "alice@acme.example", "UserUuid": "c2c7bcc6-9560"},
            "Message": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let who = client(&server).who_am_i().await.unwrap();
    assert_eq!(who.user, "alice@acme.example");
    assert_eq!(who.user_uuid, "c2c7bcc6-9560");
}

#[tokio::test]
async fn test_roles_keep_platform_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ROLES_AND_RIGHTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "Result": {
                "Count": 3,
                "Results": [
                    {"Row": {"Name": "System Administrator"}},
                    {"Row": {"Name": "Database Admin"}},
                    {"Row": {"Name": "Everybody"}}
                ]
            }
        })))
        .mount(&server)
        .await;

    let roles = client(&server).roles_and_rights().await.unwrap();
    assert_eq!(
        roles,
        vec!["System Administrator", "Database Admin", "Everybody"]
    );
}

#[tokio::test]
async fn test_unsuccessful_envelope_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WHOAMI_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "Result": null,
            "Message": "Not authenticated"
        })))
        .mount(&server)
        .await;

    let err = client(&server).who_am_i().await.unwrap_err();
    match err {
        RestError::Api { endpoint, message } => {
            assert_eq!(endpoint, WHOAMI_PATH);
            assert_eq!(message, "Not authenticated");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_unexpected_result_shape_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ROLES_AND_RIGHTS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "Result": {"Results": "nope"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).roles_and_rights().await.unwrap_err();
    assert!(matches!(err, RestError::Decode { .. }));
}

#[tokio::test]
async fn test_http_failure_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WHOAMI_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client(&server).who_am_i().await.unwrap_err();
    assert!(matches!(
        err,
        RestError::Http { status, .. } if status == StatusCode::UNAUTHORIZED
    ));
}

#[tokio::test]
async fn test_generic_call_forwards_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(WHOAMI_PATH))
        .and(body_json(json!({"Args": {"PageSize": 10}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Success": true,
            "Result": 42
        })))
        .expect(1)
        .mount(&server)
        .await;

    let args = json!({"Args": {"PageSize": 10}});
    let value: u32 = client(&server)
        .call_generic_map_api(WHOAMI_PATH, Some(&args))
        .await
        .unwrap();
    assert_eq!(value, 42);
}
