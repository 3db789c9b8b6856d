use integration_sync::auth::{AuthError, SessionAuthenticator, SessionClient};
use serde_json::json;
mod test_utils;
use test_utils::{ACCESS_TOKEN, identity, mount_session};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

#[tokio::test]
async fn exchanges_credentials_for_a_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/session"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "email": "ops@example.com",
            "password": "s3cret",
            "organizationId": "ORG1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accessToken": ACCESS_TOKEN,
            "sessionId": "ignored"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = SessionClient::with_api_base(reqwest::Client::new(), server.uri());
    let token = client.authenticate(&identity()).await.unwrap();

    assert_eq!(token.expose(), ACCESS_TOKEN);
    assert_eq!(format!("{:?}", token), "AccessToken([REDACTED])");
}

#[tokio::test]
async fn rejected_credentials_carry_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/session"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid credentials"))
        .mount(&server)
        .await;

    let client = SessionClient::with_api_base(reqwest::Client::new(), server.uri());
    let err = client.authenticate(&identity()).await.unwrap_err();

    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Invalid credentials");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn response_without_token_is_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accessToken": "" })))
        .mount(&server)
        .await;

    let client = SessionClient::with_api_base(reqwest::Client::new(), server.uri());
    let err = client.authenticate(&identity()).await.unwrap_err();
    assert!(matches!(err, AuthError::MissingToken));
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = SessionClient::with_api_base(reqwest::Client::new(), closed);
    let err = client.authenticate(&identity()).await.unwrap_err();
    assert!(matches!(err, AuthError::Transport(_)));
}

#[tokio::test]
async fn shared_session_mock_matches_client_requests() {
    let server = MockServer::start().await;
    mount_session(&server).await;

    let client = SessionClient::with_api_base(reqwest::Client::new(), format!("{}/", server.uri()));
    let token = client.authenticate(&identity()).await.unwrap();
    assert_eq!(token.expose(), ACCESS_TOKEN);
}
