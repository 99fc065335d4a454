use std::time::Duration;

use serde_json::json;
use spotilib::{
    ApiResponse, ClientConfig, Error, FlowOptions, QueryValue, RefreshStrategy, RequestOptions,
    SpotifyClient, TokenResponse,
};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_string_contains, method, path},
};

fn mock_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.auth_url = format!("{}/authorize", server.uri());
    config.token_url = format!("{}/api/token", server.uri());
    config.api_url = format!("{}/v1", server.uri());
    config
}

fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "user-read-private",
        "refresh_token": refresh_token,
    })
}

async fn authenticated_client(server: &MockServer) -> SpotifyClient {
    let client = SpotifyClient::new(mock_config(server));
    client
        .set_token(
            TokenResponse {
                access_token: "access".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
                scope: None,
                refresh_token: None,
            },
            RefreshStrategy::None,
        )
        .await;
    client
}

#[tokio::test]
async fn test_client_credentials_flow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=my-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("cc-token", None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server));
    let token = client.client_credentials("my-id", "my-secret").await.unwrap();

    assert_eq!(token.access_token, "cc-token");
    assert!(matches!(
        token.strategy,
        RefreshStrategy::ClientCredentials { .. }
    ));
    assert_eq!(client.token().await.unwrap().access_token, "cc-token");
}

#[tokio::test]
async fn test_client_credentials_rejects_empty_arguments() {
    let client = SpotifyClient::default();
    let result = client.client_credentials("", "secret").await;

    assert!(matches!(result, Err(Error::InvalidFlowArguments(_))));
}

#[tokio::test]
async fn test_token_exchange_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "Invalid client secret"
        })))
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server));
    match client.client_credentials("my-id", "bad-secret").await {
        Err(Error::TokenExchange { kind, description }) => {
            assert_eq!(kind, "invalid_client");
            assert_eq!(description, "Invalid client secret");
        }
        other => panic!("expected TokenExchange, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pkce_url_parameters() {
    let client = SpotifyClient::default();
    let options = FlowOptions::with_scopes(["user-read-private", "user-library-read"]);
    let url = client
        .pkce_url("my-id", "http://localhost:8888/callback", &options)
        .await
        .unwrap();

    let parsed = Url::parse(&url).unwrap();
    let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();

    assert_eq!(params["client_id"], "my-id");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], "http://localhost:8888/callback");
    assert_eq!(params["scope"], "user-read-private user-library-read");
    assert_eq!(params["show_dialog"], "false");
    assert_eq!(params["code_challenge_method"], "S256");
    assert_eq!(params["state"].len(), 16);
    assert!(!params["code_challenge"].is_empty());
}

#[tokio::test]
async fn test_implicit_url_requests_token_response_type() {
    let client = SpotifyClient::default();
    let url = client
        .implicit_url("my-id", "http://localhost:8888/callback", &FlowOptions::default())
        .await
        .unwrap();

    let parsed = Url::parse(&url).unwrap();
    let params: std::collections::HashMap<_, _> = parsed.query_pairs().into_owned().collect();
    assert_eq!(params["response_type"], "token");
}

#[tokio::test]
async fn test_pkce_resolve_roundtrip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=the-code"))
        .and(body_string_contains("code_verifier="))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("pkce-token", Some("refresh-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server));
    client
        .pkce_url("my-id", "http://localhost:8888/callback", &FlowOptions::default())
        .await
        .unwrap();

    let token = client
        .resolve("http://localhost:8888/callback?code=the-code&state=whatever")
        .await
        .unwrap();

    assert_eq!(token.access_token, "pkce-token");
    assert_eq!(token.refresh_token.as_deref(), Some("refresh-1"));
    assert!(matches!(token.strategy, RefreshStrategy::Pkce { .. }));
}

#[tokio::test]
async fn test_implicit_resolve_from_fragment() {
    let client = SpotifyClient::default();
    client
        .implicit_url("my-id", "http://localhost:8888/callback", &FlowOptions::default())
        .await
        .unwrap();

    let token = client
        .resolve("http://localhost:8888/callback#access_token=frag-token&token_type=Bearer&expires_in=3600")
        .await
        .unwrap();

    assert_eq!(token.access_token, "frag-token");
    assert_eq!(token.strategy, RefreshStrategy::None);
    assert!(!token.can_refresh());
}

#[tokio::test]
async fn test_resolve_without_pending_flow() {
    let client = SpotifyClient::default();
    let result = client.resolve("code=whatever").await;

    assert!(matches!(result, Err(Error::InvalidQuery(_))));
}

#[tokio::test]
async fn test_resolve_denied_authorization() {
    let client = SpotifyClient::default();
    client
        .pkce_url("my-id", "http://localhost:8888/callback", &FlowOptions::default())
        .await
        .unwrap();

    match client.resolve("error=access_denied&state=whatever").await {
        Err(Error::TokenExchange { kind, .. }) => assert_eq!(kind, "access_denied"),
        other => panic!("expected TokenExchange, got {other:?}"),
    }

    // the pending record was consumed by the failed attempt
    assert!(matches!(
        client.resolve("code=late").await,
        Err(Error::InvalidQuery(_))
    ));
}

#[tokio::test]
async fn test_refresh_returns_replacement_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server));
    client
        .set_token(
            TokenResponse {
                access_token: "access-1".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
                scope: None,
                refresh_token: Some("refresh-1".to_string()),
            },
            RefreshStrategy::Pkce {
                client_id: "my-id".to_string(),
            },
        )
        .await;

    let refreshed = client.refresh_token().await.unwrap();
    let refreshed = refreshed.expect("access token changed");

    assert_eq!(refreshed.access_token, "access-2");
    // the refresh token is carried over when the response omits one
    assert_eq!(refreshed.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn test_refresh_with_unchanged_access_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", None)))
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server));
    client
        .set_token(
            TokenResponse {
                access_token: "access-1".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 3600,
                scope: None,
                refresh_token: Some("refresh-1".to_string()),
            },
            RefreshStrategy::Pkce {
                client_id: "my-id".to_string(),
            },
        )
        .await;

    assert!(client.refresh_token().await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_without_capability() {
    let server = MockServer::start().await;
    let client = authenticated_client(&server).await;

    assert!(matches!(
        client.refresh_token().await,
        Err(Error::NoRefreshCapability)
    ));
}

#[tokio::test]
async fn test_request_without_token() {
    let client = SpotifyClient::default();
    let result = client.request(RequestOptions::endpoint("/me")).await;

    assert!(matches!(result, Err(Error::NoToken)));
}

#[tokio::test]
async fn test_request_normalizes_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "track",
            "name": "Song",
            "artists": [{ "name": "X" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    let response = client
        .request(RequestOptions::url("spotify:track:abc123"))
        .await
        .unwrap();

    let json = response.into_json().unwrap();
    let items = json["parsed_items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["title"], "Song - X");
}

#[tokio::test]
async fn test_request_raw_skips_normalization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "track",
            "name": "Song"
        })))
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    let response = client
        .request(RequestOptions::url("spotify:track:abc123").raw())
        .await
        .unwrap();

    assert!(response.into_json().unwrap().get("parsed_items").is_none());
}

#[tokio::test]
async fn test_request_query_building() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/tracks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tracks": [] })))
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    client
        .request(
            RequestOptions::endpoint("/tracks")
                .query("ids", vec!["a", "b", "c"])
                .query_opt("market", None::<QueryValue>),
        )
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    // arrays are comma-joined and absent values dropped entirely
    assert_eq!(requests[0].url.query(), Some("ids=a%2Cb%2Cc"));
}

#[tokio::test]
async fn test_request_sends_bearer_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .and(wiremock::matchers::header("authorization", "Bearer access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "me" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    client.get("/me", &[]).await.unwrap();
}

#[tokio::test]
async fn test_request_api_error_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "status": 401, "message": "The access token expired" }
        })))
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    match client.get("/me", &[]).await {
        Err(Error::Api(message)) => assert_eq!(message, "The access token expired"),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_request_empty_body_yields_status() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v1/me/player/pause"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = authenticated_client(&server).await;
    let response = client
        .request(RequestOptions::endpoint("/me/player/pause").method(reqwest::Method::PUT))
        .await
        .unwrap();

    match response {
        ApiResponse::Status(status) => assert_eq!(status.as_u16(), 204),
        ApiResponse::Json(_) => panic!("expected status response"),
    }
}

#[tokio::test]
async fn test_request_awaits_pending_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "me" })))
        .mount(&server)
        .await;

    let client = SpotifyClient::new(mock_config(&server).with_await_token(true));
    client
        .pkce_url("my-id", "http://localhost:8888/callback", &FlowOptions::default())
        .await
        .unwrap();

    let background = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        background
            .set_token(
                TokenResponse {
                    access_token: "late".to_string(),
                    token_type: "Bearer".to_string(),
                    expires_in: 3600,
                    scope: None,
                    refresh_token: None,
                },
                RefreshStrategy::None,
            )
            .await;
    });

    let response = client.get("/me", &[]).await.unwrap();
    assert!(response.as_json().is_some());
}

#[tokio::test]
async fn test_auto_refresh_replaces_token_on_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = mock_config(&server).with_auto_refresh(true);
    config.precaution_seconds = 0;
    let client = SpotifyClient::new(config);
    client
        .set_token(
            TokenResponse {
                access_token: "access-1".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 1,
                scope: None,
                refresh_token: Some("refresh-1".to_string()),
            },
            RefreshStrategy::Pkce {
                client_id: "my-id".to_string(),
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert_eq!(client.token().await.unwrap().access_token, "access-2");
}

#[tokio::test]
async fn test_failed_auto_refresh_is_recorded_and_cleared() {
    let server = MockServer::start().await;
    // first refresh attempt fails, every later one succeeds
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Refresh token revoked"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", None)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "me" })))
        .mount(&server)
        .await;

    let mut config = mock_config(&server).with_auto_refresh(true);
    config.precaution_seconds = 0;
    let client = SpotifyClient::new(config);
    client
        .set_token(
            TokenResponse {
                access_token: "access-1".to_string(),
                token_type: "Bearer".to_string(),
                expires_in: 1,
                scope: None,
                refresh_token: Some("refresh-1".to_string()),
            },
            RefreshStrategy::Pkce {
                client_id: "my-id".to_string(),
            },
        )
        .await;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    // the background failure is held on the token and fails the next call
    match client.get("/me", &[]).await {
        Err(Error::RefreshFailed(message)) => assert!(message.contains("revoked")),
        other => panic!("expected RefreshFailed, got {other:?}"),
    }

    // an explicit refresh supersedes the recorded failure
    let refreshed = client.refresh_token().await.unwrap().unwrap();
    assert_eq!(refreshed.access_token, "access-2");
    assert!(client.token().await.unwrap().error.is_none());

    assert!(client.get("/me", &[]).await.is_ok());
}

#[tokio::test]
async fn test_auto_refresh_toggling() {
    let client = SpotifyClient::default();
    assert!(!client.auto_refresh_enabled().await);

    client.enable_auto_refresh().await;
    client.enable_auto_refresh().await;
    assert!(client.auto_refresh_enabled().await);

    client.disable_auto_refresh().await;
    client.disable_auto_refresh().await;
    assert!(!client.auto_refresh_enabled().await);
}
