//! The Spotify client: token lifecycle state machine and request executor.
//!
//! A client starts out empty. One of the four flow starters either returns
//! an authorization URL and parks a [`PendingAuthorization`] (the redirect
//! flows), or resolves a token right away (client credentials). Redirect
//! flows complete through [`SpotifyClient::resolve`] with the query string
//! Spotify appended to the redirect. From then on [`SpotifyClient::request`]
//! attaches the current access token to every call.
//!
//! The client is a cheap handle around shared state; clones address the
//! same token. Only the state-machine operations (`resolve`, `set_token`,
//! `refresh_token`, the timer) replace the current token; the executor
//! only reads it. `resolve` and `refresh_token` serialize their install
//! step on the state lock but run their network exchange unlocked, so
//! concurrent calls can interleave exchanges; the last install wins.

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client;
use serde_json::Value;
use tokio::{sync::Mutex, task::JoinHandle, time::sleep};
use url::form_urlencoded;

use crate::{
    auth::{
        self, FlowOptions, PendingAuthorization, RefreshStrategy, Token, TokenError,
        TokenResponse,
    },
    config::ClientConfig,
    error::{Error, Result},
    parser,
    request::{ApiResponse, QueryValue, RequestOptions, ResponseParser, build_query},
    resolve,
};

#[derive(Default)]
struct TokenState {
    token: Option<Token>,
    pending: Option<PendingAuthorization>,
    auto_refresh: bool,
    refresh_timer: Option<JoinHandle<()>>,
}

struct Inner {
    http: Client,
    config: ClientConfig,
    state: Mutex<TokenState>,
}

/// Client for the Spotify Web API.
#[derive(Clone)]
pub struct SpotifyClient {
    inner: Arc<Inner>,
}

impl Default for SpotifyClient {
    fn default() -> Self {
        SpotifyClient::new(ClientConfig::default())
    }
}

impl SpotifyClient {
    pub fn new(config: ClientConfig) -> SpotifyClient {
        let auto_refresh = config.auto_refresh;
        SpotifyClient {
            inner: Arc::new(Inner {
                http: Client::new(),
                config,
                state: Mutex::new(TokenState {
                    auto_refresh,
                    ..TokenState::default()
                }),
            }),
        }
    }

    // ---- flow starters ---------------------------------------------------

    /// Starts the authorization-code flow. Returns the URL to send the end
    /// user to; complete the flow with [`SpotifyClient::resolve`].
    pub async fn authorization_code_url(
        &self,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
        options: &FlowOptions,
    ) -> Result<String> {
        require(client_id, "client_id")?;
        require(client_secret, "client_secret")?;
        require(redirect_uri, "redirect_uri")?;

        let state = auth::generate_state();
        let url = auth::authorize_url(
            &self.inner.config.auth_url,
            client_id,
            "code",
            redirect_uri,
            &state,
            options,
            None,
        )?;
        self.inner.state.lock().await.pending = Some(PendingAuthorization::Code {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            state,
        });
        Ok(url)
    }

    /// Starts the PKCE flow: generates a fresh verifier/challenge pair and
    /// keeps the verifier for the later code exchange.
    pub async fn pkce_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        options: &FlowOptions,
    ) -> Result<String> {
        require(client_id, "client_id")?;
        require(redirect_uri, "redirect_uri")?;

        let verifier = auth::generate_code_verifier();
        let challenge = auth::generate_code_challenge(&verifier);
        let state = auth::generate_state();
        let url = auth::authorize_url(
            &self.inner.config.auth_url,
            client_id,
            "code",
            redirect_uri,
            &state,
            options,
            Some(&challenge),
        )?;
        self.inner.state.lock().await.pending = Some(PendingAuthorization::Pkce {
            client_id: client_id.to_string(),
            redirect_uri: redirect_uri.to_string(),
            verifier,
            state,
        });
        Ok(url)
    }

    /// Starts the implicit-grant flow (`response_type=token`); the redirect
    /// fragment carries the token directly and the resulting token cannot
    /// be refreshed.
    pub async fn implicit_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        options: &FlowOptions,
    ) -> Result<String> {
        require(client_id, "client_id")?;
        require(redirect_uri, "redirect_uri")?;

        let state = auth::generate_state();
        let url = auth::authorize_url(
            &self.inner.config.auth_url,
            client_id,
            "token",
            redirect_uri,
            &state,
            options,
            None,
        )?;
        self.inner.state.lock().await.pending =
            Some(PendingAuthorization::Implicit { state });
        Ok(url)
    }

    /// The one flow without a redirect step: exchanges the client
    /// credentials directly for a token.
    pub async fn client_credentials(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<Token> {
        require(client_id, "client_id")?;
        require(client_secret, "client_secret")?;

        let response = auth::exchange_client_credentials(
            &self.inner.http,
            &self.inner.config.token_url,
            client_id,
            client_secret,
        )
        .await?;
        let strategy = RefreshStrategy::ClientCredentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        Ok(self.install(response, strategy).await)
    }

    // ---- flow completion -------------------------------------------------

    /// Completes a pending redirect flow from the query (or fragment) the
    /// redirect URI received. Accepts a bare query string or a full URL.
    ///
    /// The pending record is single-use: it is consumed by this call even
    /// when the exchange fails.
    pub async fn resolve(&self, query: &str) -> Result<Token> {
        let pending = self
            .inner
            .state
            .lock()
            .await
            .pending
            .take()
            .ok_or_else(|| Error::InvalidQuery("no authorization flow pending".to_string()))?;

        let params = parse_query(query);
        if let Some(kind) = params.get("error") {
            return Err(Error::TokenExchange {
                kind: kind.clone(),
                description: params
                    .get("error_description")
                    .cloned()
                    .unwrap_or_default(),
            });
        }

        match pending {
            PendingAuthorization::Code {
                client_id,
                client_secret,
                redirect_uri,
                ..
            } => {
                let code = params
                    .get("code")
                    .ok_or_else(|| Error::InvalidQuery("missing code parameter".to_string()))?;
                let response = auth::exchange_code(
                    &self.inner.http,
                    &self.inner.config.token_url,
                    &client_id,
                    &client_secret,
                    code,
                    &redirect_uri,
                )
                .await?;
                let strategy = RefreshStrategy::AuthorizationCode {
                    client_id,
                    client_secret,
                };
                Ok(self.install(response, strategy).await)
            }
            PendingAuthorization::Pkce {
                client_id,
                redirect_uri,
                verifier,
                ..
            } => {
                let code = params
                    .get("code")
                    .ok_or_else(|| Error::InvalidQuery("missing code parameter".to_string()))?;
                let response = auth::exchange_code_pkce(
                    &self.inner.http,
                    &self.inner.config.token_url,
                    &client_id,
                    code,
                    &verifier,
                    &redirect_uri,
                )
                .await?;
                let strategy = RefreshStrategy::Pkce { client_id };
                Ok(self.install(response, strategy).await)
            }
            PendingAuthorization::Implicit { .. } => {
                let access_token = params.get("access_token").ok_or_else(|| {
                    Error::InvalidQuery("missing access_token parameter".to_string())
                })?;
                let response = TokenResponse {
                    access_token: access_token.clone(),
                    token_type: params
                        .get("token_type")
                        .cloned()
                        .unwrap_or_else(|| "Bearer".to_string()),
                    expires_in: params
                        .get("expires_in")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(3600),
                    scope: None,
                    refresh_token: None,
                };
                Ok(self.install(response, RefreshStrategy::None).await)
            }
        }
    }

    // ---- token lifecycle -------------------------------------------------

    /// Manual token injection; applies the precaution adjustment and arms
    /// the refresh timer when auto-refresh is on.
    pub async fn set_token(&self, response: TokenResponse, strategy: RefreshStrategy) -> Token {
        self.install(response, strategy).await
    }

    /// The currently held token, if any.
    pub async fn token(&self) -> Option<Token> {
        self.inner.state.lock().await.token.clone()
    }

    /// Refreshes the current token via its stored strategy.
    ///
    /// Returns `Ok(None)` when Spotify kept the access token unchanged
    /// (not an error). The replacement token inherits the refresh token
    /// when the response omits one.
    pub async fn refresh_token(&self) -> Result<Option<Token>> {
        let (strategy, refresh_token, old_access) = {
            let mut guard = self.inner.state.lock().await;
            let token = guard.token.as_mut().ok_or(Error::NoToken)?;
            // an explicit refresh supersedes a recorded background failure
            token.error = None;
            (
                token.strategy.clone(),
                token.refresh_token.clone(),
                token.access_token.clone(),
            )
        };

        let response = auth::exchange_refresh(
            &self.inner.http,
            &self.inner.config.token_url,
            &strategy,
            refresh_token.as_deref(),
        )
        .await
        .map_err(|e| match e {
            Error::TokenExchange { kind, description } => {
                Error::RefreshFailed(if description.is_empty() { kind } else { description })
            }
            other => other,
        })?;

        let unchanged = response.access_token == old_access;
        let token = self
            .install_with_fallback(response, strategy, refresh_token)
            .await;
        if unchanged { Ok(None) } else { Ok(Some(token)) }
    }

    /// Arms the refresh timer relative to the current token's remaining
    /// lifetime. Enabling while already enabled is a no-op.
    pub async fn enable_auto_refresh(&self) {
        let mut guard = self.inner.state.lock().await;
        if guard.auto_refresh {
            return;
        }
        guard.auto_refresh = true;
        if let Some(token) = &guard.token {
            if token.can_refresh() {
                let delay = token.time_to_live();
                guard.refresh_timer = Some(self.spawn_refresh_timer(delay));
            }
        }
    }

    /// Cancels a pending refresh timer. Disabling without one armed is a
    /// no-op.
    pub async fn disable_auto_refresh(&self) {
        let mut guard = self.inner.state.lock().await;
        guard.auto_refresh = false;
        if let Some(timer) = guard.refresh_timer.take() {
            timer.abort();
        }
    }

    pub async fn auto_refresh_enabled(&self) -> bool {
        self.inner.state.lock().await.auto_refresh
    }

    async fn install(&self, response: TokenResponse, strategy: RefreshStrategy) -> Token {
        self.install_with_fallback(response, strategy, None).await
    }

    async fn install_with_fallback(
        &self,
        mut response: TokenResponse,
        strategy: RefreshStrategy,
        previous_refresh: Option<String>,
    ) -> Token {
        if response.refresh_token.is_none() {
            response.refresh_token = previous_refresh;
        }
        let token =
            Token::from_response(response, strategy, self.inner.config.precaution_seconds);

        let mut guard = self.inner.state.lock().await;
        guard.token = Some(token.clone());
        if let Some(timer) = guard.refresh_timer.take() {
            timer.abort();
        }
        if guard.auto_refresh && token.can_refresh() {
            guard.refresh_timer = Some(self.spawn_refresh_timer(token.time_to_live()));
        }
        token
    }

    /// Single-shot, fire-and-forget: a failure is logged and recorded on
    /// the token, to be surfaced by the next explicit refresh or request.
    fn spawn_refresh_timer(&self, delay: Duration) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = client.refresh_token().await {
                log::warn!("automatic token refresh failed: {e}");
                let mut guard = client.inner.state.lock().await;
                if let Some(token) = guard.token.as_mut() {
                    token.error = Some(TokenError {
                        kind: "refresh_failed".to_string(),
                        description: e.to_string(),
                    });
                }
            }
        })
    }

    async fn access_token(&self) -> Result<String> {
        {
            let guard = self.inner.state.lock().await;
            if let Some(token) = &guard.token {
                if let Some(error) = &token.error {
                    return Err(Error::RefreshFailed(error.description.clone()));
                }
                return Ok(token.access_token.clone());
            }
            if guard.pending.is_none() || !self.inner.config.await_token {
                return Err(Error::NoToken);
            }
        }

        // a flow is pending and the client is configured to wait for it
        let start = tokio::time::Instant::now();
        while start.elapsed() < self.inner.config.await_token_timeout {
            sleep(Duration::from_millis(200)).await;
            let guard = self.inner.state.lock().await;
            if let Some(token) = &guard.token {
                return Ok(token.access_token.clone());
            }
        }
        Err(Error::NoToken)
    }

    // ---- request executor ------------------------------------------------

    /// Executes one authenticated API call.
    ///
    /// A supplied `url` is resolved first and its endpoint prepended to the
    /// explicit one. Non-JSON bodies come back as [`ApiResponse::Status`];
    /// JSON bodies carrying an `error` field fail with [`Error::Api`];
    /// everything else passes through the configured normalizer.
    pub async fn request(&self, options: RequestOptions) -> Result<ApiResponse> {
        let mut endpoint = options.endpoint.clone();
        if let Some(identifier) = &options.url {
            let resolved = resolve::resolve(identifier)?;
            endpoint = format!("{}{}", resolved.endpoint, endpoint);
        }

        let access_token = self.access_token().await?;

        let mut url = format!("{}{}", self.inner.config.api_url, endpoint);
        let query = build_query(&options.query);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        log::debug!("{} {}", options.method, url);

        let mut request = self
            .inner
            .http
            .request(options.method.clone(), &url)
            .bearer_auth(access_token);
        for (key, value) in &options.headers {
            request = request.header(key, value);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            // an empty or non-JSON body is a success signal, not a failure
            Err(_) => return Ok(ApiResponse::Status(status)),
        };

        if let Some(error) = value.get("error") {
            let description = error
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| error.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(Error::Api(description));
        }

        let parsed = match options.parser.unwrap_or(self.inner.config.parser) {
            ResponseParser::Tracks => parser::parse_response(value),
            ResponseParser::Raw => value,
        };
        Ok(ApiResponse::Json(parsed))
    }

    /// GET shorthand.
    pub async fn get(&self, endpoint: &str, query: &[(&str, QueryValue)]) -> Result<ApiResponse> {
        let mut options = RequestOptions::endpoint(endpoint);
        for (key, value) in query {
            options = options.query(*key, value.clone());
        }
        self.request(options).await
    }
}

fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidFlowArguments(format!(
            "{name} must not be empty"
        )));
    }
    Ok(())
}

/// Takes a bare query string, a `?query`, a `#fragment` or a full redirect
/// URL and yields its key/value pairs.
fn parse_query(query: &str) -> HashMap<String, String> {
    let query = query.rsplit(['?', '#']).next().unwrap_or(query);
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
