//! Authorization-URL building and token-endpoint exchanges.
//!
//! The redirect flows produce a URL here and leave a [`PendingAuthorization`]
//! with the client; [`crate::client::SpotifyClient::resolve`] later feeds the
//! redirect query back into the matching exchange.

use serde_json::Value;
use url::Url;

use crate::{
    auth::token::{RefreshStrategy, TokenResponse},
    error::{Error, Result},
};

/// Optional parameters shared by the redirect flows.
#[derive(Debug, Clone, Default)]
pub struct FlowOptions {
    /// Requested scopes, space-joined into the `scope` parameter.
    pub scopes: Vec<String>,
    /// Force the consent dialog even for already-approved apps.
    pub show_dialog: bool,
}

impl FlowOptions {
    pub fn with_scopes<I, S>(scopes: I) -> FlowOptions
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FlowOptions {
            scopes: scopes.into_iter().map(Into::into).collect(),
            show_dialog: false,
        }
    }
}

/// What a redirect flow left behind: everything the code exchange needs,
/// as explicit data rather than a captured closure.
#[derive(Debug, Clone)]
pub enum PendingAuthorization {
    Code {
        client_id: String,
        client_secret: String,
        redirect_uri: String,
        state: String,
    },
    Pkce {
        client_id: String,
        redirect_uri: String,
        verifier: String,
        state: String,
    },
    Implicit {
        state: String,
    },
}

impl PendingAuthorization {
    pub fn state(&self) -> &str {
        match self {
            PendingAuthorization::Code { state, .. }
            | PendingAuthorization::Pkce { state, .. }
            | PendingAuthorization::Implicit { state } => state,
        }
    }
}

/// Builds the authorize-endpoint URL for a redirect flow.
pub(crate) fn authorize_url(
    auth_url: &str,
    client_id: &str,
    response_type: &str,
    redirect_uri: &str,
    state: &str,
    options: &FlowOptions,
    code_challenge: Option<&str>,
) -> Result<String> {
    let mut url =
        Url::parse(auth_url).map_err(|e| Error::InvalidFlowArguments(e.to_string()))?;
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("client_id", client_id);
        query.append_pair("response_type", response_type);
        query.append_pair("redirect_uri", redirect_uri);
        query.append_pair("state", state);
        if !options.scopes.is_empty() {
            query.append_pair("scope", &options.scopes.join(" "));
        }
        query.append_pair("show_dialog", if options.show_dialog { "true" } else { "false" });
        if let Some(challenge) = code_challenge {
            query.append_pair("code_challenge_method", "S256");
            query.append_pair("code_challenge", challenge);
        }
    }
    Ok(url.to_string())
}

/// POSTs a form to the token endpoint and decodes the response, converting
/// an OAuth error envelope into [`Error::TokenExchange`].
pub(crate) async fn request_token(
    http: &reqwest::Client,
    token_url: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let res = http.post(token_url).form(form).send().await?;
    let value: Value = res.json().await?;

    if let Some(err) = value.get("error") {
        let kind = err
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        let description = value
            .get("error_description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(Error::TokenExchange { kind, description });
    }

    serde_json::from_value(value).map_err(|e| Error::TokenExchange {
        kind: "invalid_response".to_string(),
        description: e.to_string(),
    })
}

pub(crate) async fn exchange_code(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
    code: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    request_token(
        http,
        token_url,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ],
    )
    .await
}

pub(crate) async fn exchange_code_pkce(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    code: &str,
    verifier: &str,
    redirect_uri: &str,
) -> Result<TokenResponse> {
    request_token(
        http,
        token_url,
        &[
            ("grant_type", "authorization_code"),
            ("client_id", client_id),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", redirect_uri),
        ],
    )
    .await
}

pub(crate) async fn exchange_client_credentials(
    http: &reqwest::Client,
    token_url: &str,
    client_id: &str,
    client_secret: &str,
) -> Result<TokenResponse> {
    request_token(
        http,
        token_url,
        &[
            ("grant_type", "client_credentials"),
            ("client_id", client_id),
            ("client_secret", client_secret),
        ],
    )
    .await
}

/// Refresh exchange for the strategies that support one.
pub(crate) async fn exchange_refresh(
    http: &reqwest::Client,
    token_url: &str,
    strategy: &RefreshStrategy,
    refresh_token: Option<&str>,
) -> Result<TokenResponse> {
    match strategy {
        RefreshStrategy::ClientCredentials {
            client_id,
            client_secret,
        } => exchange_client_credentials(http, token_url, client_id, client_secret).await,
        RefreshStrategy::AuthorizationCode {
            client_id,
            client_secret,
        } => {
            let refresh_token = refresh_token.ok_or(Error::NoRefreshCapability)?;
            request_token(
                http,
                token_url,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                ],
            )
            .await
        }
        RefreshStrategy::Pkce { client_id } => {
            let refresh_token = refresh_token.ok_or(Error::NoRefreshCapability)?;
            request_token(
                http,
                token_url,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", client_id),
                ],
            )
            .await
        }
        RefreshStrategy::None => Err(Error::NoRefreshCapability),
    }
}
