//! The access-token record and its lifecycle data.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Wire shape of a successful token-endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: u64,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> u64 {
    3600
}

/// How the current token can be refreshed, captured at resolution time.
///
/// An explicit record of the credentials each flow needs again later,
/// interpreted by the client's single refresh dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefreshStrategy {
    /// Re-exchange the client credentials; no refresh token involved.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
    /// `grant_type=refresh_token` with client id and secret.
    AuthorizationCode {
        client_id: String,
        client_secret: String,
    },
    /// `grant_type=refresh_token` with the public client id only.
    Pkce { client_id: String },
    /// Flow without refresh support (implicit grant).
    None,
}

impl RefreshStrategy {
    pub fn supports_refresh(&self) -> bool {
        !matches!(self, RefreshStrategy::None)
    }
}

/// Error recorded on a token when a background refresh attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenError {
    pub kind: String,
    pub description: String,
}

/// One OAuth credential lifecycle instance.
///
/// `expires_in` and `expire_time` are already adjusted by the precaution
/// margin, so [`Token::is_expired`] turns true strictly before Spotify
/// invalidates the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    /// Adjusted lifetime in seconds at creation time.
    pub expires_in: u64,
    /// Absolute instant the token is treated as expired.
    pub expire_time: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub refresh_token: Option<String>,
    /// Set when a fire-and-forget refresh failed; a token carrying an
    /// error is unusable until explicitly refreshed.
    pub error: Option<TokenError>,
    pub strategy: RefreshStrategy,
}

impl Token {
    /// Builds a token from a token-endpoint response, applying the
    /// precaution margin to the advertised lifetime.
    pub fn from_response(
        response: TokenResponse,
        strategy: RefreshStrategy,
        precaution_seconds: u32,
    ) -> Token {
        let adjusted = response
            .expires_in
            .saturating_sub(u64::from(precaution_seconds));
        Token {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: adjusted,
            expire_time: Utc::now() + Duration::seconds(adjusted as i64),
            scopes: response
                .scope
                .map(|s| s.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
            refresh_token: response.refresh_token,
            error: None,
            strategy,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expire_time
    }

    /// Remaining adjusted lifetime; zero once expired.
    pub fn time_to_live(&self) -> std::time::Duration {
        (self.expire_time - Utc::now())
            .to_std()
            .unwrap_or(std::time::Duration::ZERO)
    }

    /// Whether the refresh dispatcher has everything it needs.
    pub fn can_refresh(&self) -> bool {
        match self.strategy {
            RefreshStrategy::ClientCredentials { .. } => true,
            RefreshStrategy::AuthorizationCode { .. } | RefreshStrategy::Pkce { .. } => {
                self.refresh_token.is_some()
            }
            RefreshStrategy::None => false,
        }
    }
}
