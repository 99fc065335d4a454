//! Client configuration.
//!
//! All endpoints default to the public Spotify ones; tests point them at a
//! local mock server instead. `from_env` honours the same environment
//! variables as earlier versions of this tooling for people who keep their
//! endpoint overrides in the environment.

use std::{env, time::Duration};

use crate::request::ResponseParser;

/// Default base URL of the authorize endpoint users get redirected to.
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";

/// Default base URL of the token exchange endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Default base URL of the versioned Web API.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Seconds subtracted from a token's advertised lifetime so it is treated
/// as expired before Spotify actually invalidates it.
pub const DEFAULT_PRECAUTION_SECONDS: u32 = 5;

/// Configuration for a [`SpotifyClient`](crate::client::SpotifyClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Authorize endpoint (user redirect target).
    pub auth_url: String,
    /// Token exchange endpoint.
    pub token_url: String,
    /// Versioned REST base; endpoints are appended to this.
    pub api_url: String,
    /// Precaution margin applied to every token lifetime.
    pub precaution_seconds: u32,
    /// Arm the refresh timer whenever a refreshable token is installed.
    pub auto_refresh: bool,
    /// Make the executor wait for a pending authorization to resolve
    /// instead of failing with `NoToken`.
    pub await_token: bool,
    /// Upper bound on that wait.
    pub await_token_timeout: Duration,
    /// Normalizer applied to JSON response bodies.
    pub parser: ResponseParser,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            precaution_seconds: DEFAULT_PRECAUTION_SECONDS,
            auto_refresh: false,
            await_token: false,
            await_token_timeout: Duration::from_secs(60),
            parser: ResponseParser::Tracks,
        }
    }
}

impl ClientConfig {
    /// Builds a default configuration with endpoint URLs taken from the
    /// `SPOTIFY_API_AUTH_URL`, `SPOTIFY_API_TOKEN_URL` and `SPOTIFY_API_URL`
    /// environment variables where set.
    pub fn from_env() -> Self {
        let mut config = ClientConfig::default();
        if let Ok(url) = env::var("SPOTIFY_API_AUTH_URL") {
            config.auth_url = url;
        }
        if let Ok(url) = env::var("SPOTIFY_API_TOKEN_URL") {
            config.token_url = url;
        }
        if let Ok(url) = env::var("SPOTIFY_API_URL") {
            config.api_url = url;
        }
        config
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    pub fn with_await_token(mut self, enabled: bool) -> Self {
        self.await_token = enabled;
        self
    }

    pub fn with_parser(mut self, parser: ResponseParser) -> Self {
        self.parser = parser;
        self
    }
}
