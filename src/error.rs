//! Error types for the Spotify client.

use thiserror::Error;

/// Errors surfaced by token flows, the request executor and the resolver.
///
/// Three user-visible situations stay distinct: "no usable token yet"
/// (`NoToken`), "the token exchange failed" (`TokenExchange` /
/// `RefreshFailed`) and "the API call itself failed" (`Api`).
#[derive(Error, Debug)]
pub enum Error {
    /// The supplied string is not a recognized Spotify URL or URI.
    #[error("not a recognizable Spotify URL or URI: {0}")]
    InvalidIdentifier(String),

    /// A flow was started without the credentials it requires.
    #[error("invalid flow arguments: {0}")]
    InvalidFlowArguments(String),

    /// `resolve` was called without a pending flow, or the redirect query
    /// carried no usable parameters.
    #[error("invalid authorization query: {0}")]
    InvalidQuery(String),

    /// The token endpoint answered with an OAuth error envelope.
    #[error("token exchange failed ({kind}): {description}")]
    TokenExchange { kind: String, description: String },

    /// The current token was obtained through a flow without refresh support.
    #[error("current token cannot be refreshed")]
    NoRefreshCapability,

    /// A refresh attempt reported an error envelope.
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    /// No token is resolved and none is pending resolution.
    #[error("no access token available")]
    NoToken,

    /// The Web API answered with an error body.
    #[error("API error: {0}")]
    Api(String),

    /// HTTP transport failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Token cache I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Token cache (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
