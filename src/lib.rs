//! Spotify Web API Client Library
//!
//! This library wraps the Spotify Web API with token-acquisition flows,
//! token lifecycle management and a generic request executor whose JSON
//! responses pass through a playable-item normalizer.
//!
//! # Modules
//!
//! - `auth` - OAuth 2.0 flows, PKCE helpers and the token record
//! - `cache` - Token persistence in the platform data directory
//! - `client` - The client: token state machine and request executor
//! - `config` - Endpoint and behaviour configuration
//! - `error` - Error types
//! - `parser` - Response tree normalizer ("tracks parser")
//! - `request` - Call options and query-string building
//! - `resolve` - Spotify URL/URI resolution
//!
//! # Example
//!
//! ```
//! use spotilib::{ClientConfig, RequestOptions, SpotifyClient};
//!
//! #[tokio::main]
//! async fn main() -> spotilib::Result<()> {
//!     let client = SpotifyClient::new(ClientConfig::default());
//!     client.client_credentials("client-id", "client-secret").await?;
//!     let track = client
//!         .request(RequestOptions::url("spotify:track:11dFghVXANMlKmJXsNCbNl"))
//!         .await?;
//!     println!("{:?}", track.as_json());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod request;
pub mod resolve;

pub use auth::{FlowOptions, RefreshStrategy, Token, TokenError, TokenResponse};
pub use cache::TokenStore;
pub use client::SpotifyClient;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use parser::parse_response;
pub use request::{ApiResponse, QueryValue, RequestOptions, ResponseParser};
pub use resolve::{ResolvedId, ResourceKind, is_resolvable, resolve};
