mod flows;
mod pkce;
mod token;

pub use flows::FlowOptions;
pub use flows::PendingAuthorization;
pub use pkce::generate_code_challenge;
pub use pkce::generate_code_verifier;
pub use pkce::generate_state;
pub use token::RefreshStrategy;
pub use token::Token;
pub use token::TokenError;
pub use token::TokenResponse;

pub(crate) use flows::{
    authorize_url, exchange_client_credentials, exchange_code, exchange_code_pkce,
    exchange_refresh,
};
