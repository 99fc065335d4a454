use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::{Digest, Sha256};

fn random_alphanumeric(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// 128-character alphanumeric PKCE code verifier.
pub fn generate_code_verifier() -> String {
    random_alphanumeric(128)
}

/// Base64url (no padding) SHA-256 digest of the verifier.
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// 16-character alphanumeric `state` parameter for authorize URLs.
pub fn generate_state() -> String {
    random_alphanumeric(16)
}
