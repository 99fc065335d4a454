//! Token persistence between runs.
//!
//! Stores the full [`Token`] record, refresh strategy included, so a
//! restarted embedder can pick up where it left off without sending the
//! user back through an authorization flow.

use std::path::PathBuf;

use crate::{auth::Token, error::Result};

pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> TokenStore {
        TokenStore { path: path.into() }
    }

    /// `<platform data dir>/spotilib/token.json`
    pub fn default_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("spotilib/token.json");
        path
    }

    pub async fn load(&self) -> Result<Token> {
        let content = async_fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn persist(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(token)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        TokenStore::new(TokenStore::default_path())
    }
}
