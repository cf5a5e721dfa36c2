//! Persistence for the bearer token across client restarts.
//!
//! The store holds exactly one token pair as `token.json` in the state
//! directory. It performs no validation; expiry checking belongs to the
//! session manager and the request path.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Token file name in the state directory
const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
}

pub struct TokenStore {
    state_dir: PathBuf,
}

impl TokenStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self { state_dir }
    }

    /// Read the persisted token pair. An unreadable or malformed file is
    /// treated as no token at all; the backend is the authority anyway.
    pub fn read(&self) -> Option<StoredToken> {
        let path = self.token_path();
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to read token file, treating as absent");
                return None;
            }
        };
        match serde_json::from_str(&contents) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(error = %e, "Malformed token file, treating as absent");
                None
            }
        }
    }

    /// Persist a token pair, replacing any previous one.
    pub fn save(&self, token: &StoredToken) -> Result<()> {
        std::fs::create_dir_all(&self.state_dir)
            .context("Failed to create state directory")?;
        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(self.token_path(), contents)
            .context("Failed to write token file")?;
        Ok(())
    }

    /// Remove the persisted token pair.
    pub fn clear(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove token file")?;
        }
        Ok(())
    }

    fn token_path(&self) -> PathBuf {
        self.state_dir.join(TOKEN_FILE)
    }
}
