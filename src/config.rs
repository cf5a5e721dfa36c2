//! Client configuration management.
//!
//! Configuration is stored at `~/.config/aquafeed/config.json` and covers
//! the backend URL plus small conveniences like the last used email.
//! `AQUAFEED_API_URL` (environment or `.env` file) overrides the stored URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/state directory paths
const APP_NAME: &str = "aquafeed";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend reachable on a default local deployment
const DEFAULT_API_URL: &str = "http://localhost:8000/api";

/// Environment variable overriding the backend URL
const API_URL_ENV: &str = "AQUAFEED_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Pick up a .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Effective backend URL: environment override, then config, then the
    /// local default.
    pub fn api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding the persisted token and tenant selection.
    pub fn state_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
