//! Configuration for the table editor

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::libs::error::{EditorError, Result};

/// Longest session lifetime accepted, one year.
pub const MAX_TOKEN_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Editor configuration, read from an optional TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Socket address to bind
    pub listen: String,
    /// sqlx connection string
    pub database_url: String,
    /// Name reported by the table listing
    pub database_name: String,
    pub max_connections: u32,
    /// Shared root password for the editor login
    pub root_password: String,
    /// Session lifetime in seconds
    pub token_ttl_secs: u64,
    /// Path the editor routes are mounted under
    pub path_prefix: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8090".to_string(),
            database_url: "sqlite://village.db?mode=rwc".to_string(),
            database_name: "village_db".to_string(),
            max_connections: 5,
            root_password: "lydlg".to_string(),
            token_ttl_secs: 12 * 60 * 60,
            path_prefix: "/api/ops/db".to_string(),
        }
    }
}

impl EditorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| EditorError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| EditorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.token_ttl_secs == 0 {
            return Err(EditorError::Config("token TTL must be greater than 0".to_string()));
        }
        if self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(EditorError::Config(format!(
                "token TTL must be at most {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }
        if self.root_password.is_empty() {
            return Err(EditorError::Config("root password must not be empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(EditorError::Config("max connections must be greater than 0".to_string()));
        }
        if !self.path_prefix.starts_with('/') || self.path_prefix.len() < 2 {
            return Err(EditorError::Config(format!(
                "path prefix must start with '/': {:?}",
                self.path_prefix
            )));
        }
        Ok(())
    }

    /// Clamped to [`MAX_TOKEN_TTL_SECS`] for configs that skipped `validate`.
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.token_ttl_secs.min(MAX_TOKEN_TTL_SECS) as i64)
    }
}
