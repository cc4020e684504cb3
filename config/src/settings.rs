//! Application settings: a settings.toml on disk, overridden by
//! environment variables. The access token never touches the file; it is
//! read from the environment at resolve time only.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use thiserror::Error;

use crate::PathManager;

/// Environment variable names, also the override keys for the file values.
pub const ENV_HOST: &str = "PLATFORM_HOST";
pub const ENV_TOKEN: &str = "PLATFORM_TOKEN";
pub const ENV_SPACE_ID: &str = "NLQ_SPACE_ID";
pub const ENV_WAREHOUSE_ID: &str = "WAREHOUSE_ID";
pub const ENV_INVENTORY_TABLE: &str = "INVENTORY_TABLE";
pub const ENV_SERVING_ENDPOINT: &str = "SERVING_ENDPOINT";

#[derive(Clone, Debug, Error)]
pub enum ConfigError {
    #[error("missing setting: set {0} or add it to settings.toml")]
    Missing(&'static str),

    #[error("could not determine settings path")]
    NoSettingsPath,

    #[error("failed to write settings: {0}")]
    Write(String),
}

/// Values stored in settings.toml. Everything is optional in the file;
/// `resolve` decides what the application actually requires.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Workspace host, e.g. "https://workspace.example.com".
    pub host: Option<String>,
    /// NL-to-SQL space backing the chat assistant.
    pub space_id: Option<String>,
    /// SQL warehouse the inventory table is read through.
    pub warehouse_id: Option<String>,
    /// Fully qualified inventory table name.
    pub inventory_table: Option<String>,
    /// LLM serving endpoint for allocation recommendations.
    pub serving_endpoint: Option<String>,
}

impl Settings {
    /// Load settings from the settings file, or return defaults if not
    /// found, then overlay any environment variables.
    pub fn load() -> Self {
        let mut settings = Self::load_file();
        settings.overlay_env();
        settings
    }

    fn load_file() -> Self {
        let Some(path) = PathManager::settings_path() else {
            return Self::default();
        };
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }

    fn overlay_env(&mut self) {
        let overlay = |slot: &mut Option<String>, var: &str| {
            if let Ok(value) = env::var(var) {
                if !value.is_empty() {
                    *slot = Some(value);
                }
            }
        };
        overlay(&mut self.host, ENV_HOST);
        overlay(&mut self.space_id, ENV_SPACE_ID);
        overlay(&mut self.warehouse_id, ENV_WAREHOUSE_ID);
        overlay(&mut self.inventory_table, ENV_INVENTORY_TABLE);
        overlay(&mut self.serving_endpoint, ENV_SERVING_ENDPOINT);
    }

    /// Save the file-backed values to settings.toml.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = PathManager::settings_path().ok_or(ConfigError::NoSettingsPath)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        fs::write(&path, content).map_err(|e| ConfigError::Write(e.to_string()))?;
        Ok(())
    }

    /// Require everything the application needs, pulling the token from the
    /// environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let require = |value: &Option<String>, var: &'static str| {
            value.clone().ok_or(ConfigError::Missing(var))
        };
        let token = env::var(ENV_TOKEN)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::Missing(ENV_TOKEN))?;
        Ok(ResolvedConfig {
            host: require(&self.host, ENV_HOST)?,
            token,
            space_id: require(&self.space_id, ENV_SPACE_ID)?,
            warehouse_id: require(&self.warehouse_id, ENV_WAREHOUSE_ID)?,
            inventory_table: require(&self.inventory_table, ENV_INVENTORY_TABLE)?,
            serving_endpoint: require(&self.serving_endpoint, ENV_SERVING_ENDPOINT)?,
        })
    }
}

/// Fully resolved configuration with nothing optional left.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub host: String,
    pub token: String,
    pub space_id: String,
    pub warehouse_id: String,
    pub inventory_table: String,
    pub serving_endpoint: String,
}
