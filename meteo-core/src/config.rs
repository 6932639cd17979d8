use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::search::SearchConfig;

const DEFAULT_GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com";

/// Which search bar the debounce interval applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Detail,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// language = "fr"
/// home_debounce_ms = 1000
/// detail_debounce_ms = 500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoding_url: String,
    pub forecast_url: String,
    /// Language of geocoding results, e.g. "fr".
    pub language: String,
    pub suggestion_limit: usize,
    pub min_query_len: usize,
    pub home_debounce_ms: u64,
    pub detail_debounce_ms: u64,
    /// Overrides the platform data directory for the favorites file.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            language: "fr".to_string(),
            suggestion_limit: 5,
            min_query_len: 3,
            home_debounce_ms: 1000,
            detail_debounce_ms: 500,
            data_dir: None,
        }
    }
}

impl Config {
    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    /// Directory holding the favorites store.
    pub fn favorites_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs()?.data_dir().to_path_buf()),
        }
    }

    /// Search bar settings for one screen.
    pub fn search_config(&self, screen: Screen) -> SearchConfig {
        let debounce_ms = match screen {
            Screen::Home => self.home_debounce_ms,
            Screen::Detail => self.detail_debounce_ms,
        };

        SearchConfig {
            debounce: Duration::from_millis(debounce_ms),
            min_query_len: self.min_query_len,
            limit: self.suggestion_limit,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "meteo", "meteo")
        .ok_or_else(|| anyhow!("Could not determine platform config directory"))
}
