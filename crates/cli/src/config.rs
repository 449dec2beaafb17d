//! Configuration management for the CLI
//!
//! Values given on the command line or through the environment win over the
//! optional `~/.config/cropix/config.json`, which wins over built-in defaults.

use crate::output::OutputFormat;
use anyhow::{Context, Result};
use cropix_lib::{ProviderKind, ServiceSettings, WeatherSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults stored in the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub model_dir: Option<PathBuf>,
    pub price_data: Option<PathBuf>,
    pub weather_provider: Option<String>,
    pub default_format: Option<OutputFormat>,
}

/// Overrides collected from flags and environment variables
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub model_dir: Option<PathBuf>,
    pub price_data: Option<PathBuf>,
    pub weather_api_key: Option<String>,
    pub weather_provider: Option<String>,
    pub format: Option<OutputFormat>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("cropix").join("config.json"))
    }

    /// Service settings after applying overrides
    pub fn service_settings(&self, overrides: &Overrides) -> ServiceSettings {
        let defaults = ServiceSettings::default();
        ServiceSettings {
            model_dir: overrides
                .model_dir
                .clone()
                .or_else(|| self.model_dir.clone())
                .unwrap_or(defaults.model_dir),
            price_data_path: overrides
                .price_data
                .clone()
                .or_else(|| self.price_data.clone())
                .unwrap_or(defaults.price_data_path),
            ..defaults
        }
    }

    pub fn weather_settings(&self, overrides: &Overrides) -> Result<WeatherSettings> {
        let provider = match overrides
            .weather_provider
            .as_deref()
            .or(self.weather_provider.as_deref())
        {
            Some(name) => name.parse::<ProviderKind>().map_err(anyhow::Error::msg)?,
            None => ProviderKind::default(),
        };

        Ok(WeatherSettings {
            provider,
            api_key: overrides.weather_api_key.clone(),
            ..WeatherSettings::default()
        })
    }

    pub fn format(&self, overrides: &Overrides) -> OutputFormat {
        overrides
            .format
            .or(self.default_format)
            .unwrap_or_default()
    }
}
