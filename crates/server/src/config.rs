//! Server configuration

use anyhow::Result;
use cropix_lib::{ServiceSettings, WeatherSettings};
use serde::Deserialize;

/// Server configuration
///
/// Read from an optional `cropix.toml`, then `CROPIX_*` environment
/// variables with `__` between nested keys, e.g. `CROPIX_SERVICE__MODEL_DIR`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub service: ServiceSettings,

    #[serde(default)]
    pub weather: WeatherSettings,
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("cropix").required(false))
            .add_source(
                config::Environment::with_prefix("CROPIX")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(config, std::env::var("WEATHER_API_KEY").ok())
    }

    /// Deserialize, falling back to a bare `WEATHER_API_KEY` for the weather key
    fn from_config(config: config::Config, weather_api_key: Option<String>) -> Result<Self> {
        let mut parsed: ServerConfig = config.try_deserialize()?;
        if parsed.weather.api_key.is_none() {
            parsed.weather.api_key = weather_api_key.filter(|k| !k.trim().is_empty());
        }
        Ok(parsed)
    }
}
