//! Weather forecast proxy
//!
//! Calls an external forecast provider and reshapes its response into
//! [`ForecastPoint`](crate::models::ForecastPoint) records. Providers are interchangeable behind
//! [`WeatherProvider`] and chosen by configuration.

mod openweather;
mod weatherapi;

pub use openweather::{OpenWeatherOneCall, OpenWeatherThreeHourly};
pub use weatherapi::WeatherApiProvider;

use crate::error::{CropixResult, WeatherError};
use crate::models::{WeatherRequest, WeatherResponse};
use crate::observability::CropixMetrics;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Available provider integrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ProviderKind {
    /// WeatherAPI.com single-call daily forecast
    #[default]
    #[serde(rename = "weatherapi")]
    WeatherApi,
    /// OpenWeather geocoding + One Call daily forecast
    #[serde(rename = "openweather_onecall")]
    OpenWeatherOneCall,
    /// OpenWeather geocoding + 5 day / 3 hour forecast aggregated per day
    #[serde(rename = "openweather_3hourly")]
    OpenWeatherThreeHourly,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weatherapi" => Ok(ProviderKind::WeatherApi),
            "openweather_onecall" => Ok(ProviderKind::OpenWeatherOneCall),
            "openweather_3hourly" => Ok(ProviderKind::OpenWeatherThreeHourly),
            other => Err(format!(
                "unknown weather provider '{}' (expected weatherapi, openweather_onecall or openweather_3hourly)",
                other
            )),
        }
    }
}

/// Weather proxy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherSettings {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Provider API key; requests fail with a reported error when absent
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override of the provider's base URL
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Trait for forecast provider integrations
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Largest day count the provider can return
    fn max_days(&self) -> u32;

    /// Daily forecast for `days` days, already capped to `max_days`
    async fn daily_forecast(&self, city: &str, days: u32) -> Result<WeatherResponse, WeatherError>;
}

/// Front door used by the dispatchers
#[derive(Clone)]
pub struct WeatherProxy {
    provider: Option<Arc<dyn WeatherProvider>>,
    metrics: CropixMetrics,
}

impl WeatherProxy {
    pub fn from_settings(settings: &WeatherSettings) -> anyhow::Result<Self> {
        let api_key = match settings.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                warn!("No weather API key configured, weather forecasts will be unavailable");
                return Ok(Self::unconfigured());
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        let base_url = settings.base_url.clone();

        let provider: Arc<dyn WeatherProvider> = match settings.provider {
            ProviderKind::WeatherApi => Arc::new(WeatherApiProvider::new(client, api_key, base_url)),
            ProviderKind::OpenWeatherOneCall => {
                Arc::new(OpenWeatherOneCall::new(client, api_key, base_url))
            }
            ProviderKind::OpenWeatherThreeHourly => {
                Arc::new(OpenWeatherThreeHourly::new(client, api_key, base_url))
            }
        };

        info!(provider = provider.name(), max_days = provider.max_days(), "Weather proxy configured");
        Ok(Self::with_provider(provider))
    }

    pub fn with_provider(provider: Arc<dyn WeatherProvider>) -> Self {
        Self {
            provider: Some(provider),
            metrics: CropixMetrics::new(),
        }
    }

    /// Proxy without a provider, as when no API key is configured
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            metrics: CropixMetrics::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_name(&self) -> Option<&'static str> {
        self.provider.as_ref().map(|p| p.name())
    }

    pub fn max_days(&self) -> Option<u32> {
        self.provider.as_ref().map(|p| p.max_days())
    }

    /// Fetch a forecast, silently capping the day count to the provider maximum
    pub async fn forecast(&self, request: &WeatherRequest) -> CropixResult<WeatherResponse> {
        let provider = self.provider.as_ref().ok_or(WeatherError::MissingApiKey)?;
        request.validate()?;

        let days = request.days.min(provider.max_days());

        // Only the provider round trip counts as upstream latency
        let start = Instant::now();
        let result = provider.daily_forecast(request.city.trim(), days).await;
        let elapsed = start.elapsed();
        self.metrics.observe_weather_latency(elapsed.as_secs_f64());

        let mut response = result.map_err(|e| {
            warn!(
                event = "weather_upstream_failure",
                provider = provider.name(),
                city = %request.city,
                error = %e,
                "Weather provider request failed"
            );
            e
        })?;
        response.forecast.truncate(days as usize);

        info!(
            provider = provider.name(),
            city = %request.city,
            requested_days = request.days,
            returned_days = response.forecast.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Weather forecast served"
        );

        Ok(response)
    }
}

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
