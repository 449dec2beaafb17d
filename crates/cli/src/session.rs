//! Lazily loaded service state
//!
//! Weather forecasts and the market crop list never touch the model files,
//! so the artifacts are loaded the first time a model-backed command runs.

use anyhow::{Context, Result};
use cropix_lib::{CropixResult, ServiceContext, ServiceSettings, WeatherProxy, WeatherSettings};

pub struct Session {
    settings: ServiceSettings,
    weather: WeatherProxy,
    context: Option<ServiceContext>,
}

impl Session {
    pub fn new(settings: ServiceSettings, weather: &WeatherSettings) -> Result<Self> {
        Ok(Self {
            settings,
            weather: WeatherProxy::from_settings(weather)?,
            context: None,
        })
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn weather(&self) -> &WeatherProxy {
        &self.weather
    }

    pub fn market_crops(&self) -> CropixResult<Vec<String>> {
        self.settings.market_crops()
    }

    /// Context with every model loaded, loading it on first use
    pub fn models(&mut self) -> Result<ServiceContext> {
        if let Some(context) = &self.context {
            return Ok(context.clone());
        }

        let context = ServiceContext::load_with_weather(self.settings.clone(), self.weather.clone())
            .context("Failed to load the Cropix models")?;
        self.context = Some(context.clone());
        Ok(context)
    }
}
