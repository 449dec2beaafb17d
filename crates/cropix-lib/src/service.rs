//! Service context shared by the HTTP server and the CLI
//!
//! Built once at startup and never mutated afterwards. Each capability is an
//! async method; model inference runs on tokio's blocking pool.

use crate::artifacts::{ArtifactLayout, ArtifactStore};
use crate::error::{CropixError, CropixResult, DiseaseError};
use crate::forecast::{PriceTable, DEFAULT_MAX_FORECAST_WEEKS};
use crate::models::{
    DiseaseRequest, DiseaseResponse, FertilizerRequest, FertilizerResponse, MarketRequest,
    MarketResponse, SoilRequest, SoilResponse, WeatherRequest, WeatherResponse, YieldRequest,
    YieldResponse,
};
use crate::observability::{CropixMetrics, StructuredLogger};
use crate::predictor::{
    forecast_market_prices, predict_yield, recommend_fertilizer, recommend_soil_crop,
    DiseaseClassifier,
};
use crate::weather::{WeatherProxy, WeatherSettings};
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Endpoint names used in metrics and logs
pub mod endpoints {
    pub const CROP_YIELD: &str = "predict_crop_yield";
    pub const SOIL: &str = "recommend_soil_crop";
    pub const DISEASE: &str = "detect_disease";
    pub const FERTILIZER: &str = "recommend_fertilizer";
    pub const MARKET: &str = "forecast_market_prices";
    pub const WEATHER: &str = "weather_forecast";
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Weekly crop price table, re-read on every market forecast
    #[serde(default = "default_price_data_path")]
    pub price_data_path: PathBuf,

    /// Directory for transient disease images
    #[serde(default = "std::env::temp_dir")]
    pub temp_dir: PathBuf,

    #[serde(default = "default_max_forecast_weeks")]
    pub max_forecast_weeks: u32,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("Trained_models")
}

fn default_price_data_path() -> PathBuf {
    PathBuf::from("Datasets/central_india_weekly_crop_prices.csv")
}

fn default_max_forecast_weeks() -> u32 {
    DEFAULT_MAX_FORECAST_WEEKS
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            price_data_path: default_price_data_path(),
            temp_dir: std::env::temp_dir(),
            max_forecast_weeks: default_max_forecast_weeks(),
        }
    }
}

impl ServiceSettings {
    /// Crops available for market forecasts, read from the current price table
    ///
    /// Needs no model files, only the price table.
    pub fn market_crops(&self) -> CropixResult<Vec<String>> {
        let table = PriceTable::load(&self.price_data_path).map_err(|e| CropixError::Artifact {
            name: "price_data".to_string(),
            source: e,
        })?;
        Ok(table.crops().to_vec())
    }
}

/// Immutable handles to every capability
#[derive(Clone)]
pub struct ServiceContext {
    artifacts: Arc<ArtifactStore>,
    weather: WeatherProxy,
    settings: Arc<ServiceSettings>,
    metrics: CropixMetrics,
    logger: StructuredLogger,
}

impl ServiceContext {
    /// Load every artifact and configure the weather proxy
    ///
    /// The price table header is read here to size the market model input;
    /// any failure aborts startup.
    pub fn load(settings: ServiceSettings, weather: &WeatherSettings) -> anyhow::Result<Self> {
        let weather = WeatherProxy::from_settings(weather)?;
        Self::load_with_weather(settings, weather)
    }

    /// Load every artifact around an already configured weather proxy
    pub fn load_with_weather(settings: ServiceSettings, weather: WeatherProxy) -> anyhow::Result<Self> {
        let table = PriceTable::load(&settings.price_data_path).with_context(|| {
            format!(
                "Failed to read price table {}",
                settings.price_data_path.display()
            )
        })?;

        let layout = ArtifactLayout::new(&settings.model_dir);
        let artifacts = ArtifactStore::load(&layout, table.crops().len())?;

        let context = Self::new(artifacts, weather, settings);
        for artifact in context.artifacts.loaded() {
            context.logger.log_artifact_loaded(artifact);
        }
        context.metrics.set_model_info(context.artifacts.loaded());
        Ok(context)
    }

    pub fn new(artifacts: ArtifactStore, weather: WeatherProxy, settings: ServiceSettings) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
            weather,
            settings: Arc::new(settings),
            metrics: CropixMetrics::new(),
            logger: StructuredLogger::new("cropix"),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn weather(&self) -> &WeatherProxy {
        &self.weather
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    pub async fn predict_crop_yield(&self, request: YieldRequest) -> CropixResult<YieldResponse> {
        self.blocking(endpoints::CROP_YIELD, move |store, _| {
            predict_yield(store.crop_yield(), store.crop_yield_columns(), &request)
        })
        .await
    }

    pub async fn recommend_soil_crop(&self, request: SoilRequest) -> CropixResult<SoilResponse> {
        self.blocking(endpoints::SOIL, move |store, _| {
            recommend_soil_crop(store.soil(), store.soil_labels(), &request)
        })
        .await
    }

    pub async fn detect_disease(&self, request: DiseaseRequest) -> CropixResult<DiseaseResponse> {
        self.blocking(endpoints::DISEASE, move |store, settings| {
            DiseaseClassifier::new(store.disease(), store.disease_classes(), &settings.temp_dir)
                .detect(&request.image_base64)
                .map_err(CropixError::from)
        })
        .await
    }

    /// Classify an image file on disk, skipping the base64 transport
    pub async fn detect_disease_file(&self, path: PathBuf) -> CropixResult<DiseaseResponse> {
        self.blocking(endpoints::DISEASE, move |store, settings| {
            DiseaseClassifier::new(store.disease(), store.disease_classes(), &settings.temp_dir)
                .detect_file(&path)
                .map_err(CropixError::from)
        })
        .await
    }

    pub async fn recommend_fertilizer(
        &self,
        request: FertilizerRequest,
    ) -> CropixResult<FertilizerResponse> {
        self.blocking(endpoints::FERTILIZER, move |store, _| {
            recommend_fertilizer(store.fertilizer(), store.fertilizer_columns(), &request)
        })
        .await
    }

    pub async fn forecast_market_prices(&self, request: MarketRequest) -> CropixResult<MarketResponse> {
        self.blocking(endpoints::MARKET, move |store, settings| {
            forecast_market_prices(
                store.market(),
                &settings.price_data_path,
                settings.max_forecast_weeks,
                &request,
            )
        })
        .await
    }

    pub async fn weather_forecast(&self, request: WeatherRequest) -> CropixResult<WeatherResponse> {
        self.metrics.inc_requests(endpoints::WEATHER);
        let start = Instant::now();
        let result = self.weather.forecast(&request).await;
        self.finish(endpoints::WEATHER, start, result)
    }

    /// Run a CPU-bound adapter on the blocking pool with metrics and logging
    async fn blocking<T, F>(&self, endpoint: &'static str, work: F) -> CropixResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ArtifactStore, &ServiceSettings) -> CropixResult<T> + Send + 'static,
    {
        self.metrics.inc_requests(endpoint);
        let start = Instant::now();

        let store = Arc::clone(&self.artifacts);
        let settings = Arc::clone(&self.settings);
        let result = tokio::task::spawn_blocking(move || work(&store, &settings))
            .await
            .unwrap_or_else(|e| Err(join_error(endpoint, e)));

        self.finish(endpoint, start, result)
    }

    fn finish<T>(&self, endpoint: &str, start: Instant, result: CropixResult<T>) -> CropixResult<T> {
        let elapsed = start.elapsed();
        match &result {
            Ok(_) => {
                self.metrics.observe_inference_latency(endpoint, elapsed.as_secs_f64());
                self.logger.log_prediction(endpoint, elapsed.as_millis() as u64);
            }
            Err(e) => {
                self.metrics.inc_errors(endpoint, e.kind());
                if e.is_reportable() {
                    self.logger.log_rejected(endpoint, e.kind(), &e.to_string());
                } else {
                    self.logger.log_fault(endpoint, e.kind(), &format!("{:#}", e));
                }
            }
        }
        result
    }
}

fn join_error(endpoint: &str, err: tokio::task::JoinError) -> CropixError {
    if endpoint == endpoints::DISEASE {
        DiseaseError::model_fault(format!("Inference task failed: {}", err)).into()
    } else {
        CropixError::model_fault(endpoint, anyhow::anyhow!("Inference task failed: {}", err))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::artifacts::{ArtifactParts, ColumnSchema};
    use crate::predictor::testing::constant;

    pub fn schema(json: &str) -> ColumnSchema {
        serde_json::from_str(json).unwrap()
    }

    /// Store backed by constant stub models
    pub fn stub_store() -> ArtifactStore {
        ArtifactStore::from_parts(ArtifactParts {
            crop_yield: Arc::new(constant("crop_yield", vec![2.75])),
            crop_yield_columns: schema(
                r#"{"columns": [
                    {"name": "Crop", "kind": "categorical", "categories": ["Rice", "Wheat"]},
                    {"name": "Season", "kind": "categorical", "categories": ["Kharif", "Rabi"]},
                    {"name": "Crop_Year", "kind": "numeric"},
                    {"name": "Area", "kind": "numeric"},
                    {"name": "Annual_Rainfall", "kind": "numeric"},
                    {"name": "Fertilizer", "kind": "numeric"},
                    {"name": "Pesticide", "kind": "numeric"}
                ]}"#,
            ),
            soil: Arc::new(constant("soil_crop", vec![1.0])),
            soil_labels: vec!["maize".to_string(), "rice".to_string()],
            disease: Arc::new(constant("disease_detection", vec![0.2, 0.8])),
            disease_classes: vec!["Corn___Common_rust".to_string(), "Corn___healthy".to_string()],
            fertilizer: Arc::new(constant("fertilizer", vec![80.0, 40.0, 40.0])),
            fertilizer_columns: schema(
                r#"{"columns": [
                    {"name": "Crop", "kind": "categorical", "categories": ["Maize", "Rice"]},
                    {"name": "Current_N", "kind": "numeric"},
                    {"name": "Current_P", "kind": "numeric"},
                    {"name": "Current_K", "kind": "numeric"}
                ]}"#,
            ),
            market: Arc::new(constant("market_lstm", vec![0.5, 0.5])),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::testing::stub_store;
    use super::*;
    use std::io::Write;

    fn context(price_data: PathBuf, temp_dir: PathBuf) -> ServiceContext {
        ServiceContext::new(
            stub_store(),
            WeatherProxy::unconfigured(),
            ServiceSettings {
                price_data_path: price_data,
                temp_dir,
                ..ServiceSettings::default()
            },
        )
    }

    #[test]
    fn test_settings_defaults() {
        let settings: ServiceSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.model_dir, PathBuf::from("Trained_models"));
        assert_eq!(settings.max_forecast_weeks, 52);
        assert_eq!(
            settings.price_data_path,
            PathBuf::from("Datasets/central_india_weekly_crop_prices.csv")
        );
    }

    #[tokio::test]
    async fn test_soil_runs_on_blocking_pool() {
        let ctx = context(PathBuf::from("unused.csv"), std::env::temp_dir());
        let response = ctx
            .recommend_soil_crop(SoilRequest {
                N: 90.0,
                P: 42.0,
                K: 43.0,
                temperature: 20.8,
                humidity: 82.0,
                ph: 6.5,
                rainfall: 202.9,
            })
            .await
            .unwrap();
        assert_eq!(response.recommended_crop, "rice");
    }

    #[tokio::test]
    async fn test_market_crops_and_forecast() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Wheat,Gram").unwrap();
        for week in 0..9 {
            writeln!(file, "2023-03-{:02},{},{}", 1 + week * 3, 2100 + week, 5200 - week).unwrap();
        }

        let ctx = context(file.path().to_path_buf(), std::env::temp_dir());
        assert_eq!(ctx.settings().market_crops().unwrap(), vec!["Wheat", "Gram"]);

        let response = ctx
            .forecast_market_prices(MarketRequest {
                crop_name: "Gram".to_string(),
                weeks_to_forecast: 3,
            })
            .await
            .unwrap();
        assert_eq!(response.forecast["Gram"].len(), 3);
    }

    #[test]
    fn test_market_crops_need_only_price_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Date,Soybean,Tur").unwrap();
        writeln!(file, "2024-02-05,4510,7020").unwrap();

        let settings = ServiceSettings {
            model_dir: PathBuf::from("/nonexistent/models"),
            price_data_path: file.path().to_path_buf(),
            ..ServiceSettings::default()
        };
        assert_eq!(settings.market_crops().unwrap(), vec!["Soybean", "Tur"]);
        assert!(ServiceContext::load_with_weather(settings, WeatherProxy::unconfigured()).is_err());
    }

    #[tokio::test]
    async fn test_weather_without_key_is_reported() {
        let ctx = context(PathBuf::from("unused.csv"), std::env::temp_dir());
        let err = ctx
            .weather_forecast(WeatherRequest {
                city: "Jabalpur".to_string(),
                days: 3,
            })
            .await
            .unwrap_err();
        assert!(err.is_reportable());
        assert_eq!(err.to_string(), "Weather API key not found.");
    }

    #[tokio::test]
    async fn test_disease_file_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("leaf.png");
        image::RgbImage::from_pixel(12, 12, image::Rgb([20, 160, 40]))
            .save(&path)
            .unwrap();

        let ctx = context(PathBuf::from("unused.csv"), dir.path().to_path_buf());
        let response = ctx.detect_disease_file(path).await.unwrap();
        assert_eq!(response.predicted_disease, "Corn___healthy");
    }
}
