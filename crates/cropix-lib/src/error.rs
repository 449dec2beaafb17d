//! Error types for the prediction service
//!
//! Errors fall into two groups: those reported back to the caller as a
//! structured `{error}` payload (bad input, unknown crop, weather provider
//! trouble) and infrastructure faults that surface as server failures.

use serde::Serialize;
use thiserror::Error;

/// Failure kinds of the disease detection pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiseaseErrorKind {
    /// Payload is not valid base64
    DecodeError,
    /// Bytes decoded but are not a readable raster image
    ImageFormatError,
    /// Temporary storage or classifier failure
    ModelFault,
}

impl DiseaseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseErrorKind::DecodeError => "decode_error",
            DiseaseErrorKind::ImageFormatError => "image_format_error",
            DiseaseErrorKind::ModelFault => "model_fault",
        }
    }
}

/// Disease detection failure with its kind
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DiseaseError {
    pub kind: DiseaseErrorKind,
    pub message: String,
}

impl DiseaseError {
    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: DiseaseErrorKind::DecodeError,
            message: message.into(),
        }
    }

    pub fn image_format(message: impl Into<String>) -> Self {
        Self {
            kind: DiseaseErrorKind::ImageFormatError,
            message: message.into(),
        }
    }

    pub fn model_fault(message: impl Into<String>) -> Self {
        Self {
            kind: DiseaseErrorKind::ModelFault,
            message: message.into(),
        }
    }
}

/// Weather proxy failures
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Weather API key not found.")]
    MissingApiKey,

    #[error("City '{0}' not found.")]
    CityNotFound(String),

    #[error("Weather service responded with status {status}")]
    Upstream { status: u16 },

    #[error("Could not connect to the weather service: {0}")]
    Transport(String),

    #[error("Unexpected weather service response: {0}")]
    UnexpectedPayload(String),
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => WeatherError::Upstream {
                status: status.as_u16(),
            },
            None if err.is_decode() => WeatherError::UnexpectedPayload(err.to_string()),
            None => WeatherError::Transport(err.to_string()),
        }
    }
}

/// Service-level error
#[derive(Debug, Error)]
pub enum CropixError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Crop '{0}' not found in historical data.")]
    UnknownCrop(String),

    #[error("Historical data has {available} rows, at least {required} are required.")]
    InsufficientHistory { available: usize, required: usize },

    #[error("weeks_to_forecast must not exceed {max} (got {requested}).")]
    HorizonExceeded { requested: u32, max: u32 },

    #[error(transparent)]
    Disease(#[from] DiseaseError),

    #[error(transparent)]
    Weather(#[from] WeatherError),

    #[error("Failed to load artifact {name}: {source}")]
    Artifact {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Model fault in {model}: {source}")]
    ModelFault {
        model: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CropixError {
    pub fn model_fault(model: impl Into<String>, source: anyhow::Error) -> Self {
        CropixError::ModelFault {
            model: model.into(),
            source,
        }
    }

    /// True when the error belongs in an `{error}` payload rather than a
    /// server failure
    pub fn is_reportable(&self) -> bool {
        match self {
            CropixError::InvalidInput(_)
            | CropixError::UnknownCrop(_)
            | CropixError::InsufficientHistory { .. }
            | CropixError::HorizonExceeded { .. }
            | CropixError::Weather(_) => true,
            CropixError::Disease(e) => e.kind != DiseaseErrorKind::ModelFault,
            CropixError::Artifact { .. } | CropixError::ModelFault { .. } => false,
        }
    }

    /// Short machine-readable tag, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            CropixError::InvalidInput(_) => "invalid_input",
            CropixError::UnknownCrop(_) => "unknown_crop",
            CropixError::InsufficientHistory { .. } => "insufficient_history",
            CropixError::HorizonExceeded { .. } => "horizon_exceeded",
            CropixError::Disease(e) => e.kind.as_str(),
            CropixError::Weather(WeatherError::MissingApiKey) => "weather_api_key",
            CropixError::Weather(_) => "weather_upstream",
            CropixError::Artifact { .. } => "artifact",
            CropixError::ModelFault { .. } => "model_fault",
        }
    }
}

pub type CropixResult<T> = Result<T, CropixError>;
