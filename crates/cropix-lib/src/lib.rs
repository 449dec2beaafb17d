//! Cropix prediction library
//!
//! This crate provides the core functionality for:
//! - Loading trained models and their label files
//! - Crop yield, soil crop, disease, and fertilizer inference
//! - Autoregressive market price forecasting
//! - Weather forecast proxying
//! - Health checks and observability

pub mod artifacts;
pub mod error;
pub mod forecast;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod weather;

pub use error::{CropixError, CropixResult, DiseaseError, DiseaseErrorKind, WeatherError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{CropixMetrics, StructuredLogger};
pub use service::{ServiceContext, ServiceSettings};
pub use weather::{ProviderKind, WeatherProxy, WeatherSettings};
