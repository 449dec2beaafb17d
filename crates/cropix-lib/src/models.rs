//! Request and response records for every capability
//!
//! Field names follow the public JSON contract, so several fields keep the
//! capitalized names the web client sends.

use crate::error::{CropixError, CropixResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn ensure_finite(field: &str, value: f64) -> CropixResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CropixError::InvalidInput(format!("{} must be a finite number", field)))
    }
}

fn ensure_not_blank(field: &str, value: &str) -> CropixResult<()> {
    if value.trim().is_empty() {
        Err(CropixError::InvalidInput(format!("{} must not be empty", field)))
    } else {
        Ok(())
    }
}

/// Crop yield regression input
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct YieldRequest {
    pub Crop: String,
    pub Season: String,
    pub Area: f64,
    pub Fertilizer: f64,
    pub Crop_Year: i32,
    pub Pesticide: f64,
    pub Annual_Rainfall: f64,
}

impl YieldRequest {
    pub fn validate(&self) -> CropixResult<()> {
        ensure_not_blank("Crop", &self.Crop)?;
        ensure_not_blank("Season", &self.Season)?;
        ensure_finite("Area", self.Area)?;
        ensure_finite("Fertilizer", self.Fertilizer)?;
        ensure_finite("Pesticide", self.Pesticide)?;
        ensure_finite("Annual_Rainfall", self.Annual_Rainfall)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YieldResponse {
    pub predicted_yield: f64,
}

/// Soil and climate readings for crop recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct SoilRequest {
    pub N: f64,
    pub P: f64,
    pub K: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub rainfall: f64,
}

impl SoilRequest {
    /// Feature row in training order
    pub fn features(&self) -> [f32; 7] {
        [
            self.N as f32,
            self.P as f32,
            self.K as f32,
            self.temperature as f32,
            self.humidity as f32,
            self.ph as f32,
            self.rainfall as f32,
        ]
    }

    pub fn validate(&self) -> CropixResult<()> {
        ensure_finite("N", self.N)?;
        ensure_finite("P", self.P)?;
        ensure_finite("K", self.K)?;
        ensure_finite("temperature", self.temperature)?;
        ensure_finite("humidity", self.humidity)?;
        ensure_finite("ph", self.ph)?;
        ensure_finite("rainfall", self.rainfall)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoilResponse {
    pub recommended_crop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseRequest {
    pub image_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiseaseResponse {
    pub predicted_disease: String,
    pub confidence: f32,
}

/// Current soil nutrient levels for fertilizer recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct FertilizerRequest {
    pub Crop: String,
    pub Current_N: f64,
    pub Current_P: f64,
    pub Current_K: f64,
}

impl FertilizerRequest {
    pub fn validate(&self) -> CropixResult<()> {
        ensure_not_blank("Crop", &self.Crop)?;
        ensure_finite("Current_N", self.Current_N)?;
        ensure_finite("Current_P", self.Current_P)?;
        ensure_finite("Current_K", self.Current_K)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct FertilizerResponse {
    pub recommended_N: f64,
    pub recommended_P: f64,
    pub recommended_K: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRequest {
    pub crop_name: String,
    pub weeks_to_forecast: u32,
}

/// Market forecast keyed by crop, then by ISO date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResponse {
    pub forecast: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRequest {
    pub city: String,
    pub days: u32,
}

impl WeatherRequest {
    pub fn validate(&self) -> CropixResult<()> {
        ensure_not_blank("city", &self.city)?;
        if self.days == 0 {
            return Err(CropixError::InvalidInput("days must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Daily weather summary, identical for every provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub min_temp_c: f64,
    pub max_temp_c: f64,
    pub avg_temp_c: f64,
    pub avg_humidity: f64,
    pub chance_of_rain: f64,
    pub condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherResponse {
    pub forecast: Vec<ForecastPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yield_request_uses_wire_field_names() {
        let json = r#"{"Crop":"Rice","Season":"Kharif","Area":120.5,"Fertilizer":3000.0,
            "Crop_Year":2020,"Pesticide":45.0,"Annual_Rainfall":1100.0}"#;
        let request: YieldRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.Crop, "Rice");
        assert_eq!(request.Crop_Year, 2020);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_soil_features_keep_training_order() {
        let request = SoilRequest {
            N: 90.0,
            P: 42.0,
            K: 43.0,
            temperature: 20.8,
            humidity: 82.0,
            ph: 6.5,
            rainfall: 202.9,
        };
        assert_eq!(request.features(), [90.0, 42.0, 43.0, 20.8, 82.0, 6.5, 202.9]);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let request = FertilizerRequest {
            Crop: "Rice".to_string(),
            Current_N: f64::NAN,
            Current_P: 20.0,
            Current_K: 15.0,
        };
        assert!(matches!(request.validate(), Err(CropixError::InvalidInput(_))));
    }

    #[test]
    fn test_weather_request_requires_days() {
        let request = WeatherRequest {
            city: "Indore".to_string(),
            days: 0,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_negative_weeks_fail_to_deserialize() {
        let result: Result<MarketRequest, _> =
            serde_json::from_str(r#"{"crop_name":"Wheat","weeks_to_forecast":-2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_weather_response_omits_missing_city() {
        let response = WeatherResponse {
            forecast: vec![],
            city_name: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("city_name").is_none());
    }
}
