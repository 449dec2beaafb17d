//! WeatherAPI.com integration
//!
//! A single `forecast.json` call returns daily summaries directly.

use super::{endpoint, WeatherProvider};
use crate::error::WeatherError;
use crate::models::{ForecastPoint, WeatherResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "http://api.weatherapi.com/v1";

/// Forecast horizon of the WeatherAPI.com forecast endpoint
const MAX_DAYS: u32 = 14;

/// Error code WeatherAPI.com returns when the location query matches nothing
const NO_LOCATION_FOUND: i64 = 1006;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    location: Option<Location>,
    forecast: Forecast,
}

#[derive(Debug, Deserialize)]
struct Location {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ForecastDay {
    date: String,
    day: Day,
}

#[derive(Debug, Deserialize)]
struct Day {
    maxtemp_c: f64,
    mintemp_c: f64,
    avgtemp_c: f64,
    avghumidity: f64,
    daily_chance_of_rain: f64,
    condition: Condition,
}

#[derive(Debug, Deserialize)]
struct Condition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: i64,
}

impl From<ForecastDay> for ForecastPoint {
    fn from(day: ForecastDay) -> Self {
        ForecastPoint {
            date: day.date,
            min_temp_c: day.day.mintemp_c,
            max_temp_c: day.day.maxtemp_c,
            avg_temp_c: day.day.avgtemp_c,
            avg_humidity: day.day.avghumidity,
            chance_of_rain: day.day.daily_chance_of_rain,
            condition: day.day.condition.text,
        }
    }
}

/// WeatherAPI.com provider
pub struct WeatherApiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl WeatherApiProvider {
    pub fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn name(&self) -> &'static str {
        "weatherapi"
    }

    fn max_days(&self) -> u32 {
        MAX_DAYS
    }

    async fn daily_forecast(&self, city: &str, days: u32) -> Result<WeatherResponse, WeatherError> {
        let days = days.to_string();
        let response = self
            .client
            .get(endpoint(&self.base_url, "forecast.json"))
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", city),
                ("days", days.as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return match serde_json::from_str::<ErrorBody>(&body) {
                Ok(err) if err.error.code == NO_LOCATION_FOUND => {
                    Err(WeatherError::CityNotFound(city.to_string()))
                }
                _ => Err(WeatherError::Upstream {
                    status: status.as_u16(),
                }),
            };
        }

        let payload: ForecastResponse = response.json().await?;

        Ok(WeatherResponse {
            forecast: payload
                .forecast
                .forecastday
                .into_iter()
                .map(ForecastPoint::from)
                .collect(),
            city_name: payload.location.map(|l| l.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const BODY: &str = r#"{
        "location": {"name": "Indore", "country": "India"},
        "forecast": {"forecastday": [
            {"date": "2024-06-01", "day": {"maxtemp_c": 38.2, "mintemp_c": 27.1, "avgtemp_c": 32.4,
             "avghumidity": 41, "daily_chance_of_rain": 10, "condition": {"text": "Sunny", "code": 1000}}},
            {"date": "2024-06-02", "day": {"maxtemp_c": 36.0, "mintemp_c": 26.5, "avgtemp_c": 31.0,
             "avghumidity": 55, "daily_chance_of_rain": 64, "condition": {"text": "Patchy rain nearby", "code": 1063}}}
        ]}
    }"#;

    fn provider(base_url: String) -> WeatherApiProvider {
        WeatherApiProvider::new(Client::new(), "test-key".to_string(), Some(base_url))
    }

    #[tokio::test]
    async fn test_reshapes_daily_forecast() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/forecast.json")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "test-key".into()),
                Matcher::UrlEncoded("q".into(), "Indore".into()),
                Matcher::UrlEncoded("days".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(BODY)
            .create_async()
            .await;

        let response = provider(server.url()).daily_forecast("Indore", 2).await.unwrap();
        mock.assert_async().await;

        assert_eq!(response.city_name.as_deref(), Some("Indore"));
        assert_eq!(response.forecast.len(), 2);
        assert_eq!(
            response.forecast[1],
            ForecastPoint {
                date: "2024-06-02".to_string(),
                min_temp_c: 26.5,
                max_temp_c: 36.0,
                avg_temp_c: 31.0,
                avg_humidity: 55.0,
                chance_of_rain: 64.0,
                condition: "Patchy rain nearby".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_unknown_city() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/forecast.json")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": {"code": 1006, "message": "No matching location found."}}"#)
            .create_async()
            .await;

        let err = provider(server.url()).daily_forecast("Atlantis", 3).await.unwrap_err();
        assert!(matches!(err, WeatherError::CityNotFound(ref c) if c == "Atlantis"));
    }

    #[tokio::test]
    async fn test_upstream_failure_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/forecast.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = provider(server.url()).daily_forecast("Indore", 3).await.unwrap_err();
        assert!(matches!(err, WeatherError::Upstream { status: 503 }));
    }
}
