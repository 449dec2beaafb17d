//! OpenWeather integrations
//!
//! Both variants resolve the city through the geocoding API first. One Call
//! returns daily summaries; the 5 day / 3 hour forecast is aggregated into
//! local calendar days here.

use super::{endpoint, round2, WeatherProvider};
use crate::error::WeatherError;
use crate::models::{ForecastPoint, WeatherResponse};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const ONECALL_MAX_DAYS: u32 = 8;
const THREE_HOURLY_MAX_DAYS: u32 = 5;

#[derive(Debug, Deserialize)]
struct GeoLocation {
    name: String,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct Description {
    description: String,
}

/// Shared HTTP plumbing for the OpenWeather endpoints
struct OpenWeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(endpoint(&self.base_url, path))
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, WeatherError> {
        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Upstream {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| WeatherError::UnexpectedPayload(e.to_string()))
    }

    async fn geocode(&self, city: &str) -> Result<GeoLocation, WeatherError> {
        let matches: Vec<GeoLocation> = self
            .get("geo/1.0/direct", &[("q", city), ("limit", "1")])
            .await?;
        matches
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::CityNotFound(city.to_string()))
    }
}

fn local_date(timestamp: i64, offset_secs: i64) -> Result<NaiveDate, WeatherError> {
    DateTime::from_timestamp(timestamp + offset_secs, 0)
        .map(|dt| dt.date_naive())
        .ok_or_else(|| WeatherError::UnexpectedPayload(format!("timestamp {} out of range", timestamp)))
}

// One Call

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    timezone_offset: i64,
    daily: Vec<OneCallDay>,
}

#[derive(Debug, Deserialize)]
struct OneCallDay {
    dt: i64,
    temp: OneCallTemp,
    humidity: f64,
    #[serde(default)]
    pop: f64,
    #[serde(default)]
    weather: Vec<Description>,
}

#[derive(Debug, Deserialize)]
struct OneCallTemp {
    min: f64,
    max: f64,
    morn: f64,
    day: f64,
    eve: f64,
    night: f64,
}

/// OpenWeather One Call 3.0 daily forecast
pub struct OpenWeatherOneCall {
    inner: OpenWeatherClient,
}

impl OpenWeatherOneCall {
    pub fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            inner: OpenWeatherClient::new(client, api_key, base_url),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherOneCall {
    fn name(&self) -> &'static str {
        "openweather_onecall"
    }

    fn max_days(&self) -> u32 {
        ONECALL_MAX_DAYS
    }

    async fn daily_forecast(&self, city: &str, days: u32) -> Result<WeatherResponse, WeatherError> {
        let location = self.inner.geocode(city).await?;
        let lat = location.lat.to_string();
        let lon = location.lon.to_string();

        let payload: OneCallResponse = self
            .inner
            .get(
                "data/3.0/onecall",
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("exclude", "current,minutely,hourly,alerts"),
                    ("units", "metric"),
                ],
            )
            .await?;

        let mut forecast = Vec::with_capacity(days as usize);
        for day in payload.daily.into_iter().take(days as usize) {
            let date = local_date(day.dt, payload.timezone_offset)?;
            let t = &day.temp;
            forecast.push(ForecastPoint {
                date: date.format("%Y-%m-%d").to_string(),
                min_temp_c: t.min,
                max_temp_c: t.max,
                avg_temp_c: round2((t.morn + t.day + t.eve + t.night) / 4.0),
                avg_humidity: day.humidity,
                chance_of_rain: round2(day.pop * 100.0),
                condition: day
                    .weather
                    .into_iter()
                    .next()
                    .map(|w| w.description)
                    .unwrap_or_default(),
            });
        }

        Ok(WeatherResponse {
            forecast,
            city_name: Some(location.name),
        })
    }
}

// 5 day / 3 hour

#[derive(Debug, Deserialize)]
struct ThreeHourlyResponse {
    list: Vec<ThreeHourlyEntry>,
    city: ThreeHourlyCity,
}

#[derive(Debug, Deserialize)]
struct ThreeHourlyCity {
    #[serde(default)]
    timezone: i64,
}

#[derive(Debug, Deserialize)]
struct ThreeHourlyEntry {
    dt: i64,
    main: ThreeHourlyMain,
    #[serde(default)]
    pop: f64,
    #[serde(default)]
    weather: Vec<Description>,
}

#[derive(Debug, Deserialize)]
struct ThreeHourlyMain {
    temp: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: f64,
}

/// Running per-day aggregate of 3-hour slots
#[derive(Default)]
struct DayAccumulator {
    min: Option<f64>,
    max: Option<f64>,
    temp_sum: f64,
    humidity_sum: f64,
    slots: usize,
    max_pop: f64,
    // description -> (count, first slot seen)
    conditions: HashMap<String, (usize, usize)>,
}

impl DayAccumulator {
    fn add(&mut self, entry: ThreeHourlyEntry) {
        let m = &entry.main;
        self.min = Some(self.min.map_or(m.temp_min, |v| v.min(m.temp_min)));
        self.max = Some(self.max.map_or(m.temp_max, |v| v.max(m.temp_max)));
        self.temp_sum += m.temp;
        self.humidity_sum += m.humidity;
        self.max_pop = self.max_pop.max(entry.pop);

        if let Some(w) = entry.weather.into_iter().next() {
            let order = self.slots;
            self.conditions.entry(w.description).or_insert((0, order)).0 += 1;
        }
        self.slots += 1;
    }

    /// Most frequent description; ties go to the earliest slot
    fn dominant_condition(&self) -> String {
        self.conditions
            .iter()
            .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
            .map(|(desc, _)| desc.clone())
            .unwrap_or_default()
    }

    fn into_point(self, date: NaiveDate) -> ForecastPoint {
        let n = self.slots.max(1) as f64;
        ForecastPoint {
            date: date.format("%Y-%m-%d").to_string(),
            min_temp_c: self.min.unwrap_or_default(),
            max_temp_c: self.max.unwrap_or_default(),
            avg_temp_c: round2(self.temp_sum / n),
            avg_humidity: round2(self.humidity_sum / n),
            chance_of_rain: round2(self.max_pop * 100.0),
            condition: self.dominant_condition(),
        }
    }
}

/// OpenWeather 5 day / 3 hour forecast summarized per local day
pub struct OpenWeatherThreeHourly {
    inner: OpenWeatherClient,
}

impl OpenWeatherThreeHourly {
    pub fn new(client: Client, api_key: String, base_url: Option<String>) -> Self {
        Self {
            inner: OpenWeatherClient::new(client, api_key, base_url),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherThreeHourly {
    fn name(&self) -> &'static str {
        "openweather_3hourly"
    }

    fn max_days(&self) -> u32 {
        THREE_HOURLY_MAX_DAYS
    }

    async fn daily_forecast(&self, city: &str, days: u32) -> Result<WeatherResponse, WeatherError> {
        let location = self.inner.geocode(city).await?;
        let lat = location.lat.to_string();
        let lon = location.lon.to_string();

        let payload: ThreeHourlyResponse = self
            .inner
            .get(
                "data/2.5/forecast",
                &[("lat", lat.as_str()), ("lon", lon.as_str()), ("units", "metric")],
            )
            .await?;

        let offset = payload.city.timezone;
        let mut by_day: BTreeMap<NaiveDate, DayAccumulator> = BTreeMap::new();
        for entry in payload.list {
            let date = local_date(entry.dt, offset)?;
            by_day.entry(date).or_default().add(entry);
        }

        let forecast = by_day
            .into_iter()
            .take(days as usize)
            .map(|(date, acc)| acc.into_point(date))
            .collect();

        Ok(WeatherResponse {
            forecast,
            city_name: Some(location.name),
        })
    }
}
