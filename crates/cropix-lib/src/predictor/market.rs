//! Market price forecasting endpoint adapter

use super::InferenceModel;
use crate::error::{CropixError, CropixResult};
use crate::forecast::{PriceTable, RollingForecaster};
use crate::models::{MarketRequest, MarketResponse};
use std::collections::BTreeMap;
use std::path::Path;

/// Forecast one crop's prices, re-reading the price table on every call
pub fn forecast_market_prices(
    model: &dyn InferenceModel,
    price_data: &Path,
    max_weeks: u32,
    request: &MarketRequest,
) -> CropixResult<MarketResponse> {
    let table = PriceTable::load(price_data).map_err(|e| CropixError::Artifact {
        name: "price_data".to_string(),
        source: e,
    })?;

    let forecast = RollingForecaster::new(model, max_weeks).forecast(
        &table,
        request.crop_name.trim(),
        request.weeks_to_forecast,
    )?;

    let series: BTreeMap<String, f64> = forecast
        .points
        .into_iter()
        .map(|(date, price)| (date.format("%Y-%m-%d").to_string(), price))
        .collect();

    Ok(MarketResponse {
        forecast: BTreeMap::from([(forecast.crop, series)]),
    })
}
