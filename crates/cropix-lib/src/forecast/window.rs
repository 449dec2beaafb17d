//! Rolling-window forecast loop

use super::{MinMaxScaler, PriceTable, WINDOW_SIZE};
use crate::error::{CropixError, CropixResult};
use crate::predictor::{InferenceModel, ModelInput};
use chrono::{Duration, NaiveDate};
use std::collections::VecDeque;
use tracing::debug;

/// Forecast for one crop, in price units
#[derive(Debug, Clone, PartialEq)]
pub struct RollingForecast {
    pub crop: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Runs the sequence model step by step over a sliding window
pub struct RollingForecaster<'a> {
    model: &'a dyn InferenceModel,
    max_weeks: u32,
}

impl<'a> RollingForecaster<'a> {
    pub fn new(model: &'a dyn InferenceModel, max_weeks: u32) -> Self {
        Self { model, max_weeks }
    }

    /// Forecast `weeks` steps past the end of `table` for `crop`
    ///
    /// The scaler is fitted on the whole table on every call.
    pub fn forecast(&self, table: &PriceTable, crop: &str, weeks: u32) -> CropixResult<RollingForecast> {
        let crop_index = table
            .crop_index(crop)
            .ok_or_else(|| CropixError::UnknownCrop(crop.to_string()))?;

        if weeks > self.max_weeks {
            return Err(CropixError::HorizonExceeded {
                requested: weeks,
                max: self.max_weeks,
            });
        }

        if table.len() < WINDOW_SIZE {
            return Err(CropixError::InsufficientHistory {
                available: table.len(),
                required: WINDOW_SIZE,
            });
        }

        let (scaler, last_date) = match (MinMaxScaler::fit(table.rows()), table.last_date()) {
            (Some(scaler), Some(date)) => (scaler, date),
            _ => {
                return Err(CropixError::InsufficientHistory {
                    available: 0,
                    required: WINDOW_SIZE,
                })
            }
        };
        let width = scaler.width();

        let mut window: VecDeque<Vec<f64>> = table.rows()[table.len() - WINDOW_SIZE..]
            .iter()
            .map(|row| scaler.transform_row(row))
            .collect();

        let mut predicted = Vec::with_capacity(weeks as usize);
        for step in 0..weeks {
            let data: Vec<f32> = window.iter().flatten().map(|v| *v as f32).collect();
            let input = ModelInput::new(vec![1, WINDOW_SIZE, width], data)
                .map_err(|e| CropixError::model_fault(self.model.name(), e))?;

            let output = self
                .model
                .predict(&input)
                .map_err(|e| CropixError::model_fault(self.model.name(), e))?;

            if output.values.len() != width {
                return Err(CropixError::model_fault(
                    self.model.name(),
                    anyhow::anyhow!(
                        "Model returned {} values, expected {}",
                        output.values.len(),
                        width
                    ),
                ));
            }

            let next: Vec<f64> = output.values.iter().map(|v| *v as f64).collect();
            debug!(step = step + 1, "Forecast step completed");

            window.pop_front();
            window.push_back(next.clone());
            predicted.push(next);
        }

        let points = predicted
            .iter()
            .zip(1..)
            .map(|(row, week)| {
                let price = scaler.inverse_transform_row(row)[crop_index];
                (last_date + Duration::weeks(week), round2(price))
            })
            .collect();

        Ok(RollingForecast {
            crop: crop.to_string(),
            points,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::testing::{failing, StubModel};

    fn table(rows: usize) -> PriceTable {
        let mut csv = String::from("Date,Wheat,Gram\n");
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        for i in 0..rows {
            let date = start + Duration::weeks(i as i64);
            csv.push_str(&format!("{},{},{}\n", date, 2000 + i * 10, 5000 - i * 20));
        }
        PriceTable::from_reader(csv.as_bytes()).unwrap()
    }

    /// Repeats the newest row of the window
    fn persistence_model() -> StubModel<impl Fn(&ModelInput) -> anyhow::Result<Vec<f32>> + Send + Sync> {
        StubModel::new("persistence", |input: &ModelInput| {
            let width = input.shape[2];
            Ok(input.data[input.data.len() - width..].to_vec())
        })
    }

    #[test]
    fn test_unknown_crop_is_structured_error() {
        let model = persistence_model();
        let forecaster = RollingForecaster::new(&model, 52);
        let err = forecaster.forecast(&table(10), "Saffron", 3).unwrap_err();
        assert!(matches!(err, CropixError::UnknownCrop(ref c) if c == "Saffron"));
        assert!(err.is_reportable());
    }

    #[test]
    fn test_zero_weeks_is_empty() {
        let model = persistence_model();
        let forecaster = RollingForecaster::new(&model, 52);
        let forecast = forecaster.forecast(&table(10), "Wheat", 0).unwrap();
        assert!(forecast.points.is_empty());
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_persistence_forecast_repeats_last_price_weekly() {
        let model = persistence_model();
        let forecaster = RollingForecaster::new(&model, 52);
        let forecast = forecaster.forecast(&table(10), "Wheat", 3).unwrap();

        let last = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::weeks(9);
        assert_eq!(
            forecast.points,
            vec![
                (last + Duration::weeks(1), 2090.0),
                (last + Duration::weeks(2), 2090.0),
                (last + Duration::weeks(3), 2090.0),
            ]
        );
    }

    #[test]
    fn test_window_slides_predictions_back_in() {
        let model = StubModel::new("constant", |_: &ModelInput| Ok(vec![0.25, 0.75]));
        let forecaster = RollingForecaster::new(&model, 52);
        forecaster.forecast(&table(10), "Gram", 3).unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].shape, vec![1, WINDOW_SIZE, 2]);
        // Third call sees both earlier predictions as its newest rows
        let third = &seen[2].data;
        assert_eq!(&third[third.len() - 4..], &[0.25, 0.75, 0.25, 0.75]);
    }

    #[test]
    fn test_output_is_rounded_to_cents() {
        let model = StubModel::new("fraction", |_: &ModelInput| Ok(vec![0.333_333, 0.5]));
        let forecaster = RollingForecaster::new(&model, 52);
        let forecast = forecaster.forecast(&table(10), "Wheat", 1).unwrap();
        let price = forecast.points[0].1;
        assert_eq!(price, (price * 100.0).round() / 100.0);
    }

    #[test]
    fn test_horizon_is_bounded() {
        let model = persistence_model();
        let forecaster = RollingForecaster::new(&model, 4);
        let err = forecaster.forecast(&table(10), "Wheat", 5).unwrap_err();
        assert!(matches!(err, CropixError::HorizonExceeded { requested: 5, max: 4 }));
    }

    #[test]
    fn test_short_history_is_rejected() {
        let model = persistence_model();
        let forecaster = RollingForecaster::new(&model, 52);
        let err = forecaster.forecast(&table(5), "Wheat", 1).unwrap_err();
        assert!(matches!(err, CropixError::InsufficientHistory { available: 5, required: 8 }));
    }

    #[test]
    fn test_model_failure_is_a_fault() {
        let model = failing("market_lstm");
        let forecaster = RollingForecaster::new(&model, 52);
        let err = forecaster.forecast(&table(10), "Wheat", 1).unwrap_err();
        assert!(!err.is_reportable());
    }
}
