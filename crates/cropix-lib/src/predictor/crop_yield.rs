//! Crop yield regression

use super::{InferenceModel, ModelInput};
use crate::artifacts::{Cell, ColumnSchema};
use crate::error::{CropixError, CropixResult};
use crate::models::{YieldRequest, YieldResponse};
use std::collections::HashMap;

fn yield_row(request: &YieldRequest) -> HashMap<&'static str, Cell> {
    HashMap::from([
        ("Crop", Cell::from(request.Crop.as_str())),
        ("Season", Cell::from(request.Season.as_str())),
        ("Area", Cell::from(request.Area)),
        ("Fertilizer", Cell::from(request.Fertilizer)),
        ("Crop_Year", Cell::from(request.Crop_Year)),
        ("Pesticide", Cell::from(request.Pesticide)),
        ("Annual_Rainfall", Cell::from(request.Annual_Rainfall)),
    ])
}

/// Predict yield; the model output is returned unclamped
pub fn predict_yield(
    model: &dyn InferenceModel,
    columns: &ColumnSchema,
    request: &YieldRequest,
) -> CropixResult<YieldResponse> {
    request.validate()?;

    let features = columns
        .encode(&yield_row(request))
        .map_err(CropixError::InvalidInput)?;

    let output = model
        .predict(&ModelInput::row(features))
        .map_err(|e| CropixError::model_fault(model.name(), e))?;

    let predicted_yield = output.values.first().copied().ok_or_else(|| {
        CropixError::model_fault(model.name(), anyhow::anyhow!("Model returned no values"))
    })?;

    Ok(YieldResponse {
        predicted_yield: predicted_yield as f64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::testing::{constant, StubModel};

    fn columns() -> ColumnSchema {
        serde_json::from_str(
            r#"{"columns": [
                {"name": "Crop", "kind": "categorical", "categories": ["Rice", "Wheat"]},
                {"name": "Crop_Year", "kind": "numeric"},
                {"name": "Season", "kind": "categorical", "categories": ["Kharif", "Rabi"]},
                {"name": "Area", "kind": "numeric"},
                {"name": "Annual_Rainfall", "kind": "numeric"},
                {"name": "Fertilizer", "kind": "numeric"},
                {"name": "Pesticide", "kind": "numeric"}
            ]}"#,
        )
        .unwrap()
    }

    fn request() -> YieldRequest {
        YieldRequest {
            Crop: "Wheat".to_string(),
            Season: "Rabi".to_string(),
            Area: 100.0,
            Fertilizer: 2500.0,
            Crop_Year: 2020,
            Pesticide: 30.0,
            Annual_Rainfall: 900.0,
        }
    }

    #[test]
    fn test_features_follow_training_column_order() {
        let model = constant("crop_yield", vec![3.2]);
        predict_yield(&model, &columns(), &request()).unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(
            seen[0].data,
            vec![0.0, 1.0, 2020.0, 0.0, 1.0, 100.0, 900.0, 2500.0, 30.0]
        );
        assert_eq!(seen[0].shape, vec![1, 9]);
    }

    #[test]
    fn test_prediction_is_not_clamped() {
        let model = constant("crop_yield", vec![-4.5]);
        let response = predict_yield(&model, &columns(), &request()).unwrap();
        assert_eq!(response.predicted_yield, -4.5);
    }

    #[test]
    fn test_repeated_input_is_deterministic() {
        let model = StubModel::new("crop_yield", |input: &ModelInput| {
            Ok(vec![input.data.iter().sum::<f32>() / 1000.0])
        });
        let first = predict_yield(&model, &columns(), &request()).unwrap();
        let second = predict_yield(&model, &columns(), &request()).unwrap();
        assert!(first.predicted_yield.is_finite());
        assert_eq!(first.predicted_yield, second.predicted_yield);
    }

    #[test]
    fn test_empty_output_is_a_fault() {
        let model = constant("crop_yield", vec![]);
        let err = predict_yield(&model, &columns(), &request()).unwrap_err();
        assert!(!err.is_reportable());
    }
}
