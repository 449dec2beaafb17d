//! Fertilizer recommendation

use super::{InferenceModel, ModelInput};
use crate::artifacts::{Cell, ColumnSchema};
use crate::error::{CropixError, CropixResult};
use crate::models::{FertilizerRequest, FertilizerResponse};
use std::collections::HashMap;

/// Predict N, P, K amounts to add for a crop
pub fn recommend_fertilizer(
    model: &dyn InferenceModel,
    columns: &ColumnSchema,
    request: &FertilizerRequest,
) -> CropixResult<FertilizerResponse> {
    request.validate()?;

    let row = HashMap::from([
        ("Crop", Cell::from(request.Crop.as_str())),
        ("Current_N", Cell::from(request.Current_N)),
        ("Current_P", Cell::from(request.Current_P)),
        ("Current_K", Cell::from(request.Current_K)),
    ]);
    let features = columns.encode(&row).map_err(CropixError::InvalidInput)?;

    let output = model
        .predict(&ModelInput::row(features))
        .map_err(|e| CropixError::model_fault(model.name(), e))?;

    match output.values.as_slice() {
        [n, p, k, ..] => Ok(FertilizerResponse {
            recommended_N: *n as f64,
            recommended_P: *p as f64,
            recommended_K: *k as f64,
        }),
        values => Err(CropixError::model_fault(
            model.name(),
            anyhow::anyhow!("Model returned {} values, expected 3", values.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::testing::constant;

    fn columns() -> ColumnSchema {
        serde_json::from_str(
            r#"{"columns": [
                {"name": "Crop", "kind": "categorical", "categories": ["Maize", "Rice", "Wheat"]},
                {"name": "Current_N", "kind": "numeric"},
                {"name": "Current_P", "kind": "numeric"},
                {"name": "Current_K", "kind": "numeric"}
            ]}"#,
        )
        .unwrap()
    }

    fn rice() -> FertilizerRequest {
        FertilizerRequest {
            Crop: "Rice".to_string(),
            Current_N: 40.0,
            Current_P: 20.0,
            Current_K: 15.0,
        }
    }

    #[test]
    fn test_three_named_outputs() {
        let model = constant("fertilizer", vec![80.0, 40.0, 25.0]);
        let response = recommend_fertilizer(&model, &columns(), &rice()).unwrap();
        assert_eq!(response.recommended_N, 80.0);
        assert_eq!(response.recommended_P, 40.0);
        assert_eq!(response.recommended_K, 25.0);

        let json = serde_json::to_value(&response).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
    }

    #[test]
    fn test_encoded_row() {
        let model = constant("fertilizer", vec![1.0, 2.0, 3.0]);
        recommend_fertilizer(&model, &columns(), &rice()).unwrap();
        assert_eq!(
            model.seen.lock().unwrap()[0].data,
            vec![0.0, 1.0, 0.0, 40.0, 20.0, 15.0]
        );
    }

    #[test]
    fn test_short_output_is_a_fault() {
        let model = constant("fertilizer", vec![1.0, 2.0]);
        let err = recommend_fertilizer(&model, &columns(), &rice()).unwrap_err();
        assert!(!err.is_reportable());
    }
}
