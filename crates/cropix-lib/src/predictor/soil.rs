//! Soil-based crop recommendation

use super::{InferenceModel, ModelInput, ModelOutput};
use crate::error::{CropixError, CropixResult};
use crate::models::{SoilRequest, SoilResponse};

/// Resolve the class index from classifier output
///
/// A single value is an integer label; several values are class scores.
fn class_index(output: &ModelOutput) -> Option<usize> {
    match output.values.as_slice() {
        [] => None,
        [label] if *label >= 0.0 && label.fract() == 0.0 => Some(*label as usize),
        [_] => None,
        _ => output.argmax().map(|(i, _)| i),
    }
}

pub fn recommend_soil_crop(
    model: &dyn InferenceModel,
    labels: &[String],
    request: &SoilRequest,
) -> CropixResult<SoilResponse> {
    request.validate()?;

    let output = model
        .predict(&ModelInput::row(request.features().to_vec()))
        .map_err(|e| CropixError::model_fault(model.name(), e))?;

    let recommended_crop = class_index(&output)
        .and_then(|i| labels.get(i))
        .cloned()
        .ok_or_else(|| {
            CropixError::model_fault(
                model.name(),
                anyhow::anyhow!(
                    "Output {:?} does not map onto {} labels",
                    output.values,
                    labels.len()
                ),
            )
        })?;

    Ok(SoilResponse { recommended_crop })
}
