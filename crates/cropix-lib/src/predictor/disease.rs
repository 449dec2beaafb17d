//! Plant disease classification from an uploaded image
//!
//! The decoded upload is written to a uniquely named temporary PNG and read
//! back before preprocessing, so every input format goes through the same
//! PNG round trip. The temporary file is removed on every return path.

use super::{InferenceModel, ModelInput};
use crate::error::DiseaseError;
use crate::models::DiseaseResponse;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Side length of the square classifier input
pub const IMAGE_SIZE: u32 = 256;

/// Decode a base64 payload, tolerating a `data:<mime>;base64,` prefix and
/// embedded whitespace
pub fn decode_image_payload(payload: &str) -> Result<Vec<u8>, DiseaseError> {
    let body = match payload.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => payload,
    };
    let compact: String = body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(DiseaseError::decode("Image payload is empty"));
    }
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DiseaseError::decode(format!("Invalid base64 image data: {}", e)))
}

/// Classifier plus its parallel class label array
pub struct DiseaseClassifier<'a> {
    model: &'a dyn InferenceModel,
    classes: &'a [String],
    temp_dir: PathBuf,
}

impl<'a> DiseaseClassifier<'a> {
    pub fn new(model: &'a dyn InferenceModel, classes: &'a [String], temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            model,
            classes,
            temp_dir: temp_dir.into(),
        }
    }

    /// Full pipeline from a base64 payload
    pub fn detect(&self, image_base64: &str) -> Result<DiseaseResponse, DiseaseError> {
        let bytes = decode_image_payload(image_base64)?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| DiseaseError::image_format(format!("Unsupported or corrupt image: {}", e)))?;

        let reloaded = self.round_trip(&image)?;
        self.classify(&reloaded)
    }

    /// Classify an image file from disk
    pub fn detect_file(&self, path: &Path) -> Result<DiseaseResponse, DiseaseError> {
        let image = image::open(path).map_err(|e| {
            DiseaseError::image_format(format!("Could not read image {}: {}", path.display(), e))
        })?;
        self.classify(&image)
    }

    fn round_trip(&self, image: &DynamicImage) -> Result<DynamicImage, DiseaseError> {
        let mut temp = tempfile::Builder::new()
            .prefix("temp_image_")
            .suffix(".png")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| DiseaseError::model_fault(format!("Could not create temporary image: {}", e)))?;

        debug!(path = %temp.path().display(), "Persisting upload");

        image
            .write_to(temp.as_file_mut(), ImageFormat::Png)
            .map_err(|e| DiseaseError::model_fault(format!("Could not write temporary image: {}", e)))?;

        let reloaded = image::open(temp.path())
            .map_err(|e| DiseaseError::image_format(format!("Could not reload image: {}", e)))?;

        temp.close()
            .map_err(|e| DiseaseError::model_fault(format!("Could not remove temporary image: {}", e)))?;

        Ok(reloaded)
    }

    fn classify(&self, image: &DynamicImage) -> Result<DiseaseResponse, DiseaseError> {
        let input = preprocess(image).map_err(|e| DiseaseError::model_fault(e.to_string()))?;

        let output = self
            .model
            .predict(&input)
            .map_err(|e| DiseaseError::model_fault(format!("{} failed: {}", self.model.name(), e)))?;

        let (index, confidence) = output
            .argmax()
            .ok_or_else(|| DiseaseError::model_fault("Classifier returned no scores"))?;

        let predicted_disease = self.classes.get(index).cloned().ok_or_else(|| {
            DiseaseError::model_fault(format!(
                "Class index {} outside {} known classes",
                index,
                self.classes.len()
            ))
        })?;

        Ok(DiseaseResponse {
            predicted_disease,
            confidence,
        })
    }
}

/// Resize to the classifier's square RGB input and scale pixels to [0, 1]
fn preprocess(image: &DynamicImage) -> anyhow::Result<ModelInput> {
    let rgb = image
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::Nearest)
        .to_rgb8();
    let data: Vec<f32> = rgb.as_raw().iter().map(|p| *p as f32 / 255.0).collect();
    ModelInput::new(vec![1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3], data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiseaseErrorKind;
    use crate::predictor::testing::{constant, failing};
    use image::{Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn classes() -> Vec<String> {
        ["Tomato___Early_blight", "Tomato___healthy", "Potato___Late_blight"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn png_base64(width: u32, height: u32) -> String {
        let image = RgbImage::from_pixel(width, height, Rgb([255, 0, 51]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        STANDARD.encode(bytes)
    }

    fn dir_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[test]
    fn test_detects_argmax_class_with_confidence() {
        let dir = TempDir::new().unwrap();
        let model = constant("disease_detection", vec![0.1, 0.85, 0.05]);
        let classes = classes();
        let classifier = DiseaseClassifier::new(&model, &classes, dir.path());

        let response = classifier.detect(&png_base64(40, 30)).unwrap();
        assert_eq!(response.predicted_disease, "Tomato___healthy");
        assert!((response.confidence - 0.85).abs() < 1e-6);
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn test_input_is_normalized_square_rgb() {
        let dir = TempDir::new().unwrap();
        let model = constant("disease_detection", vec![1.0, 0.0, 0.0]);
        let classes = classes();
        let classifier = DiseaseClassifier::new(&model, &classes, dir.path());

        classifier.detect(&png_base64(10, 20)).unwrap();
        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].shape, vec![1, 256, 256, 3]);
        assert_eq!(&seen[0].data[..3], &[1.0, 0.0, 0.2]);
        assert!(seen[0].data.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_bad_base64_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let model = constant("disease_detection", vec![1.0]);
        let classes = classes();
        let classifier = DiseaseClassifier::new(&model, &classes, dir.path());

        let err = classifier.detect("%%% not base64 %%%").unwrap_err();
        assert_eq!(err.kind, DiseaseErrorKind::DecodeError);
        assert!(dir_is_empty(&dir));
        assert!(model.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_non_image_bytes_are_format_errors() {
        let dir = TempDir::new().unwrap();
        let model = constant("disease_detection", vec![1.0]);
        let classes = classes();
        let classifier = DiseaseClassifier::new(&model, &classes, dir.path());

        let err = classifier.detect(&STANDARD.encode(b"plain text, not pixels")).unwrap_err();
        assert_eq!(err.kind, DiseaseErrorKind::ImageFormatError);
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn test_model_failure_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let model = failing("disease_detection");
        let classes = classes();
        let classifier = DiseaseClassifier::new(&model, &classes, dir.path());

        let err = classifier.detect(&png_base64(8, 8)).unwrap_err();
        assert_eq!(err.kind, DiseaseErrorKind::ModelFault);
        assert!(dir_is_empty(&dir));
    }

    #[test]
    fn test_data_url_prefix_is_accepted() {
        let payload = format!("data:image/png;base64,{}", png_base64(4, 4));
        let bytes = decode_image_payload(&payload).unwrap();
        assert!(image::load_from_memory(&bytes).is_ok());
    }

    #[test]
    fn test_empty_payload_is_decode_error() {
        let err = decode_image_payload("  \n").unwrap_err();
        assert_eq!(err.kind, DiseaseErrorKind::DecodeError);
    }
}
