//! Artifact store
//!
//! Loads the five trained models and their label arrays once at process
//! start from a fixed directory layout. Any missing or undecodable file
//! fails the whole load; nothing is reloaded afterwards.

mod columns;

pub use columns::{Cell, Column, ColumnSchema};

use crate::error::{CropixError, CropixResult};
use crate::forecast::WINDOW_SIZE;
use crate::predictor::{InferenceModel, OnnxModel, IMAGE_SIZE};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Artifact names used in logs, metrics, and errors
pub mod names {
    pub const CROP_YIELD: &str = "crop_yield";
    pub const SOIL_CROP: &str = "soil_crop";
    pub const DISEASE: &str = "disease_detection";
    pub const FERTILIZER: &str = "fertilizer";
    pub const MARKET: &str = "market_lstm";
}

/// File locations relative to the model directory
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    pub model_dir: PathBuf,
}

impl ArtifactLayout {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    pub fn crop_yield_model(&self) -> PathBuf {
        self.model_dir.join("crop_yield.onnx")
    }

    pub fn crop_yield_columns(&self) -> PathBuf {
        self.model_dir.join("crop_yield.columns.json")
    }

    pub fn soil_model(&self) -> PathBuf {
        self.model_dir.join("soil_crop.onnx")
    }

    pub fn soil_labels(&self) -> PathBuf {
        self.model_dir.join("soil_crop.labels.json")
    }

    pub fn disease_model(&self) -> PathBuf {
        self.model_dir.join("CNN").join("disease_detection.onnx")
    }

    pub fn disease_classes(&self) -> PathBuf {
        self.model_dir.join("CNN").join("disease_classes.json")
    }

    pub fn fertilizer_model(&self) -> PathBuf {
        self.model_dir.join("fertilizer.onnx")
    }

    pub fn fertilizer_columns(&self) -> PathBuf {
        self.model_dir.join("fertilizer.columns.json")
    }

    pub fn market_model(&self) -> PathBuf {
        self.model_dir.join("market_lstm.onnx")
    }
}

/// Identity of a loaded model file
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub name: String,
    pub path: PathBuf,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Pieces of an artifact store, for assembling one from any model source
pub struct ArtifactParts {
    pub crop_yield: Arc<dyn InferenceModel>,
    pub crop_yield_columns: ColumnSchema,
    pub soil: Arc<dyn InferenceModel>,
    pub soil_labels: Vec<String>,
    pub disease: Arc<dyn InferenceModel>,
    pub disease_classes: Vec<String>,
    pub fertilizer: Arc<dyn InferenceModel>,
    pub fertilizer_columns: ColumnSchema,
    pub market: Arc<dyn InferenceModel>,
}

/// Read-only handles to every trained model
pub struct ArtifactStore {
    parts: ArtifactParts,
    loaded: Vec<LoadedArtifact>,
}

impl ArtifactStore {
    /// Load every artifact from disk
    ///
    /// `price_columns` is the crop count of the historical price table,
    /// which fixes the market model's feature width.
    pub fn load(layout: &ArtifactLayout, price_columns: usize) -> CropixResult<Self> {
        let mut loaded = Vec::new();

        let crop_yield_columns = load_schema(names::CROP_YIELD, &layout.crop_yield_columns())?;
        let crop_yield = load_model(
            names::CROP_YIELD,
            &layout.crop_yield_model(),
            &[1, crop_yield_columns.width()],
            &mut loaded,
        )?;

        let soil_labels = load_labels(names::SOIL_CROP, &layout.soil_labels())?;
        let soil = load_model(names::SOIL_CROP, &layout.soil_model(), &[1, 7], &mut loaded)?;

        let disease_classes = load_labels(names::DISEASE, &layout.disease_classes())?;
        let disease = load_model(
            names::DISEASE,
            &layout.disease_model(),
            &[1, IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3],
            &mut loaded,
        )?;

        let fertilizer_columns = load_schema(names::FERTILIZER, &layout.fertilizer_columns())?;
        let fertilizer = load_model(
            names::FERTILIZER,
            &layout.fertilizer_model(),
            &[1, fertilizer_columns.width()],
            &mut loaded,
        )?;

        let market = load_model(
            names::MARKET,
            &layout.market_model(),
            &[1, WINDOW_SIZE, price_columns],
            &mut loaded,
        )?;

        Ok(Self {
            parts: ArtifactParts {
                crop_yield,
                crop_yield_columns,
                soil,
                soil_labels,
                disease,
                disease_classes,
                fertilizer,
                fertilizer_columns,
                market,
            },
            loaded,
        })
    }

    /// Assemble a store from already constructed models
    pub fn from_parts(parts: ArtifactParts) -> Self {
        Self {
            parts,
            loaded: Vec::new(),
        }
    }

    pub fn crop_yield(&self) -> &dyn InferenceModel {
        self.parts.crop_yield.as_ref()
    }

    pub fn crop_yield_columns(&self) -> &ColumnSchema {
        &self.parts.crop_yield_columns
    }

    pub fn soil(&self) -> &dyn InferenceModel {
        self.parts.soil.as_ref()
    }

    pub fn soil_labels(&self) -> &[String] {
        &self.parts.soil_labels
    }

    pub fn disease(&self) -> &dyn InferenceModel {
        self.parts.disease.as_ref()
    }

    pub fn disease_classes(&self) -> &[String] {
        &self.parts.disease_classes
    }

    pub fn fertilizer(&self) -> &dyn InferenceModel {
        self.parts.fertilizer.as_ref()
    }

    pub fn fertilizer_columns(&self) -> &ColumnSchema {
        &self.parts.fertilizer_columns
    }

    pub fn market(&self) -> &dyn InferenceModel {
        self.parts.market.as_ref()
    }

    /// Model files read from disk, empty for stores built from parts
    pub fn loaded(&self) -> &[LoadedArtifact] {
        &self.loaded
    }
}

fn artifact_error(name: &str, source: anyhow::Error) -> CropixError {
    CropixError::Artifact {
        name: name.to_string(),
        source,
    }
}

fn load_model(
    name: &str,
    path: &Path,
    input_shape: &[usize],
    loaded: &mut Vec<LoadedArtifact>,
) -> CropixResult<Arc<dyn InferenceModel>> {
    let model = OnnxModel::load(name, path, input_shape).map_err(|e| artifact_error(name, e))?;

    info!(
        artifact = %name,
        path = %path.display(),
        sha256 = %model.sha256(),
        size_bytes = model.size_bytes(),
        input_shape = ?input_shape,
        "Loaded model artifact"
    );

    loaded.push(LoadedArtifact {
        name: name.to_string(),
        path: path.to_path_buf(),
        sha256: model.sha256().to_string(),
        size_bytes: model.size_bytes(),
    });

    Ok(Arc::new(model))
}

fn load_schema(name: &str, path: &Path) -> CropixResult<ColumnSchema> {
    ColumnSchema::load(path).map_err(|e| artifact_error(name, e))
}

fn load_labels(name: &str, path: &Path) -> CropixResult<Vec<String>> {
    read_labels(path).map_err(|e| artifact_error(name, e))
}

/// Read a JSON array of class labels
pub fn read_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read labels {}", path.display()))?;
    let labels: Vec<String> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse labels {}", path.display()))?;
    if labels.is_empty() {
        anyhow::bail!("Label file {} is empty", path.display());
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = ArtifactLayout::new("Trained_models");
        assert_eq!(
            layout.disease_model(),
            PathBuf::from("Trained_models/CNN/disease_detection.onnx")
        );
        assert_eq!(
            layout.soil_labels(),
            PathBuf::from("Trained_models/soil_crop.labels.json")
        );
    }

    #[test]
    fn test_load_fails_fast_on_missing_directory() {
        let dir = TempDir::new().unwrap();
        let layout = ArtifactLayout::new(dir.path().join("absent"));
        let err = ArtifactStore::load(&layout, 4).err().unwrap();
        assert!(matches!(err, CropixError::Artifact { .. }));
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_corrupt_model_is_an_artifact_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("crop_yield.columns.json"),
            r#"{"columns":[{"name":"Area","kind":"numeric"}]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("crop_yield.onnx"), b"corrupt").unwrap();

        let layout = ArtifactLayout::new(dir.path());
        match ArtifactStore::load(&layout, 4) {
            Err(CropixError::Artifact { name, .. }) => assert_eq!(name, names::CROP_YIELD),
            _ => panic!("expected artifact error"),
        }
    }

    #[test]
    fn test_read_labels() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("labels.json");
        std::fs::write(&path, r#"["rice", "maize", "chickpea"]"#).unwrap();
        assert_eq!(read_labels(&path).unwrap(), vec!["rice", "maize", "chickpea"]);

        std::fs::write(&path, "[]").unwrap();
        assert!(read_labels(&path).is_err());
    }
}
