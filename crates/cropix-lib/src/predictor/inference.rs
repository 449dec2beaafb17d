//! ONNX inference using tract
//!
//! Every trained artifact is exported to ONNX and executed through a
//! tract plan optimized for its fixed input shape.

use super::{InferenceModel, ModelInput, ModelOutput};
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::time::Instant;
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Inference latency above which a warning is logged
const SLOW_INFERENCE_MS: u128 = 250;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX model loaded with tract
pub struct OnnxModel {
    name: String,
    plan: TractModel,
    input_shape: Vec<usize>,
    sha256: String,
    size_bytes: usize,
}

impl OnnxModel {
    /// Load and optimize an ONNX model file for a fixed input shape
    pub fn load(name: &str, path: &Path, input_shape: &[usize]) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        Self::from_bytes(name, &bytes, input_shape)
    }

    /// Build a model from raw ONNX bytes
    pub fn from_bytes(name: &str, bytes: &[u8], input_shape: &[usize]) -> Result<Self> {
        let plan = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact(input_shape.to_vec()).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;

        Ok(Self {
            name: name.to_string(),
            plan,
            input_shape: input_shape.to_vec(),
            sha256: hex::encode(Sha256::digest(bytes)),
            size_bytes: bytes.len(),
        })
    }

    /// Hex SHA-256 of the model file
    pub fn sha256(&self) -> &str {
        &self.sha256
    }

    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    fn to_tensor(&self, input: &ModelInput) -> Result<Tensor> {
        if input.shape != self.input_shape {
            anyhow::bail!(
                "Model {} expects input shape {:?}, got {:?}",
                self.name,
                self.input_shape,
                input.shape
            );
        }
        Tensor::from_shape(&input.shape, &input.data).context("Failed to build input tensor")
    }
}

impl InferenceModel for OnnxModel {
    fn predict(&self, input: &ModelInput) -> Result<ModelOutput> {
        let start = Instant::now();
        let tensor = self.to_tensor(input)?;

        let result = self.plan.run(tvec!(tensor.into()))?;
        let output = result.first().context("No output from model")?;

        // Classifiers may emit integer labels; everything is handed out as f32
        let cast = output.cast_to::<f32>()?;
        let values = cast.as_slice::<f32>()?.to_vec();
        let shape = output.shape().to_vec();

        let elapsed = start.elapsed();
        if elapsed.as_millis() > SLOW_INFERENCE_MS {
            warn!(
                model = %self.name,
                elapsed_ms = elapsed.as_millis(),
                "Inference exceeded {}ms",
                SLOW_INFERENCE_MS
            );
        } else {
            debug!(model = %self.name, elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(ModelOutput { shape, values })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
