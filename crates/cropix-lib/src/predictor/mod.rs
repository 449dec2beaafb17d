//! Inference adapters
//!
//! Each adapter marshals a validated request into the tensor its model
//! expects, runs the model, and reshapes the output into a response record.

mod crop_yield;
mod disease;
mod fertilizer;
mod inference;
mod market;
mod soil;

pub use crop_yield::predict_yield;
pub use disease::{decode_image_payload, DiseaseClassifier, IMAGE_SIZE};
pub use fertilizer::recommend_fertilizer;
pub use inference::OnnxModel;
pub use market::forecast_market_prices;
pub use soil::recommend_soil_crop;

use anyhow::Result;

/// Dense f32 tensor handed to a model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl ModelInput {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            anyhow::bail!(
                "Input shape {:?} needs {} values, got {}",
                shape,
                expected,
                data.len()
            );
        }
        Ok(Self { shape, data })
    }

    /// Single-row tabular input
    pub fn row(values: Vec<f32>) -> Self {
        Self {
            shape: vec![1, values.len()],
            data: values,
        }
    }
}

/// First model output, flattened and cast to f32
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl ModelOutput {
    pub fn new(values: Vec<f32>) -> Self {
        Self {
            shape: vec![1, values.len()],
            values,
        }
    }

    /// Index and value of the largest score
    pub fn argmax(&self) -> Option<(usize, f32)> {
        self.values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| !v.is_nan())
            .fold(None, |best, (i, v)| match best {
                Some((_, b)) if b >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Trait for loaded model implementations
pub trait InferenceModel: Send + Sync {
    /// Run one forward pass
    fn predict(&self, input: &ModelInput) -> Result<ModelOutput>;

    /// Artifact name used in logs and errors
    fn name(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub models for adapter tests

    use super::*;
    use std::sync::Mutex;

    /// Model that answers through a closure and records every input
    pub struct StubModel<F> {
        name: String,
        respond: F,
        pub seen: Mutex<Vec<ModelInput>>,
    }

    impl<F> StubModel<F>
    where
        F: Fn(&ModelInput) -> Result<Vec<f32>> + Send + Sync,
    {
        pub fn new(name: &str, respond: F) -> Self {
            Self {
                name: name.to_string(),
                respond,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl<F> InferenceModel for StubModel<F>
    where
        F: Fn(&ModelInput) -> Result<Vec<f32>> + Send + Sync,
    {
        fn predict(&self, input: &ModelInput) -> Result<ModelOutput> {
            self.seen.lock().unwrap().push(input.clone());
            Ok(ModelOutput::new((self.respond)(input)?))
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    pub fn constant(name: &str, values: Vec<f32>) -> StubModel<impl Fn(&ModelInput) -> Result<Vec<f32>> + Send + Sync> {
        StubModel::new(name, move |_| Ok(values.clone()))
    }

    pub fn failing(name: &str) -> StubModel<impl Fn(&ModelInput) -> Result<Vec<f32>> + Send + Sync> {
        StubModel::new(name, |_| anyhow::bail!("stub model failure"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_largest_score() {
        let output = ModelOutput::new(vec![0.1, 0.7, 0.2]);
        assert_eq!(output.argmax(), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_first_wins_on_ties() {
        let output = ModelOutput::new(vec![0.5, 0.5]);
        assert_eq!(output.argmax(), Some((0, 0.5)));
    }

    #[test]
    fn test_argmax_empty() {
        assert_eq!(ModelOutput::new(vec![]).argmax(), None);
    }

    #[test]
    fn test_input_shape_must_match_data() {
        assert!(ModelInput::new(vec![1, 3], vec![1.0, 2.0]).is_err());
        assert!(ModelInput::new(vec![1, 2], vec![1.0, 2.0]).is_ok());
    }
}
