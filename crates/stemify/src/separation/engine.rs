//! ONNX Runtime inference engine
//!
//! Runs a Spleeter-style ONNX model on one window at a time. The model takes
//! a `[frames, channels]` waveform tensor and produces one tensor of the same
//! layout per stem, so input and outputs map directly onto interleaved
//! [`Waveform`]s.

use std::path::PathBuf;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use stemify_core::{EngineError, InferenceEngine, Waveform};

use super::config::ModelType;

/// Where the model lives and which tensors to use
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParameters {
    /// Path to the ONNX model
    pub model_path: PathBuf,
    /// Input tensor name
    pub input_tensor_name: String,
    /// Output tensor names, in stem order
    ///
    /// When empty, every model output is returned in model order.
    pub output_tensor_names: Vec<String>,
}

impl EngineParameters {
    /// Parameters for a known model stored at `model_path`
    pub fn for_model(model: ModelType, model_path: PathBuf) -> Self {
        Self {
            model_path,
            input_tensor_name: model.input_tensor_name().to_string(),
            output_tensor_names: model.output_tensor_names(),
        }
    }
}

/// Inference engine backed by ONNX Runtime via the `ort` crate
///
/// `init()` loads the session from disk and `shutdown()` drops it, so with
/// the per-window lifecycle the model is reloaded for every window.
pub struct OrtInferenceEngine {
    params: EngineParameters,
    session: Option<Session>,
    results: Vec<Waveform>,
}

impl OrtInferenceEngine {
    pub fn new(params: EngineParameters) -> Self {
        Self {
            params,
            session: None,
            results: Vec::new(),
        }
    }

    pub fn params(&self) -> &EngineParameters {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }
}

impl InferenceEngine for OrtInferenceEngine {
    fn init(&mut self) -> Result<(), EngineError> {
        log::debug!("Loading ONNX model from {:?}", self.params.model_path);

        let session = Session::builder()
            .map_err(|e| EngineError::Init(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::Init(e.to_string()))?
            .commit_from_file(&self.params.model_path)
            .map_err(|e| EngineError::Init(format!("Failed to load ONNX model: {}", e)))?;

        self.session = Some(session);
        Ok(())
    }

    fn execute(&mut self, window: &Waveform) -> Result<(), EngineError> {
        let session = self.session.as_mut().ok_or(EngineError::NotInitialized)?;

        let frames = window.frame_count();
        let channels = window.channel_count();

        // Interleaved samples are already row-major [frames, channels]
        let input = Array2::from_shape_vec((frames, channels), window.samples().to_vec())
            .map_err(|e| EngineError::Exec(format!("Invalid input shape: {}", e)))?;
        let input_tensor = Tensor::from_array(input).map_err(|e| {
            EngineError::Exec(format!("Failed to create input tensor: {}", e))
        })?;

        let outputs = session
            .run(ort::inputs![self.params.input_tensor_name.as_str() => input_tensor])
            .map_err(|e| EngineError::Exec(format!("Inference failed: {}", e)))?;

        let mut results = Vec::new();
        if self.params.output_tensor_names.is_empty() {
            for (_, value) in outputs.iter() {
                let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                    EngineError::Exec(format!("Failed to extract output: {}", e))
                })?;
                let shape: Vec<i64> = shape.iter().copied().collect();
                results.push(tensor_to_waveform(&shape, data));
            }
        } else {
            for name in &self.params.output_tensor_names {
                let (_, value) = outputs
                    .iter()
                    .find(|(output_name, _)| *output_name == name.as_str())
                    .ok_or_else(|| {
                        EngineError::Exec(format!("Model has no output tensor '{}'", name))
                    })?;
                let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                    EngineError::Exec(format!("Failed to extract output '{}': {}", name, e))
                })?;
                let shape: Vec<i64> = shape.iter().copied().collect();
                results.push(tensor_to_waveform(&shape, data));
            }
        }

        log::debug!(
            "Inference on {} frames produced {} outputs",
            frames,
            results.len()
        );

        drop(outputs);
        self.results = results;
        Ok(())
    }

    fn take_results(&mut self) -> Vec<Waveform> {
        std::mem::take(&mut self.results)
    }

    fn shutdown(&mut self) {
        self.session = None;
    }

    fn name(&self) -> &str {
        "ONNX Runtime"
    }
}

/// Interpret a `[frames, channels]` (optionally batched) tensor as a waveform
///
/// Any leading dimensions of size 1 are ignored; a rank-1 tensor is mono.
fn tensor_to_waveform(shape: &[i64], data: &[f32]) -> Waveform {
    let channels = match shape {
        [] | [_] => 1,
        [.., channels] => (*channels).max(1) as usize,
    };
    Waveform::from_interleaved(data.to_vec(), channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_model_params() -> EngineParameters {
        EngineParameters::for_model(
            ModelType::Spleeter2Stems,
            PathBuf::from("/nonexistent/spleeter_2stems.onnx"),
        )
    }

    #[test]
    fn test_parameters_for_model() {
        let params = missing_model_params();
        assert_eq!(params.input_tensor_name, "waveform");
        assert_eq!(
            params.output_tensor_names,
            vec!["waveform_vocals", "waveform_accompaniment"]
        );
    }

    #[test]
    fn test_execute_before_init() {
        let mut engine = OrtInferenceEngine::new(missing_model_params());
        let result = engine.execute(&Waveform::silence(16, 2));
        assert!(matches!(result, Err(EngineError::NotInitialized)));
        assert!(engine.take_results().is_empty());
    }

    #[test]
    fn test_init_with_missing_model_fails() {
        let mut engine = OrtInferenceEngine::new(missing_model_params());
        assert!(matches!(engine.init(), Err(EngineError::Init(_))));
        assert!(!engine.is_initialized());
        engine.shutdown();
    }

    #[test]
    fn test_tensor_layouts() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(tensor_to_waveform(&[2, 2], &data).frame_count(), 2);
        assert_eq!(tensor_to_waveform(&[1, 4, 1], &data).channel_count(), 1);
        assert_eq!(tensor_to_waveform(&[4], &data).frame_count(), 4);
    }
}
