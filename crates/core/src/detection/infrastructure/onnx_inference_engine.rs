//! [`InferenceEngine`] backed by an ONNX Runtime session via `ort`.

use std::path::Path;
use std::sync::Mutex;

use ort::session::{Session, SessionInputValue};

use crate::detection::cascade::cascade_detector::CascadeEngines;
use crate::detection::domain::inference_engine::{InferenceEngine, InferenceError, TensorMap};
use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::detection::infrastructure::model_resolver::CascadeModelPaths;

/// One ONNX graph. `Session::run` needs `&mut`, so calls are serialised.
pub struct OnnxInferenceEngine {
    session: Mutex<Session>,
}

impl OnnxInferenceEngine {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded ONNX model {}", model_path.display());
        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

impl InferenceEngine for OnnxInferenceEngine {
    fn evaluate(
        &self,
        inputs: TensorMap,
        output_names: &[&str],
    ) -> Result<TensorMap, InferenceError> {
        let mut feed: Vec<(String, SessionInputValue<'_>)> = Vec::with_capacity(inputs.len());
        for (name, array) in inputs {
            let tensor = ort::value::Tensor::from_array(array).map_err(engine_error)?;
            feed.push((name, tensor.into()));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|e| InferenceError::Engine(format!("Lock poisoned: {e}")))?;
        let outputs = session.run(feed).map_err(engine_error)?;

        let mut result = TensorMap::new();
        for &name in output_names {
            let value = outputs
                .get(name)
                .ok_or_else(|| InferenceError::MissingOutput(name.to_string()))?;
            let array = value.try_extract_array::<f32>().map_err(engine_error)?;
            result.insert(name.to_string(), array.to_owned());
        }
        Ok(result)
    }
}

/// Opens one session per network.
pub fn load_cascade_engines(
    paths: &CascadeModelPaths,
) -> Result<CascadeEngines, Box<dyn std::error::Error>> {
    Ok(CascadeEngines {
        proposal: Box::new(OnnxInferenceEngine::new(&paths.proposal)?),
        refinement: Box::new(OnnxInferenceEngine::new(&paths.refinement)?),
        output: Box::new(OnnxInferenceEngine::new(&paths.output)?),
    })
}

fn engine_error(e: ort::Error) -> InferenceError {
    InferenceError::Engine(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_file_is_an_error() {
        assert!(OnnxInferenceEngine::new(Path::new("/nonexistent/pnet.onnx")).is_err());
    }

    #[test]
    fn test_load_cascade_reports_first_missing_model() {
        let paths = CascadeModelPaths {
            proposal: "/nonexistent/pnet.onnx".into(),
            refinement: "/nonexistent/rnet.onnx".into(),
            output: "/nonexistent/onet.onnx".into(),
        };
        assert!(load_cascade_engines(&paths).is_err());
    }

    #[test]
    fn test_garbage_model_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pnet.onnx");
        std::fs::write(&path, b"not an onnx graph").unwrap();
        assert!(OnnxInferenceEngine::new(&path).is_err());
    }
}
