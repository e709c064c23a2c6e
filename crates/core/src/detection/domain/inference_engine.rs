use std::collections::HashMap;

use ndarray::ArrayD;
use thiserror::Error;

/// Named tensors exchanged with an inference engine.
pub type TensorMap = HashMap<String, ArrayD<f32>>;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("inference engine failed: {0}")]
    Engine(String),
    #[error("network produced no output named {0:?}")]
    MissingOutput(String),
    #[error("output {name:?} has shape {actual:?}, expected {expected}")]
    Shape {
        name: String,
        actual: Vec<usize>,
        expected: String,
    },
}

/// Domain interface for a neural network forward pass.
///
/// Given named input tensors, returns the requested named outputs. The
/// implementation decides how calls are serialised; the cascade only needs
/// `&self` so a detector can be shared between threads.
pub trait InferenceEngine: Send + Sync {
    fn evaluate(&self, inputs: TensorMap, output_names: &[&str])
        -> Result<TensorMap, InferenceError>;
}

/// Removes `name` from `outputs`, failing if the engine did not return it.
pub fn take_output(outputs: &mut TensorMap, name: &str) -> Result<ArrayD<f32>, InferenceError> {
    outputs
        .remove(name)
        .ok_or_else(|| InferenceError::MissingOutput(name.to_string()))
}
