//! Feeding a network through an [`InferenceEngine`] and validating what
//! comes back.

use ndarray::{s, Array2, Array3, Array4, ArrayD, Ix2, Ix4};

use crate::detection::cascade::image_resampler::to_layout;
use crate::detection::domain::inference_engine::{
    take_output, InferenceEngine, InferenceError, TensorMap,
};
use crate::shared::config::{InputLayout, NetworkNames};

/// Column of the probability tensors holding the face class.
const FACE_CLASS: usize = 1;

/// One network of the cascade: an engine plus the tensor names and input
/// layout it was exported with.
pub struct Network {
    engine: Box<dyn InferenceEngine>,
    names: NetworkNames,
    layout: InputLayout,
}

impl Network {
    pub fn new(engine: Box<dyn InferenceEngine>, names: NetworkNames, layout: InputLayout) -> Self {
        Self {
            engine,
            names,
            layout,
        }
    }

    pub fn names(&self) -> &NetworkNames {
        &self.names
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }

    pub fn run(&self, input: Array4<f32>) -> Result<TensorMap, InferenceError> {
        run_network(self.engine.as_ref(), &self.names, input, self.layout)
    }
}

/// Runs one network on a `(batch, height, width, 3)` tensor and returns the
/// requested outputs.
pub fn run_network(
    engine: &dyn InferenceEngine,
    names: &NetworkNames,
    input: Array4<f32>,
    layout: InputLayout,
) -> Result<TensorMap, InferenceError> {
    let mut inputs = TensorMap::new();
    inputs.insert(names.input.clone(), to_layout(input, layout).into_dyn());

    let mut wanted = vec![names.regression.as_str()];
    if let Some(landmarks) = &names.landmarks {
        wanted.push(landmarks.as_str());
    }
    wanted.push(names.probability.as_str());

    engine.evaluate(inputs, &wanted)
}

/// Face probability and corner deltas for one pyramid level, in
/// `(rows, cols)` orientation.
#[derive(Debug, Clone)]
pub struct ProposalMaps {
    pub scores: Array2<f32>,
    pub regression: Array3<f32>,
}

/// Reads the proposal network's dense outputs, undoing the input layout so
/// the maps are height-major.
pub fn proposal_maps(
    outputs: &mut TensorMap,
    names: &NetworkNames,
    layout: InputLayout,
) -> Result<ProposalMaps, InferenceError> {
    let prob = dense_map(take_output(outputs, &names.probability)?, &names.probability, 2)?;
    let reg = dense_map(take_output(outputs, &names.regression)?, &names.regression, 4)?;
    if prob.shape()[1..3] != reg.shape()[1..3] {
        return Err(InferenceError::Shape {
            name: names.regression.clone(),
            actual: reg.shape().to_vec(),
            expected: format!("spatial size {:?}", &prob.shape()[1..3]),
        });
    }

    let (prob, reg) = match layout {
        InputLayout::Nhwc => (prob, reg),
        InputLayout::Nwhc => (
            prob.permuted_axes([0, 2, 1, 3]),
            reg.permuted_axes([0, 2, 1, 3]),
        ),
    };
    Ok(ProposalMaps {
        scores: prob.slice(s![0, .., .., FACE_CLASS]).to_owned(),
        regression: reg.slice(s![0, .., .., ..]).to_owned(),
    })
}

/// Takes a `(batch, width)` output, checking both dimensions.
pub fn per_candidate(
    outputs: &mut TensorMap,
    name: &str,
    batch: usize,
    width: usize,
) -> Result<Array2<f32>, InferenceError> {
    let tensor = take_output(outputs, name)?;
    let actual = tensor.shape().to_vec();
    let shape_error = || InferenceError::Shape {
        name: name.to_string(),
        actual: actual.clone(),
        expected: format!("[{batch}, {width}]"),
    };
    let rows = tensor.into_dimensionality::<Ix2>().map_err(|_| shape_error())?;
    if rows.dim() != (batch, width) {
        return Err(shape_error());
    }
    Ok(rows)
}

/// Face-class column of a `(batch, 2)` probability output.
pub fn face_scores(rows: &Array2<f32>) -> Vec<f64> {
    rows.column(FACE_CLASS).iter().map(|&p| p as f64).collect()
}

fn dense_map(tensor: ArrayD<f32>, name: &str, channels: usize) -> Result<Array4<f32>, InferenceError> {
    let actual = tensor.shape().to_vec();
    let shape_error = || InferenceError::Shape {
        name: name.to_string(),
        actual: actual.clone(),
        expected: format!("[1, _, _, {channels}]"),
    };
    let map = tensor.into_dimensionality::<Ix4>().map_err(|_| shape_error())?;
    if map.shape()[0] != 1 || map.shape()[3] != channels {
        return Err(shape_error());
    }
    Ok(map)
}
