//! Scripted inference engines for exercising the cascade without models.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ndarray::{Array2, Array4, ArrayD};

use crate::detection::domain::inference_engine::{InferenceEngine, InferenceError, TensorMap};
use crate::shared::config::{InputLayout, NetworkNames};
use crate::shared::constants::{CELL_SIZE, PROPOSAL_STRIDE};

type Script = dyn Fn(&ArrayD<f32>) -> Result<TensorMap, InferenceError> + Send + Sync;

/// Engine answering every call through a closure over the single input
/// tensor. Counts how often it was called.
pub struct ScriptedEngine {
    script: Box<Script>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new(
        script: impl Fn(&ArrayD<f32>) -> Result<TensorMap, InferenceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl InferenceEngine for ScriptedEngine {
    fn evaluate(&self, inputs: TensorMap, _output_names: &[&str]) -> Result<TensorMap, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let input = inputs
            .values()
            .next()
            .ok_or_else(|| InferenceError::Engine("no input".into()))?;
        (self.script)(input)
    }
}

pub fn failing_engine() -> ScriptedEngine {
    ScriptedEngine::new(|_| Err(InferenceError::Engine("scripted failure".into())))
}

fn output_cells(side: usize) -> usize {
    let cell = CELL_SIZE as usize;
    if side < cell {
        0
    } else {
        (side - cell) / PROPOSAL_STRIDE as usize + 1
    }
}

/// Proposal network whose face score at output cell `(row, col)` comes from
/// `score`; all regression deltas are zero.
pub fn proposal_engine(
    names: &NetworkNames,
    layout: InputLayout,
    score: impl Fn(usize, usize) -> f32 + Send + Sync + 'static,
) -> ScriptedEngine {
    proposal_engine_with_deltas(names, layout, score, [0.0; 4])
}

/// Like [`proposal_engine`], with `deltas` at every output cell.
pub fn proposal_engine_with_deltas(
    names: &NetworkNames,
    layout: InputLayout,
    score: impl Fn(usize, usize) -> f32 + Send + Sync + 'static,
    deltas: [f32; 4],
) -> ScriptedEngine {
    let prob_name = names.probability.clone();
    let reg_name = names.regression.clone();
    ScriptedEngine::new(move |input| {
        let shape = input.shape();
        let (h, w) = match layout {
            InputLayout::Nhwc => (shape[1], shape[2]),
            InputLayout::Nwhc => (shape[2], shape[1]),
        };
        let (rows, cols) = (output_cells(h), output_cells(w));
        let mut prob = Array4::<f32>::zeros((1, rows, cols, 2));
        for r in 0..rows {
            for c in 0..cols {
                let p = score(r, c);
                prob[[0, r, c, 0]] = 1.0 - p;
                prob[[0, r, c, 1]] = p;
            }
        }
        let mut reg = Array4::from_shape_fn((1, rows, cols, 4), |(_, _, _, k)| deltas[k]);
        if layout == InputLayout::Nwhc {
            prob = prob.permuted_axes([0, 2, 1, 3]).as_standard_layout().to_owned();
            reg = reg.permuted_axes([0, 2, 1, 3]).as_standard_layout().to_owned();
        }
        let mut out = TensorMap::new();
        out.insert(prob_name.clone(), prob.into_dyn());
        out.insert(reg_name.clone(), reg.into_dyn());
        Ok(out)
    })
}

/// Refinement or output network scoring candidate `i` with `score(i)`.
///
/// Regression deltas come from `deltas`; a landmark head, when named,
/// places every keypoint at the crop centre.
pub fn batch_engine(
    names: &NetworkNames,
    score: impl Fn(usize) -> f32 + Send + Sync + 'static,
    deltas: [f32; 4],
) -> ScriptedEngine {
    let names = names.clone();
    ScriptedEngine::new(move |input| {
        let n = input.shape()[0];
        let prob = Array2::from_shape_fn((n, 2), |(i, c)| {
            let p = score(i);
            if c == 1 {
                p
            } else {
                1.0 - p
            }
        });
        let reg = Array2::from_shape_fn((n, 4), |(_, k)| deltas[k]);
        let mut out = TensorMap::new();
        out.insert(names.probability.clone(), prob.into_dyn());
        out.insert(names.regression.clone(), reg.into_dyn());
        if let Some(landmarks) = &names.landmarks {
            out.insert(landmarks.clone(), Array2::from_elem((n, 10), 0.5f32).into_dyn());
        }
        Ok(out)
    })
}
