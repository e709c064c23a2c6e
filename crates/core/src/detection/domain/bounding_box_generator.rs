use ndarray::{ArrayView2, ArrayView3};

use crate::detection::domain::candidate_box::CandidateBox;
use crate::shared::constants::{CELL_SIZE, PROPOSAL_STRIDE};

/// Turns one pyramid level of proposal-network output into candidates.
///
/// `scores` is the face probability per output cell, `(rows, cols)`.
/// `regression` holds the four corner deltas per cell, `(rows, cols, 4)`.
/// Cells scoring strictly above `threshold` become boxes in original-image
/// coordinates, emitted in row-major order.
pub fn generate_bounding_box(
    scores: ArrayView2<f32>,
    regression: ArrayView3<f32>,
    scale: f64,
    threshold: f64,
) -> Vec<CandidateBox> {
    let stride = PROPOSAL_STRIDE as f64;
    let extent = (CELL_SIZE - 1) as f64;

    let mut boxes = Vec::new();
    for ((row, col), &score) in scores.indexed_iter() {
        let score = score as f64;
        if score <= threshold {
            continue;
        }
        let left = stride * col as f64;
        let top = stride * row as f64;
        let deltas = [
            regression[[row, col, 0]] as f64,
            regression[[row, col, 1]] as f64,
            regression[[row, col, 2]] as f64,
            regression[[row, col, 3]] as f64,
        ];
        boxes.push(
            CandidateBox::new(
                (left / scale).round(),
                (top / scale).round(),
                ((left + extent) / scale).round(),
                ((top + extent) / scale).round(),
                score,
            )
            .with_deltas(deltas),
        );
    }
    boxes
}
