//! Greedy non-maximum suppression over candidate boxes.
//!
//! Areas and intersections use the inclusive pixel convention, so a box
//! from `x1` to `x2` covers `x2 - x1 + 1` columns.

use crate::detection::domain::candidate_box::CandidateBox;

/// How the overlap between two boxes is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmsMode {
    /// Intersection over union.
    Union,
    /// Intersection over the smaller of the two areas.
    Min,
}

/// Overlap of `a` and `b` under `mode`.
pub fn overlap(a: &CandidateBox, b: &CandidateBox, mode: NmsMode) -> f64 {
    let w = (a.x2.min(b.x2) - a.x1.max(b.x1) + 1.0).max(0.0);
    let h = (a.y2.min(b.y2) - a.y1.max(b.y1) + 1.0).max(0.0);
    let inter = w * h;
    if inter == 0.0 {
        return 0.0;
    }
    match mode {
        NmsMode::Union => inter / (a.area() + b.area() - inter),
        NmsMode::Min => inter / a.area().min(b.area()),
    }
}

/// Returns the indices of the boxes that survive suppression, highest score
/// first.
///
/// Scores are sorted stably in ascending order and the last one is picked,
/// so among equal scores the larger index wins. Boxes whose overlap with the
/// pick is strictly greater than `threshold` are discarded.
pub fn non_max_suppression(boxes: &[CandidateBox], threshold: f64, mode: NmsMode) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| boxes[a].score.total_cmp(&boxes[b].score));

    let mut pick = Vec::new();
    while let Some(best) = order.pop() {
        pick.push(best);
        order.retain(|&other| overlap(&boxes[best], &boxes[other], mode) <= threshold);
    }
    pick
}
