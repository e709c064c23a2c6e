//! First cascade stage: dense scanning of the scale pyramid.
//!
//! Each pyramid level goes through the fully convolutional proposal network
//! once. Cells above the threshold become candidates, which are thinned per
//! level, then globally, then calibrated and squared.

use crate::detection::cascade::image_resampler::{normalize, resize};
use crate::detection::cascade::network::{proposal_maps, Network};
use crate::detection::domain::bounding_box_generator::generate_bounding_box;
use crate::detection::domain::candidate_box::{bbreg_exclusive, rerec, select, CandidateBox};
use crate::detection::domain::inference_engine::InferenceError;
use crate::detection::domain::non_max_suppression::{non_max_suppression, NmsMode};
use crate::detection::domain::scale_pyramid::scaled_size;
use crate::shared::constants::{PROPOSAL_GLOBAL_NMS, PROPOSAL_SCALE_NMS};
use crate::shared::frame::{ChannelOrder, Frame};

pub struct ProposalStage {
    network: Network,
    channel_order: ChannelOrder,
}

impl ProposalStage {
    pub fn new(network: Network, channel_order: ChannelOrder) -> Self {
        Self {
            network,
            channel_order,
        }
    }

    /// Candidates for `frame` over all `scales`, with integer corners.
    ///
    /// Returns an empty list when no cell on any level clears `threshold`.
    pub fn run(
        &self,
        frame: &Frame,
        scales: &[f64],
        threshold: f64,
    ) -> Result<Vec<CandidateBox>, InferenceError> {
        let mut candidates = Vec::new();
        for &scale in scales {
            let (w, h) = scaled_size(frame.width(), frame.height(), scale);
            let level = normalize(&resize(frame, w, h), self.channel_order);

            let mut outputs = self.network.run(level)?;
            let maps = proposal_maps(&mut outputs, self.network.names(), self.network.layout())?;
            let boxes =
                generate_bounding_box(maps.scores.view(), maps.regression.view(), scale, threshold);

            let pick = non_max_suppression(&boxes, PROPOSAL_SCALE_NMS, NmsMode::Union);
            log::debug!(
                "proposal scale {scale:.4} ({w}x{h}): {} cells, {} after nms",
                boxes.len(),
                pick.len()
            );
            candidates.extend(select(&boxes, &pick));
        }

        if candidates.is_empty() {
            return Ok(candidates);
        }

        let pick = non_max_suppression(&candidates, PROPOSAL_GLOBAL_NMS, NmsMode::Union);
        let mut candidates = select(&candidates, &pick);
        bbreg_exclusive(&mut candidates);
        rerec(&mut candidates);
        for c in candidates.iter_mut() {
            c.truncate();
        }
        Ok(candidates)
    }
}
