use crate::detection::cascade::image_resampler::crop_batch;
use crate::detection::cascade::network::{face_scores, per_candidate, Network};
use crate::detection::domain::candidate_box::{bbreg, rerec, select, CandidateBox};
use crate::detection::domain::inference_engine::InferenceError;
use crate::detection::domain::non_max_suppression::{non_max_suppression, NmsMode};
use crate::shared::constants::{REFINE_INPUT_SIZE, REFINE_NMS};
use crate::shared::frame::{ChannelOrder, Frame};

/// Second cascade stage: re-scores proposals on 24×24 crops in one batch.
pub struct RefinementStage {
    network: Network,
    channel_order: ChannelOrder,
}

impl RefinementStage {
    pub fn new(network: Network, channel_order: ChannelOrder) -> Self {
        Self {
            network,
            channel_order,
        }
    }

    pub fn run(
        &self,
        frame: &Frame,
        candidates: &[CandidateBox],
        threshold: f64,
    ) -> Result<Vec<CandidateBox>, InferenceError> {
        let (candidates, batch) =
            crop_batch(frame, candidates, REFINE_INPUT_SIZE, self.channel_order);
        if candidates.is_empty() {
            return Ok(candidates);
        }
        let n = candidates.len();

        let names = self.network.names();
        let mut outputs = self.network.run(batch)?;
        let reg = per_candidate(&mut outputs, &names.regression, n, 4)?;
        let prob = per_candidate(&mut outputs, &names.probability, n, 2)?;
        let scores = face_scores(&prob);

        let survivors: Vec<CandidateBox> = candidates
            .iter()
            .zip(scores)
            .zip(reg.rows())
            .filter(|((_, score), _)| *score > threshold)
            .map(|((c, score), deltas)| CandidateBox {
                score,
                deltas: [
                    deltas[0] as f64,
                    deltas[1] as f64,
                    deltas[2] as f64,
                    deltas[3] as f64,
                ],
                ..*c
            })
            .collect();
        log::debug!("refinement: {n} crops, {} above threshold", survivors.len());
        if survivors.is_empty() {
            return Ok(survivors);
        }

        let pick = non_max_suppression(&survivors, REFINE_NMS, NmsMode::Union);
        let mut refined = select(&survivors, &pick);
        bbreg(&mut refined);
        rerec(&mut refined);
        Ok(refined)
    }
}
