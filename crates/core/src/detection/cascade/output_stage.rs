use crate::detection::cascade::image_resampler::crop_batch;
use crate::detection::cascade::network::{face_scores, per_candidate, Network};
use crate::detection::domain::candidate_box::{bbreg, CandidateBox};
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::inference_engine::InferenceError;
use crate::detection::domain::non_max_suppression::{non_max_suppression, NmsMode};
use crate::shared::constants::{OUTPUT_INPUT_SIZE, OUTPUT_NMS};
use crate::shared::frame::{ChannelOrder, Frame};

/// A final box with its five keypoints, in image coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub candidate: CandidateBox,
    pub landmarks: FaceLandmarks,
}

/// Third cascade stage: final scoring, box calibration and landmarks on
/// 48×48 crops.
pub struct OutputStage {
    network: Network,
    channel_order: ChannelOrder,
}

impl OutputStage {
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
    ) -> Result<Vec<Detection>, InferenceError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let floored: Vec<CandidateBox> = candidates
            .iter()
            .map(|c| {
                let mut c = *c;
                c.floor();
                c
            })
            .collect();
        let (candidates, batch) =
            crop_batch(frame, &floored, OUTPUT_INPUT_SIZE, self.channel_order);
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let n = candidates.len();

        let names = self.network.names();
        let landmark_name = names.landmarks.as_deref().ok_or_else(|| {
            InferenceError::Engine("output network has no landmark tensor configured".into())
        })?;
        let mut outputs = self.network.run(batch)?;
        let reg = per_candidate(&mut outputs, &names.regression, n, 4)?;
        let points = per_candidate(&mut outputs, landmark_name, n, 10)?;
        let prob = per_candidate(&mut outputs, &names.probability, n, 2)?;
        let scores = face_scores(&prob);

        let mut boxes = Vec::new();
        let mut landmarks = Vec::new();
        for (i, c) in candidates.iter().enumerate() {
            if scores[i] <= threshold {
                continue;
            }
            let mut raw = [0f32; 10];
            for (k, v) in raw.iter_mut().enumerate() {
                *v = points[[i, k]];
            }
            landmarks.push(FaceLandmarks::from_relative(&raw, c.x1, c.y1, c.x2, c.y2));
            let r = reg.row(i);
            boxes.push(CandidateBox {
                score: scores[i],
                deltas: [r[0] as f64, r[1] as f64, r[2] as f64, r[3] as f64],
                ..*c
            });
        }
        log::debug!("output: {n} crops, {} above threshold", boxes.len());
        if boxes.is_empty() {
            return Ok(Vec::new());
        }

        bbreg(&mut boxes);
        let pick = non_max_suppression(&boxes, OUTPUT_NMS, NmsMode::Min);
        Ok(pick
            .into_iter()
            .map(|i| Detection {
                candidate: boxes[i],
                landmarks: landmarks[i].clone(),
            })
            .collect())
    }
}
