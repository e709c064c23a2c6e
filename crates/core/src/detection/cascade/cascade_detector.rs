use std::time::Instant;

use crate::detection::cascade::face_aligner::{align_face, AlignedFace};
use crate::detection::cascade::network::Network;
use crate::detection::cascade::output_stage::OutputStage;
use crate::detection::cascade::proposal_stage::ProposalStage;
use crate::detection::cascade::refinement_stage::RefinementStage;
use crate::detection::domain::face_annotation::FaceAnnotation;
use crate::detection::domain::face_detector::{
    DetectionError, DetectionOutcome, FaceDetector, Stage,
};
use crate::detection::domain::inference_engine::InferenceEngine;
use crate::detection::domain::scale_pyramid::compute_scale_pyramid;
use crate::pipeline::pipeline_logger::{
    candidates_metric, NullPipelineLogger, PipelineLogger, PYRAMID_LEVELS_METRIC,
};
use crate::shared::config::{AlignmentConfig, DetectorConfig, NetworkConfig};
use crate::shared::frame::Frame;

/// The inference engines backing the three networks.
pub struct CascadeEngines {
    pub proposal: Box<dyn InferenceEngine>,
    pub refinement: Box<dyn InferenceEngine>,
    pub output: Box<dyn InferenceEngine>,
}

/// MTCNN face detector: proposal, refinement and output networks run in
/// sequence on a single image.
///
/// Holds no per-image state. Every call builds its own pyramid and
/// candidate lists, so one detector can serve many threads as long as its
/// engines can.
pub struct CascadeDetector {
    proposal: ProposalStage,
    refinement: RefinementStage,
    output: OutputStage,
    config: DetectorConfig,
}

impl CascadeDetector {
    pub fn new(
        engines: CascadeEngines,
        network: &NetworkConfig,
        config: DetectorConfig,
    ) -> Result<Self, DetectionError> {
        validate(&config)?;
        let order = network.channel_order;
        let layout = network.layout;
        Ok(Self {
            proposal: ProposalStage::new(
                Network::new(engines.proposal, network.proposal.clone(), layout),
                order,
            ),
            refinement: RefinementStage::new(
                Network::new(engines.refinement, network.refinement.clone(), layout),
                order,
            ),
            output: OutputStage::new(
                Network::new(engines.output, network.output.clone(), layout),
                order,
            ),
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Detects faces with explicit parameters, highest confidence first.
    pub fn detect_faces(
        &self,
        frame: &Frame,
        params: &DetectorConfig,
    ) -> Result<Vec<FaceAnnotation>, DetectionError> {
        validate(params)?;
        self.run(frame, params, &mut NullPipelineLogger)
    }

    /// Aligned crops for `faces`, index for index. A face whose clamped crop
    /// has no area maps to `None`.
    pub fn align(
        &self,
        frame: &Frame,
        faces: &[FaceAnnotation],
        config: &AlignmentConfig,
    ) -> Result<Vec<Option<AlignedFace>>, DetectionError> {
        config
            .validate()
            .map_err(|e| DetectionError::InvalidInput(e.to_string()))?;
        Ok(faces
            .iter()
            .map(|face| align_face(frame, &face.bbox(), config))
            .collect())
    }

    fn run(
        &self,
        frame: &Frame,
        params: &DetectorConfig,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<FaceAnnotation>, DetectionError> {
        let (width, height) = (frame.width(), frame.height());
        let [th_proposal, th_refine, th_output] = params.step_thresholds;

        let scales = compute_scale_pyramid(width, height, params.min_face_size, params.scale_factor);
        logger.metric(PYRAMID_LEVELS_METRIC, scales.len() as f64);
        if scales.is_empty() {
            log::debug!("{width}x{height} image is below the smallest detectable face");
            return Ok(Vec::new());
        }

        let t0 = Instant::now();
        let proposals = self
            .proposal
            .run(frame, &scales, th_proposal)
            .map_err(DetectionError::inference(Stage::Proposal))?;
        record(logger, Stage::Proposal, t0, proposals.len());
        if proposals.is_empty() {
            return Ok(Vec::new());
        }

        let t0 = Instant::now();
        let refined = self
            .refinement
            .run(frame, &proposals, th_refine)
            .map_err(DetectionError::inference(Stage::Refinement))?;
        record(logger, Stage::Refinement, t0, refined.len());
        if refined.is_empty() {
            return Ok(Vec::new());
        }

        let t0 = Instant::now();
        let detections = self
            .output
            .run(frame, &refined, th_output)
            .map_err(DetectionError::inference(Stage::Output))?;
        record(logger, Stage::Output, t0, detections.len());

        Ok(detections
            .into_iter()
            .map(|d| FaceAnnotation::from_candidate(&d.candidate, d.landmarks, width, height))
            .collect())
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, frame: &Frame) -> Result<DetectionOutcome, DetectionError> {
        self.detect_with_logger(frame, &mut NullPipelineLogger)
    }

    fn detect_with_logger(
        &self,
        frame: &Frame,
        logger: &mut dyn PipelineLogger,
    ) -> Result<DetectionOutcome, DetectionError> {
        self.run(frame, &self.config, logger)
            .map(DetectionOutcome::from_faces)
    }
}

fn validate(params: &DetectorConfig) -> Result<(), DetectionError> {
    params
        .validate()
        .map_err(|e| DetectionError::InvalidInput(e.to_string()))
}

fn record(logger: &mut dyn PipelineLogger, stage: Stage, started: Instant, survivors: usize) {
    let ms = started.elapsed().as_secs_f64() * 1000.0;
    logger.timing(&stage.to_string(), ms);
    logger.metric(&candidates_metric(stage), survivors as f64);
    log::debug!("{stage} stage: {survivors} candidates in {ms:.1}ms");
}
