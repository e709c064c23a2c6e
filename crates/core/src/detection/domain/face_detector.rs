use thiserror::Error;

use crate::detection::domain::face_annotation::FaceAnnotation;
use crate::detection::domain::inference_engine::InferenceError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;

/// The three networks of the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Proposal,
    Refinement,
    Output,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Proposal => write!(f, "proposal"),
            Stage::Refinement => write!(f, "refinement"),
            Stage::Output => write!(f, "output"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DetectionError {
    /// Rejected before the cascade runs.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The engine failed or returned unusable tensors; the run is aborted.
    #[error("{stage} stage inference failed: {source}")]
    Inference {
        stage: Stage,
        #[source]
        source: InferenceError,
    },
}

impl DetectionError {
    pub fn inference(stage: Stage) -> impl FnOnce(InferenceError) -> DetectionError {
        move |source| DetectionError::Inference { stage, source }
    }
}

/// Result of a successful detection run.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionOutcome {
    Faces(Vec<FaceAnnotation>),
    /// The cascade ran to completion and nothing survived.
    NoFaces,
}

impl DetectionOutcome {
    pub fn from_faces(faces: Vec<FaceAnnotation>) -> Self {
        if faces.is_empty() {
            DetectionOutcome::NoFaces
        } else {
            DetectionOutcome::Faces(faces)
        }
    }

    pub fn faces(&self) -> &[FaceAnnotation] {
        match self {
            DetectionOutcome::Faces(faces) => faces,
            DetectionOutcome::NoFaces => &[],
        }
    }

    pub fn into_faces(self) -> Vec<FaceAnnotation> {
        match self {
            DetectionOutcome::Faces(faces) => faces,
            DetectionOutcome::NoFaces => Vec::new(),
        }
    }
}

/// Domain interface for face detection.
///
/// Implementations hold no per-image state, hence `&self`.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<DetectionOutcome, DetectionError>;

    /// Like [`detect`](Self::detect), reporting per-stage timings and
    /// candidate counts to `logger`. Default: reports nothing.
    fn detect_with_logger(
        &self,
        frame: &Frame,
        _logger: &mut dyn PipelineLogger,
    ) -> Result<DetectionOutcome, DetectionError> {
        self.detect(frame)
    }
}
