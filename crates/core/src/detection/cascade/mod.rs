pub mod cascade_detector;
pub mod face_aligner;
pub mod image_resampler;
pub mod network;
pub mod output_stage;
pub mod proposal_stage;
pub mod refinement_stage;

#[cfg(test)]
pub(crate) mod fakes;
