use crate::detection::domain::face_annotation::FaceAnnotation;
use crate::shared::frame::Frame;

/// Domain interface for drawing detection results onto a frame.
///
/// Implementations modify the frame in-place (`&mut Frame`).
pub trait FrameAnnotator: Send {
    fn annotate(&self, frame: &mut Frame, faces: &[FaceAnnotation]);
}
