pub mod bounding_box_generator;
pub mod candidate_box;
pub mod face_annotation;
pub mod face_detector;
pub mod face_landmarks;
pub mod inference_engine;
pub mod non_max_suppression;
pub mod padding;
pub mod scale_pyramid;
