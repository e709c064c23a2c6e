use serde::{Deserialize, Serialize};

use crate::detection::domain::candidate_box::CandidateBox;
use crate::detection::domain::face_landmarks::{FaceLandmarks, LandmarkKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(rename = "type")]
    pub kind: LandmarkKind,
    pub position: Position,
}

/// A detected face: box, confidence and five named keypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnnotation {
    bbox: BoundingBox,
    confidence: f64,
    landmarks: Vec<Landmark>,
}

impl FaceAnnotation {
    pub fn new(bbox: BoundingBox, confidence: f64, landmarks: FaceLandmarks) -> Self {
        let landmarks = landmarks
            .named()
            .map(|(kind, (x, y))| Landmark {
                kind,
                position: Position {
                    x: x as i32,
                    y: y as i32,
                },
            })
            .collect();
        Self {
            bbox,
            confidence,
            landmarks,
        }
    }

    /// Builds the public annotation for a final candidate, clamping the box
    /// to the `width` × `height` image.
    pub fn from_candidate(
        candidate: &CandidateBox,
        landmarks: FaceLandmarks,
        width: u32,
        height: u32,
    ) -> Self {
        let (w, h) = (width as i32, height as i32);
        let left = (candidate.x1 as i32).clamp(0, w);
        let top = (candidate.y1 as i32).clamp(0, h);
        let right = (candidate.x2 as i32).clamp(left, w);
        let bottom = (candidate.y2 as i32).clamp(top, h);
        let bbox = BoundingBox {
            x: left,
            y: top,
            w: right - left,
            h: bottom - top,
        };
        Self::new(bbox, candidate.score, landmarks)
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }
}
