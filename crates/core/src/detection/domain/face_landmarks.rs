//! Five-point facial landmarks produced by the output network.

use serde::{Deserialize, Serialize};

/// Keypoint identity, in the order the output network emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandmarkKind {
    LeftEye,
    RightEye,
    Nose,
    MouthLeft,
    MouthRight,
}

impl LandmarkKind {
    pub const ALL: [LandmarkKind; 5] = [
        LandmarkKind::LeftEye,
        LandmarkKind::RightEye,
        LandmarkKind::Nose,
        LandmarkKind::MouthLeft,
        LandmarkKind::MouthRight,
    ];
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    /// Maps the network's relative keypoints into image space.
    ///
    /// `raw` holds five x fractions followed by five y fractions, relative to
    /// the inclusive box `(x1, y1, x2, y2)` the crop was taken from.
    pub fn from_relative(raw: &[f32; 10], x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        let w = x2 - x1 + 1.0;
        let h = y2 - y1 + 1.0;
        let mut points = [(0.0, 0.0); 5];
        for (k, p) in points.iter_mut().enumerate() {
            *p = (
                w * raw[k] as f64 + x1 - 1.0,
                h * raw[k + 5] as f64 + y1 - 1.0,
            );
        }
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64); 5] {
        &self.points
    }

    pub fn get(&self, kind: LandmarkKind) -> (f64, f64) {
        self.points[kind as usize]
    }

    /// Keypoints paired with their identity, in emission order.
    pub fn named(&self) -> impl Iterator<Item = (LandmarkKind, (f64, f64))> + '_ {
        LandmarkKind::ALL.iter().map(move |&k| (k, self.get(k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_relative_maps_into_box() {
        // box 10..19 (w=10) x 20..39 (h=20)
        let raw = [0.0, 1.0, 0.5, 0.2, 0.8, 0.0, 0.0, 0.5, 1.0, 1.0];
        let lm = FaceLandmarks::from_relative(&raw, 10.0, 20.0, 19.0, 39.0);
        let pts = lm.points();
        assert_relative_eq!(pts[0].0, 9.0);
        assert_relative_eq!(pts[1].0, 19.0);
        assert_relative_eq!(pts[2].0, 14.0);
        assert_relative_eq!(pts[0].1, 19.0);
        assert_relative_eq!(pts[2].1, 29.0);
        assert_relative_eq!(pts[4].1, 39.0);
    }

    #[test]
    fn test_named_order() {
        let lm = FaceLandmarks::new([(1.0, 1.0), (2.0, 2.0), (3.0, 3.0), (4.0, 4.0), (5.0, 5.0)]);
        let kinds: Vec<LandmarkKind> = lm.named().map(|(k, _)| k).collect();
        assert_eq!(kinds, LandmarkKind::ALL.to_vec());
        assert_eq!(lm.get(LandmarkKind::Nose), (3.0, 3.0));
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&LandmarkKind::MouthLeft).unwrap();
        assert_eq!(json, "\"MOUTH_LEFT\"");
    }
}
