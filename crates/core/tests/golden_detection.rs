//! End-to-end check against known detections on a reference group photo.
//!
//! Needs the three ONNX networks and the photo, so it is ignored by default:
//!
//! ```sh
//! MTCNN_MODELS_DIR=/path/to/models MTCNN_GOLDEN_IMAGE=/path/to/photo.jpg \
//!     cargo test -p mtcnn-core --test golden_detection -- --ignored
//! ```

use std::path::PathBuf;

use approx::assert_abs_diff_eq;

use mtcnn_core::detection::cascade::cascade_detector::CascadeDetector;
use mtcnn_core::detection::domain::face_landmarks::LandmarkKind;
use mtcnn_core::detection::infrastructure::model_resolver::resolve_cascade;
use mtcnn_core::detection::infrastructure::onnx_inference_engine::load_cascade_engines;
use mtcnn_core::imaging::domain::image_io::ImageReader;
use mtcnn_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use mtcnn_core::shared::config::{DetectorConfig, NetworkConfig};

/// Resampling differs slightly between image libraries.
const PIXEL_TOLERANCE: i32 = 2;

struct Expected {
    bbox: (i32, i32, i32, i32),
    confidence: f64,
    landmarks: [(i32, i32); 5],
}

const EXPECTED: [Expected; 2] = [
    Expected {
        bbox: (331, 92, 58, 71),
        confidence: 0.9999871253967285,
        landmarks: [(346, 120), (374, 119), (359, 133), (347, 147), (371, 147)],
    },
    Expected {
        bbox: (102, 159, 68, 81),
        confidence: 0.9991292357444763,
        landmarks: [(121, 188), (153, 190), (136, 203), (121, 218), (149, 220)],
    },
];

fn env_path(name: &str) -> PathBuf {
    PathBuf::from(std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set")))
}

fn close(actual: i32, expected: i32) -> bool {
    (actual - expected).abs() <= PIXEL_TOLERANCE
}

#[test]
#[ignore = "needs MTCNN_MODELS_DIR and MTCNN_GOLDEN_IMAGE"]
fn test_reference_photo_yields_known_faces() {
    let models = resolve_cascade(Some(&env_path("MTCNN_MODELS_DIR")), None).unwrap();
    let engines = load_cascade_engines(&models).unwrap();
    let detector =
        CascadeDetector::new(engines, &NetworkConfig::default(), DetectorConfig::default()).unwrap();
    let frame = ImageFileReader::new()
        .read(&env_path("MTCNN_GOLDEN_IMAGE"))
        .unwrap();

    let faces = detector
        .detect_faces(&frame, &DetectorConfig::default())
        .unwrap();

    assert_eq!(faces.len(), EXPECTED.len());
    for (face, expected) in faces.iter().zip(&EXPECTED) {
        let b = face.bbox();
        let (x, y, w, h) = expected.bbox;
        assert!(
            close(b.x, x) && close(b.y, y) && close(b.w, w) && close(b.h, h),
            "bbox {b:?} != {:?}",
            expected.bbox
        );
        assert_abs_diff_eq!(face.confidence(), expected.confidence, epsilon = 1e-3);

        let kinds: Vec<_> = face.landmarks().iter().map(|l| l.kind).collect();
        assert_eq!(kinds, LandmarkKind::ALL.to_vec());
        for (lm, &(ex, ey)) in face.landmarks().iter().zip(&expected.landmarks) {
            assert!(
                close(lm.position.x, ex) && close(lm.position.y, ey),
                "{:?} at {:?}, expected ({ex}, {ey})",
                lm.kind,
                lm.position
            );
        }
    }
}
