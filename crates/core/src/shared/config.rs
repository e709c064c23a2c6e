use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::frame::ChannelOrder;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("scale factor must be in (0, 1), got {0}")]
    ScaleFactor(f64),
    #[error("minimum face size must be positive")]
    MinFaceSize,
    #[error("step threshold {index} must be in [0, 1], got {value}")]
    Threshold { index: usize, value: f64 },
    #[error("alignment size must be positive")]
    AlignmentSize,
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Pyramid and per-stage score thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub min_face_size: u32,
    pub scale_factor: f64,
    pub step_thresholds: [f64; 3],
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_face_size: 20,
            scale_factor: 0.709,
            step_thresholds: [0.6, 0.7, 0.7],
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scale_factor > 0.0 && self.scale_factor < 1.0) {
            return Err(ConfigError::ScaleFactor(self.scale_factor));
        }
        if self.min_face_size == 0 {
            return Err(ConfigError::MinFaceSize);
        }
        for (index, &value) in self.step_thresholds.iter().enumerate() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Threshold { index, value });
            }
        }
        Ok(())
    }
}

/// Crop, resize and whitening applied to each detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Margin around the bounding box in pixels, split evenly between sides.
    pub margin: u32,
    /// Side of the square output in pixels.
    pub size: u32,
    pub pre_whitening: bool,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            margin: 44,
            size: 160,
            pre_whitening: true,
        }
    }
}

impl AlignmentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.size == 0 {
            return Err(ConfigError::AlignmentSize);
        }
        Ok(())
    }
}

/// Spatial layout the network expects for its image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// (batch, height, width, channels)
    Nhwc,
    /// (batch, width, height, channels): the published MTCNN graphs.
    Nwhc,
}

/// Tensor names of one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNames {
    pub input: String,
    pub regression: String,
    pub probability: String,
    /// Only the output network has a landmark head.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<String>,
}

impl NetworkNames {
    fn new(input: &str, regression: &str, probability: &str) -> Self {
        Self {
            input: input.to_string(),
            regression: regression.to_string(),
            probability: probability.to_string(),
            landmarks: None,
        }
    }
}

/// How the three networks are fed and read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub layout: InputLayout,
    pub channel_order: ChannelOrder,
    pub proposal: NetworkNames,
    pub refinement: NetworkNames,
    pub output: NetworkNames,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let mut output = NetworkNames::new("onet/input", "onet/fc2-2/fc2-2", "onet/prob1");
        output.landmarks = Some("onet/fc2-3/fc2-3".to_string());
        Self {
            layout: InputLayout::Nwhc,
            channel_order: ChannelOrder::Rgb,
            proposal: NetworkNames::new("pnet/input", "pnet/conv4-2/BiasAdd", "pnet/prob1"),
            refinement: NetworkNames::new("rnet/input", "rnet/fc2-2/fc2-2", "rnet/prob1"),
            output,
        }
    }
}

/// What a detection run produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// Face annotations as JSON.
    Annotation,
    /// The input image with the annotations drawn on top.
    Augmentation,
    /// One aligned crop per detected face.
    Alignment,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Annotation => write!(f, "annotation"),
            OutputMode::Augmentation => write!(f, "augmentation"),
            OutputMode::Alignment => write!(f, "alignment"),
        }
    }
}

/// Complete settings for a detection run, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MtcnnSettings {
    pub output_mode: OutputMode,
    pub draw_face_annotations: bool,
    pub skip_face_annotation_header: bool,
    pub detector: DetectorConfig,
    pub alignment: AlignmentConfig,
    pub network: NetworkConfig,
}

impl Default for MtcnnSettings {
    fn default() -> Self {
        Self {
            output_mode: OutputMode::Augmentation,
            draw_face_annotations: true,
            skip_face_annotation_header: false,
            detector: DetectorConfig::default(),
            alignment: AlignmentConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl MtcnnSettings {
    /// Reads settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let settings: MtcnnSettings = serde_json::from_str(&json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.alignment.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_detector_defaults() {
        let c = DetectorConfig::default();
        assert_eq!(c.min_face_size, 20);
        assert_eq!(c.scale_factor, 0.709);
        assert_eq!(c.step_thresholds, [0.6, 0.7, 0.7]);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_alignment_defaults() {
        let a = AlignmentConfig::default();
        assert_eq!(a.margin, 44);
        assert_eq!(a.size, 160);
        assert!(a.pre_whitening);
    }

    #[rstest]
    #[case::zero(0.0)]
    #[case::one(1.0)]
    #[case::negative(-0.5)]
    #[case::above_one(1.2)]
    fn test_scale_factor_out_of_range(#[case] factor: f64) {
        let c = DetectorConfig {
            scale_factor: factor,
            ..DetectorConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::ScaleFactor(_))));
    }

    #[test]
    fn test_zero_min_face_size_rejected() {
        let c = DetectorConfig {
            min_face_size: 0,
            ..DetectorConfig::default()
        };
        assert!(matches!(c.validate(), Err(ConfigError::MinFaceSize)));
    }

    #[test]
    fn test_threshold_out_of_range_reports_index() {
        let c = DetectorConfig {
            step_thresholds: [0.6, 1.5, 0.7],
            ..DetectorConfig::default()
        };
        match c.validate() {
            Err(ConfigError::Threshold { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_default_network_names_match_published_graphs() {
        let n = NetworkConfig::default();
        assert_eq!(n.proposal.input, "pnet/input");
        assert_eq!(n.proposal.probability, "pnet/prob1");
        assert_eq!(n.refinement.regression, "rnet/fc2-2/fc2-2");
        assert_eq!(n.output.landmarks.as_deref(), Some("onet/fc2-3/fc2-3"));
        assert_eq!(n.layout, InputLayout::Nwhc);
        assert_eq!(n.channel_order, ChannelOrder::Rgb);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"output_mode":"annotation","detector":{"min_face_size":40}}"#;
        let s: MtcnnSettings = serde_json::from_str(json).unwrap();
        assert_eq!(s.output_mode, OutputMode::Annotation);
        assert_eq!(s.detector.min_face_size, 40);
        assert_eq!(s.detector.scale_factor, 0.709);
        assert_eq!(s.alignment.size, 160);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"alignment":{"margin":10,"pre_whitening":false}}"#).unwrap();
        let s = MtcnnSettings::load(&path).unwrap();
        assert_eq!(s.alignment.margin, 10);
        assert!(!s.alignment.pre_whitening);
        assert_eq!(s.alignment.size, 160);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"detector":{"scale_factor":2.0}}"#).unwrap();
        assert!(matches!(
            MtcnnSettings::load(&path),
            Err(ConfigError::ScaleFactor(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MtcnnSettings::load(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
