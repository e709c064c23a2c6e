use std::path::{Path, PathBuf};

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::cascade::face_aligner::align_face;
use crate::detection::domain::face_annotation::FaceAnnotation;
use crate::detection::domain::face_detector::FaceDetector;
use crate::imaging::domain::image_io::{ImageReader, ImageWriter};
use crate::pipeline::pipeline_logger::{PipelineLogger, FACES_METRIC};
use crate::shared::config::{ConfigError, MtcnnSettings, OutputMode};
use crate::shared::frame::Frame;

/// Single-image detection pipeline: read → detect → write in the configured
/// output mode.
///
/// - `Annotation`: the face list as pretty JSON at `output`.
/// - `Augmentation`: the input image, annotations drawn unless disabled, at
///   `output`; the JSON goes next to it with a `.json` extension unless
///   `skip_face_annotation_header` is set.
/// - `Alignment`: `output` is a directory receiving `<stem>_face<N>.png` and
///   `<stem>_face<N>.json` per face.
pub struct DetectImageUseCase {
    reader: Box<dyn ImageReader>,
    writer: Box<dyn ImageWriter>,
    detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
    settings: MtcnnSettings,
}

impl DetectImageUseCase {
    pub fn new(
        reader: Box<dyn ImageReader>,
        writer: Box<dyn ImageWriter>,
        detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        settings: MtcnnSettings,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self {
            reader,
            writer,
            detector,
            annotator,
            settings,
        })
    }

    pub fn settings(&self) -> &MtcnnSettings {
        &self.settings
    }

    /// Reads `input` and runs detection without writing anything.
    pub fn detect(
        &self,
        input: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(Frame, Vec<FaceAnnotation>), Box<dyn std::error::Error>> {
        let frame = self.reader.read(input)?;
        let faces = self.detector.detect_with_logger(&frame, logger)?.into_faces();
        logger.metric(FACES_METRIC, faces.len() as f64);
        log::info!("{}: {} face(s)", input.display(), faces.len());
        Ok((frame, faces))
    }

    /// Detects faces in `input` and writes the result to `output`.
    pub fn execute(
        &self,
        input: &Path,
        output: &Path,
        logger: &mut dyn PipelineLogger,
    ) -> Result<Vec<FaceAnnotation>, Box<dyn std::error::Error>> {
        let (mut frame, faces) = self.detect(input, logger)?;

        match self.settings.output_mode {
            OutputMode::Annotation => write_json(output, &faces)?,
            OutputMode::Augmentation => {
                if self.settings.draw_face_annotations {
                    self.annotator.annotate(&mut frame, &faces);
                }
                self.writer.write(output, &frame, None)?;
                if !self.settings.skip_face_annotation_header {
                    write_json(&output.with_extension("json"), &faces)?;
                }
            }
            OutputMode::Alignment => self.write_aligned(input, output, &frame, &faces)?,
        }

        Ok(faces)
    }

    fn write_aligned(
        &self,
        input: &Path,
        dir: &Path,
        frame: &Frame,
        faces: &[FaceAnnotation],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        for (i, face) in faces.iter().enumerate() {
            let Some(aligned) = align_face(frame, &face.bbox(), &self.settings.alignment) else {
                log::debug!("face {i} of {} has no area to align", input.display());
                continue;
            };
            let base = aligned_path(dir, &stem, i);
            self.writer
                .write(&base.with_extension("png"), &aligned.to_frame(), None)?;
            write_json(&base.with_extension("json"), face)?;
        }
        Ok(())
    }
}

fn aligned_path(dir: &Path, stem: &str, index: usize) -> PathBuf {
    dir.join(format!("{stem}_face{index}"))
}

fn write_json<T: serde::Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
