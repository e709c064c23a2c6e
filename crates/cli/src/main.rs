use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

use mtcnn_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use mtcnn_core::detection::cascade::cascade_detector::CascadeDetector;
use mtcnn_core::detection::infrastructure::model_resolver::{self, CascadeModelPaths};
use mtcnn_core::detection::infrastructure::onnx_inference_engine::load_cascade_engines;
use mtcnn_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use mtcnn_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use mtcnn_core::pipeline::batch_detect_use_case::{
    BatchDetectUseCase, BatchJob, SendError, UseCaseFactory,
};
use mtcnn_core::pipeline::detect_image_use_case::DetectImageUseCase;
use mtcnn_core::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use mtcnn_core::shared::config::{MtcnnSettings, OutputMode};
use mtcnn_core::shared::constants::{IMAGE_EXTENSIONS, MODEL_URL_ENV};

/// MTCNN face detection, landmarks and alignment for images.
#[derive(Parser, Debug)]
#[command(name = "mtcnn")]
struct Cli {
    /// Input image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file, or directory when there are several inputs or in
    /// alignment mode. Annotation mode prints to stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to produce for each image.
    #[arg(long, value_enum, ignore_case = true)]
    output_mode: Option<OutputModeArg>,

    /// JSON settings file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding pnet.onnx, rnet.onnx and onet.onnx.
    #[arg(long)]
    models: Option<PathBuf>,

    /// Base URL to download missing models from.
    #[arg(long, env = MODEL_URL_ENV)]
    model_url: Option<String>,

    /// Smallest face to detect, in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Pyramid scale step (0.0-1.0, exclusive).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Per-stage score thresholds (three comma-separated values).
    #[arg(long, value_delimiter = ',')]
    thresholds: Option<Vec<f64>>,

    /// Margin around each face when aligning, in pixels.
    #[arg(long)]
    margin: Option<u32>,

    /// Side of each aligned face image, in pixels.
    #[arg(long)]
    size: Option<u32>,

    /// Keep raw pixel values in aligned faces.
    #[arg(long)]
    no_prewhiten: bool,

    /// Write augmented images without boxes and landmarks.
    #[arg(long)]
    no_draw: bool,

    /// Do not write the JSON annotations next to augmented images.
    #[arg(long)]
    skip_annotation_sidecar: bool,

    /// Worker threads for batches.
    #[arg(long, default_value = "1")]
    workers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputModeArg {
    /// Face list as JSON.
    Annotation,
    /// The input image with faces drawn, plus a JSON sidecar.
    Augmentation,
    /// One cropped, resized face image per detection.
    Alignment,
}

impl OutputModeArg {
    fn to_core(self) -> OutputMode {
        match self {
            Self::Annotation => OutputMode::Annotation,
            Self::Augmentation => OutputMode::Augmentation,
            Self::Alignment => OutputMode::Alignment,
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let settings = build_settings(&cli)?;
    let inputs = collect_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        return Err("No images found in the given inputs".into());
    }

    log::info!("Resolving models");
    let models = model_resolver::resolve_cascade(cli.models.as_deref(), cli.model_url.as_deref())?;
    let mut logger = StdoutPipelineLogger::default();

    if settings.output_mode == OutputMode::Annotation && cli.output.is_none() {
        let use_case = build_use_case(&models, &settings)?;
        let mut all = Vec::with_capacity(inputs.len());
        for input in &inputs {
            let (_, faces) = use_case.detect(input, &mut logger)?;
            all.push(faces);
        }
        let json = if all.len() == 1 {
            serde_json::to_string_pretty(&all[0])?
        } else {
            serde_json::to_string_pretty(&all)?
        };
        println!("{json}");
        logger.summary();
        return Ok(());
    }

    let output = cli
        .output
        .as_deref()
        .ok_or("--output is required for augmentation and alignment")?;
    let jobs = plan_jobs(&inputs, output, settings.output_mode);

    let factory: UseCaseFactory = {
        let models = models.clone();
        let settings = settings.clone();
        Arc::new(move || {
            build_use_case(&models, &settings).map_err(|e| -> SendError { e.to_string().into() })
        })
    };
    let batch = BatchDetectUseCase::new(factory, cli.workers);
    let results = batch.execute(jobs.clone(), &mut logger);
    logger.summary();

    let mut failures = 0;
    for (job, result) in jobs.iter().zip(&results) {
        match result {
            Ok(faces) => log::info!(
                "{}: {} face(s) -> {}",
                job.input.display(),
                faces.len(),
                job.output.display()
            ),
            Err(e) => {
                failures += 1;
                eprintln!("{}: {e}", job.input.display());
            }
        }
    }
    if failures > 0 {
        return Err(format!("{failures} of {} image(s) failed", jobs.len()).into());
    }
    Ok(())
}

fn build_use_case(
    models: &CascadeModelPaths,
    settings: &MtcnnSettings,
) -> Result<DetectImageUseCase, Box<dyn std::error::Error>> {
    let engines = load_cascade_engines(models)?;
    let detector = CascadeDetector::new(engines, &settings.network, settings.detector.clone())?;
    Ok(DetectImageUseCase::new(
        Box::new(ImageFileReader::new()),
        Box::new(ImageFileWriter::new()),
        Box::new(detector),
        Box::new(BoxAnnotator::default()),
        settings.clone(),
    )?)
}

fn build_settings(cli: &Cli) -> Result<MtcnnSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.config {
        Some(path) => MtcnnSettings::load(path)?,
        None => MtcnnSettings::default(),
    };
    if let Some(mode) = cli.output_mode {
        settings.output_mode = mode.to_core();
    }
    if let Some(v) = cli.min_face_size {
        settings.detector.min_face_size = v;
    }
    if let Some(v) = cli.scale_factor {
        settings.detector.scale_factor = v;
    }
    if let Some(t) = &cli.thresholds {
        settings.detector.step_thresholds = [t[0], t[1], t[2]];
    }
    if let Some(v) = cli.margin {
        settings.alignment.margin = v;
    }
    if let Some(v) = cli.size {
        settings.alignment.size = v;
    }
    if cli.no_prewhiten {
        settings.alignment.pre_whitening = false;
    }
    if cli.no_draw {
        settings.draw_face_annotations = false;
    }
    if cli.skip_annotation_sidecar {
        settings.skip_face_annotation_header = true;
    }
    settings.validate()?;
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if let Some(t) = &cli.thresholds {
        if t.len() != 3 {
            return Err(format!("--thresholds takes exactly 3 values, got {}", t.len()).into());
        }
    }
    if cli.workers == 0 {
        return Err("--workers must be at least 1".into());
    }
    Ok(())
}

/// Expands directories into their image files, sorted by name.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

/// Where each input's result goes. A single non-alignment input writes to
/// `output` itself; otherwise `output` is a directory.
fn plan_jobs(inputs: &[PathBuf], output: &Path, mode: OutputMode) -> Vec<BatchJob> {
    inputs
        .iter()
        .map(|input| {
            let target = match mode {
                OutputMode::Alignment => output.to_path_buf(),
                _ if inputs.len() == 1 => output.to_path_buf(),
                OutputMode::Annotation => output.join(file_stem(input)).with_extension("json"),
                OutputMode::Augmentation => {
                    output.join(input.file_name().unwrap_or(input.as_os_str()))
                }
            };
            BatchJob {
                input: input.clone(),
                output: target,
            }
        })
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["mtcnn"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    // ── Argument parsing ──

    #[test]
    fn test_defaults() {
        let cli = parse(&["a.jpg"]);
        assert_eq!(cli.inputs, vec![PathBuf::from("a.jpg")]);
        assert!(cli.output.is_none());
        assert!(cli.output_mode.is_none());
        assert_eq!(cli.workers, 1);
        assert!(!cli.no_prewhiten);
    }

    #[test]
    fn test_inputs_required() {
        assert!(Cli::try_parse_from(["mtcnn"]).is_err());
    }

    #[test]
    fn test_output_mode_parsed() {
        let cli = parse(&["a.jpg", "--output-mode", "alignment"]);
        assert_eq!(cli.output_mode, Some(OutputModeArg::Alignment));
        let cli = parse(&["a.jpg", "--output-mode", "Augmentation"]);
        assert_eq!(cli.output_mode.map(OutputModeArg::to_core), Some(OutputMode::Augmentation));
        let err = Cli::try_parse_from(["mtcnn", "a.jpg", "--output-mode", "blur"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_thresholds_comma_separated() {
        let cli = parse(&["a.jpg", "--thresholds", "0.5,0.6,0.9"]);
        assert_eq!(cli.thresholds, Some(vec![0.5, 0.6, 0.9]));
    }

    // ── Settings ──

    #[test]
    fn test_flags_override_settings() {
        let cli = parse(&[
            "a.jpg",
            "--output-mode",
            "annotation",
            "--min-face-size",
            "40",
            "--scale-factor",
            "0.5",
            "--thresholds",
            "0.1,0.2,0.3",
            "--margin",
            "10",
            "--size",
            "96",
            "--no-prewhiten",
            "--no-draw",
            "--skip-annotation-sidecar",
        ]);
        let s = build_settings(&cli).unwrap();
        assert_eq!(s.output_mode, OutputMode::Annotation);
        assert_eq!(s.detector.min_face_size, 40);
        assert_eq!(s.detector.scale_factor, 0.5);
        assert_eq!(s.detector.step_thresholds, [0.1, 0.2, 0.3]);
        assert_eq!((s.alignment.margin, s.alignment.size), (10, 96));
        assert!(!s.alignment.pre_whitening);
        assert!(!s.draw_face_annotations);
        assert!(s.skip_face_annotation_header);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"output_mode":"alignment","detector":{"min_face_size":30}}"#)
            .unwrap();
        let config = path.to_string_lossy().into_owned();
        let cli = parse(&["a.jpg", "--config", &config, "--scale-factor", "0.8"]);
        let s = build_settings(&cli).unwrap();
        assert_eq!(s.output_mode, OutputMode::Alignment);
        assert_eq!(s.detector.min_face_size, 30);
        assert_eq!(s.detector.scale_factor, 0.8);
    }

    #[test]
    fn test_invalid_scale_factor_rejected() {
        let cli = parse(&["a.jpg", "--scale-factor", "1.5"]);
        assert!(build_settings(&cli).is_err());
    }

    // ── Validation ──

    #[test]
    fn test_missing_input_rejected() {
        let cli = parse(&["/nonexistent/a.jpg"]);
        assert!(validate(&cli).unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_wrong_threshold_count_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_string_lossy().into_owned();
        let cli = parse(&[&input, "--thresholds", "0.1,0.2"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().to_string_lossy().into_owned();
        let cli = parse(&[&input, "--workers", "0"]);
        assert!(validate(&cli).is_err());
    }

    // ── Inputs and jobs ──

    #[test]
    fn test_collect_inputs_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let files = collect_inputs(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files, vec![dir.path().join("a.JPG"), dir.path().join("b.png")]);
    }

    #[test]
    fn test_plan_single_input_writes_to_output() {
        let jobs = plan_jobs(&[PathBuf::from("in/a.jpg")], Path::new("out.png"), OutputMode::Augmentation);
        assert_eq!(jobs[0].output, PathBuf::from("out.png"));
    }

    #[test]
    fn test_plan_many_inputs_into_directory() {
        let inputs = [PathBuf::from("in/a.jpg"), PathBuf::from("in/b.png")];
        let aug = plan_jobs(&inputs, Path::new("out"), OutputMode::Augmentation);
        assert_eq!(aug[1].output, PathBuf::from("out/b.png"));
        let ann = plan_jobs(&inputs, Path::new("out"), OutputMode::Annotation);
        assert_eq!(ann[0].output, PathBuf::from("out/a.json"));
        let ali = plan_jobs(&inputs, Path::new("faces"), OutputMode::Alignment);
        assert!(ali.iter().all(|j| j.output == PathBuf::from("faces")));
    }
}
