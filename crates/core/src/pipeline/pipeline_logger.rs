use std::collections::HashMap;
use std::time::Instant;

use crate::detection::domain::face_detector::Stage;

/// Number of pyramid scales built for one image.
pub const PYRAMID_LEVELS_METRIC: &str = "pyramid_levels";
/// Faces reported for one image.
pub const FACES_METRIC: &str = "faces";

const CASCADE: [Stage; 3] = [Stage::Proposal, Stage::Refinement, Stage::Output];

/// Metric name for the candidates a stage kept on one image.
pub fn candidates_metric(stage: Stage) -> String {
    format!("{stage}_candidates")
}

/// Cross-cutting logger for detection runs.
///
/// Use cases and the cascade report progress, per-stage timings and
/// candidate counts here instead of printing, so the CLI can summarise a
/// batch while library callers stay silent.
pub trait PipelineLogger: Send {
    /// Report image-level progress.
    fn progress(&mut self, current: usize, total: usize);

    /// Record how long a named stage took for one image.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. candidates surviving a stage).
    fn metric(&mut self, name: &str, value: f64);

    /// Log a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger that discards all events.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn progress(&mut self, _current: usize, _total: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// CLI logger collecting per-stage timings and metrics into a summary.
///
/// Progress lines are throttled to every `throttle_images` images.
pub struct StdoutPipelineLogger {
    throttle_images: usize,
    timings: HashMap<String, Vec<f64>>,
    metrics: HashMap<String, Vec<f64>>,
    start_time: Instant,
    total_images: usize,
    messages: Vec<String>,
}

impl StdoutPipelineLogger {
    pub fn new(throttle_images: usize) -> Self {
        Self {
            throttle_images: throttle_images.max(1),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
            total_images: 0,
            messages: Vec::new(),
        }
    }

    /// Returns the formatted summary string, or `None` if no data recorded.
    ///
    /// Stages are listed in cascade order with their mean time and the mean
    /// number of candidates they kept, followed by pyramid depth and faces
    /// per image.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() && self.metrics.is_empty() {
            return None;
        }

        let faces = self.metrics_for(FACES_METRIC).unwrap_or(&[]);
        let images = self.total_images.max(faces.len());
        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Detection summary ({images} images, {elapsed_s:.1}s total):"
        )];

        if let Some(levels) = self.metrics_for(PYRAMID_LEVELS_METRIC) {
            lines.push(format!("  {:12}: avg {:.1}", "pyramid", mean(levels)));
        }

        for stage in CASCADE {
            let name = stage.to_string();
            let durations = self.timings_for(&name);
            let candidates = self.metrics_for(&candidates_metric(stage));
            if durations.is_none() && candidates.is_none() {
                continue;
            }
            let mut line = format!("  {name:12}:");
            if let Some(d) = durations {
                line.push_str(&format!(" avg {:6.1}ms", mean(d)));
            }
            if let Some(c) = candidates {
                line.push_str(&format!("  avg {:7.1} candidates", mean(c)));
            }
            lines.push(line);
        }

        if !faces.is_empty() {
            let total: f64 = faces.iter().sum();
            lines.push(format!(
                "  {:12}: avg {:.1} per image  ({total:.0} total)",
                "faces",
                mean(faces)
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    pub fn metrics_for(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(|v| v.as_slice())
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new(10)
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn progress(&mut self, current: usize, total: usize) {
        self.total_images = total;
        if total > 0 && (current % self.throttle_images == 0 || current == total) {
            let pct = current as f64 / total as f64 * 100.0;
            log::info!("Processing: {current}/{total} images ({pct:.1}%)");
        }
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .push(value);
    }

    fn info(&mut self, message: &str) {
        self.messages.push(message.to_string());
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.progress(1, 10);
        logger.timing("proposal", 5.0);
        logger.metric("proposal_candidates", 3.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_per_stage() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("proposal", 20.0);
        logger.timing("proposal", 30.0);
        logger.timing("output", 5.0);

        assert_eq!(logger.timings_for("proposal"), Some(&[20.0, 30.0][..]));
        assert_eq!(logger.timings_for("output"), Some(&[5.0][..]));
        assert!(logger.timings_for("refinement").is_none());
    }

    #[test]
    fn test_summary_reports_candidates_per_stage_in_cascade_order() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.timing("output", 6.0);
        logger.metric("output_candidates", 2.0);
        logger.metric("output_candidates", 3.0);
        logger.timing("proposal", 20.0);
        logger.metric("proposal_candidates", 40.0);
        logger.timing("refinement", 4.0);
        logger.metric("refinement_candidates", 9.0);

        let summary = logger.summary_string().unwrap();
        let at = |needle: &str| summary.find(needle).unwrap();
        assert!(at("proposal") < at("refinement"));
        assert!(at("refinement") < at("output"));
        assert!(summary.contains("avg    40.0 candidates"));
        assert!(summary.contains("avg     2.5 candidates"));
        assert!(!summary.contains("images/s"));
    }

    #[test]
    fn test_summary_reports_faces_per_image() {
        let mut logger = StdoutPipelineLogger::new(10);
        logger.metric(PYRAMID_LEVELS_METRIC, 7.0);
        logger.metric(PYRAMID_LEVELS_METRIC, 9.0);
        logger.metric(FACES_METRIC, 1.0);
        logger.metric(FACES_METRIC, 3.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("Detection summary (2 images"));
        assert!(summary.contains("pyramid     : avg 8.0"));
        assert!(summary.contains("faces       : avg 2.0 per image  (4 total)"));
    }

    #[test]
    fn test_candidates_metric_names_follow_stage() {
        assert_eq!(candidates_metric(Stage::Proposal), "proposal_candidates");
        assert_eq!(candidates_metric(Stage::Output), "output_candidates");
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let logger = StdoutPipelineLogger::new(10);
        assert!(logger.summary_string().is_none());
    }

    #[test]
    fn test_progress_tracks_total() {
        let mut logger = StdoutPipelineLogger::new(3);
        for i in 1..=7 {
            logger.progress(i, 7);
        }
        assert_eq!(logger.total_images, 7);
    }

    #[test]
    fn test_info_stores_messages() {
        let mut logger = StdoutPipelineLogger::default();
        logger.info("2 faces in group.jpg");
        assert_eq!(logger.messages, vec!["2 faces in group.jpg".to_string()]);
        assert_eq!(logger.throttle_images, 10);
    }
}
