use std::path::PathBuf;
use std::sync::Arc;

use crate::detection::domain::face_annotation::FaceAnnotation;
use crate::pipeline::detect_image_use_case::DetectImageUseCase;
use crate::pipeline::pipeline_logger::PipelineLogger;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Builds one single-image pipeline per worker thread, each with its own
/// inference sessions.
pub type UseCaseFactory = Arc<dyn Fn() -> Result<DetectImageUseCase, SendError> + Send + Sync>;

/// One image to process and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Runs [`DetectImageUseCase`] over many files on a pool of worker threads.
///
/// Layout: `feeder → [worker × N] → main`
///
/// Results come back in job order, one `Result` per job, so a failing file
/// does not abort the batch.
pub struct BatchDetectUseCase {
    factory: UseCaseFactory,
    workers: usize,
    channel_capacity: usize,
}

/// What a worker sends back for one job.
enum Event {
    Timing(String, f64),
    Metric(String, f64),
    Done(usize, Result<Vec<FaceAnnotation>, SendError>),
}

impl BatchDetectUseCase {
    pub fn new(factory: UseCaseFactory, workers: usize) -> Self {
        Self {
            factory,
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    pub fn execute(
        &self,
        jobs: Vec<BatchJob>,
        logger: &mut dyn PipelineLogger,
    ) -> Vec<Result<Vec<FaceAnnotation>, SendError>> {
        let total = jobs.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.workers.min(total);
        logger.info(&format!("Processing {total} image(s) on {workers} worker(s)"));

        let (job_tx, job_rx) =
            crossbeam_channel::bounded::<(usize, BatchJob)>(self.channel_capacity);
        let (event_tx, event_rx) = crossbeam_channel::bounded::<Event>(self.channel_capacity);

        let feeder = std::thread::spawn(move || {
            for job in jobs.into_iter().enumerate() {
                if job_tx.send(job).is_err() {
                    break;
                }
            }
        });

        let handles: Vec<_> = (0..workers)
            .map(|_| spawn_worker(self.factory.clone(), job_rx.clone(), event_tx.clone()))
            .collect();
        drop(job_rx);
        drop(event_tx);

        let mut results: Vec<Option<Result<Vec<FaceAnnotation>, SendError>>> =
            (0..total).map(|_| None).collect();
        let mut done = 0;
        for event in event_rx {
            match event {
                Event::Timing(stage, ms) => logger.timing(&stage, ms),
                Event::Metric(name, value) => logger.metric(&name, value),
                Event::Done(index, result) => {
                    if let Err(e) = &result {
                        log::warn!("image {index} failed: {e}");
                    }
                    results[index] = Some(result);
                    done += 1;
                    logger.progress(done, total);
                }
            }
        }

        let _ = feeder.join();
        for handle in handles {
            if handle.join().is_err() {
                log::error!("Detection worker panicked");
            }
        }

        results
            .into_iter()
            .map(|slot| slot.unwrap_or_else(|| Err("worker exited before processing".into())))
            .collect()
    }
}

fn spawn_worker(
    factory: UseCaseFactory,
    job_rx: crossbeam_channel::Receiver<(usize, BatchJob)>,
    event_tx: crossbeam_channel::Sender<Event>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let use_case = match factory() {
            Ok(use_case) => use_case,
            Err(e) => {
                let message = e.to_string();
                for (index, _) in job_rx {
                    let failed = Event::Done(index, Err(message.clone().into()));
                    if event_tx.send(failed).is_err() {
                        break;
                    }
                }
                return;
            }
        };

        for (index, job) in job_rx {
            let mut forward = ForwardingLogger { tx: &event_tx };
            let result = use_case
                .execute(&job.input, &job.output, &mut forward)
                .map_err(|e| -> SendError { e.to_string().into() });
            if event_tx.send(Event::Done(index, result)).is_err() {
                break;
            }
        }
    })
}

/// Relays a worker's stage timings and metrics to the main thread.
struct ForwardingLogger<'a> {
    tx: &'a crossbeam_channel::Sender<Event>,
}

impl PipelineLogger for ForwardingLogger<'_> {
    fn progress(&mut self, _current: usize, _total: usize) {}

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        let _ = self.tx.send(Event::Timing(stage.to_string(), duration_ms));
    }

    fn metric(&mut self, name: &str, value: f64) {
        let _ = self.tx.send(Event::Metric(name.to_string(), value));
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }
}
