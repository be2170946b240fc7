use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info};

use crate::error::{BuildError, IngestError, WorkerError};
use crate::pipeline::{ChainOptions, InputKind, Pipeline, ProgressReporter, RunMode};
use crate::worker::job::{Job, Outcome, OutcomeStatus};

/// Maps a locator to the kind that decides its chain.
pub type KindResolver = dyn Fn(&str) -> Result<InputKind, BuildError> + Send + Sync;

/// Runs a batch of inputs through the pipeline on a fixed number of threads.
///
/// Every submitted input produces exactly one [`Outcome`], whatever happens
/// to the others. Only problems that would fail every input (an unknown step
/// in the chain configuration, a worker that cannot be started) abort the
/// batch.
pub struct Dispatcher {
    pipeline: Arc<Pipeline>,
    workers: usize,
}

impl Dispatcher {
    pub fn new(pipeline: Arc<Pipeline>, workers: usize) -> Result<Self, WorkerError> {
        if workers == 0 {
            return Err(WorkerError::NoWorkers);
        }
        Ok(Self { pipeline, workers })
    }

    /// Sized by `max_parallel_processes` from the pipeline configuration.
    pub fn from_pipeline(pipeline: Arc<Pipeline>) -> Result<Self, WorkerError> {
        let workers = pipeline.config().max_parallel_processes;
        Self::new(pipeline, workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Processes `inputs` and returns their outcomes in completion order.
    ///
    /// Each outcome carries the index of its input, so callers that want
    /// submission order can sort on it.
    pub fn run_all(
        &self,
        inputs: &[String],
        resolver: &KindResolver,
        options: &ChainOptions,
        mode: RunMode,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<Outcome>, IngestError> {
        self.pipeline.validate(options, mode)?;

        if inputs.is_empty() {
            info!("Nothing to process");
            return Ok(Vec::new());
        }

        let (job_sender, job_receiver) = unbounded::<Job>();
        for (index, input) in inputs.iter().enumerate() {
            job_sender
                .send(Job::new(index, input.clone()))
                .map_err(|_| WorkerError::ChannelClosed)?;
        }
        // Workers stop once the queue drains.
        drop(job_sender);

        let (result_sender, result_receiver) = unbounded::<Outcome>();
        let worker_count = self.workers.min(inputs.len());
        info!(
            "Processing {} inputs with {} workers",
            inputs.len(),
            worker_count
        );

        thread::scope(|scope| -> Result<Vec<Outcome>, IngestError> {
            for worker_id in 0..worker_count {
                let job_rx = job_receiver.clone();
                let result_tx = result_sender.clone();
                let pipeline = Arc::clone(&self.pipeline);

                thread::Builder::new()
                    .name(format!("ingest-worker-{}", worker_id))
                    .spawn_scoped(scope, move || {
                        run_worker(
                            worker_id, &pipeline, job_rx, result_tx, resolver, options, mode,
                            progress,
                        )
                    })
                    .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;
            }
            drop(result_sender);

            collect(&result_receiver, inputs.len())
        })
    }
}

fn collect(results: &Receiver<Outcome>, expected: usize) -> Result<Vec<Outcome>, IngestError> {
    let mut outcomes = Vec::with_capacity(expected);
    while outcomes.len() < expected {
        let outcome = results.recv().map_err(|_| WorkerError::ChannelClosed)?;
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    info!(
        "Finished {} inputs ({} succeeded, {} failed)",
        outcomes.len(),
        outcomes.len() - failed,
        failed
    );
    Ok(outcomes)
}

#[allow(clippy::too_many_arguments)]
fn run_worker(
    worker_id: usize,
    pipeline: &Pipeline,
    job_receiver: Receiver<Job>,
    result_sender: Sender<Outcome>,
    resolver: &KindResolver,
    options: &ChainOptions,
    mode: RunMode,
    progress: &dyn ProgressReporter,
) {
    debug!("Worker {} started", worker_id);

    for job in job_receiver.iter() {
        debug!("Worker {} processing input {}", worker_id, job.index);
        let started = Instant::now();

        let (kind, status) = match catch_unwind(AssertUnwindSafe(|| {
            process_job(pipeline, &job, resolver, options, mode, progress)
        })) {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Worker {} panicked on input {}: {}", worker_id, job.index, message);
                let err = IngestError::Worker(WorkerError::Panicked(message));
                (None, OutcomeStatus::failed(&err))
            }
        };

        let outcome = Outcome {
            index: job.index,
            input: job.input,
            kind,
            duration_ms: started.elapsed().as_millis() as u64,
            status,
        };

        if let Err(e) = result_sender.send(outcome) {
            error!("Worker {} failed to send result: {}", worker_id, e);
            break;
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn process_job(
    pipeline: &Pipeline,
    job: &Job,
    resolver: &KindResolver,
    options: &ChainOptions,
    mode: RunMode,
    progress: &dyn ProgressReporter,
) -> (Option<InputKind>, OutcomeStatus) {
    let kind = match resolver(&job.input) {
        Ok(kind) => kind,
        Err(e) => {
            error!("Cannot classify input {}: {}", job.index, e);
            return (None, OutcomeStatus::failed(&e.into()));
        }
    };

    let status = match mode {
        RunMode::Process => pipeline
            .process(&job.input, kind, options, progress)
            .map(OutcomeStatus::processed),
        RunMode::Catalog => pipeline
            .catalog(&job.input, kind, options, progress)
            .map(OutcomeStatus::catalogued),
    };

    match status {
        Ok(status) => (Some(kind), status),
        Err(e) => {
            error!("Input {} failed: {}", job.index, e);
            (Some(kind), OutcomeStatus::failed(&e))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
