//! Pipeline execution engine.
//!
//! The PipelineEngine runs the fixed build steps for a workspace one after
//! another against a [`Backend`], reporting progress as [`Event`]s and to
//! the registered [`StepObserver`]s.

pub mod observer;

use crate::backend::{Backend, CrawlOutcome, StepSuccess};
use crate::state::run::{
    complete_run, create_run, enter_step, fail_run, log_to_run, record_step, skip_step,
    start_run,
};
use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::{
    FailedStage, PipelineBranch, PipelineFailure, PipelineOutcome, PipelineReport, StepName,
    StepReport,
};
use gb_protocol::run_models::PipelineRun;
use observer::StepObserver;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Sender};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, instrument, warn};

pub use observer::{ObserverError, ProgressRecorder};

/// Capacity of the channel behind [`PipelineEngine::run_stream`].
pub const EVENT_BUFFER: usize = 100;

/// The main pipeline execution engine.
///
/// Steps run strictly in sequence with no retries. The only non-fatal
/// failure is a crawl that reports no URLs, which sends the run straight to
/// document structuring.
pub struct PipelineEngine {
    backend: Arc<dyn Backend>,
    observers: Vec<Arc<dyn StepObserver>>,
}

impl PipelineEngine {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            observers: Vec::new(),
        }
    }

    /// Register an observer called after every completed step.
    pub fn with_observer(mut self, observer: Arc<dyn StepObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build a workspace and return the outcome.
    ///
    /// Events are sent on `events_tx` as the run progresses; a dropped
    /// receiver does not stop the run. An empty `workspace_id` fails at
    /// [`FailedStage::Precondition`] without touching the backend.
    #[instrument(skip(self, events_tx))]
    pub async fn run(&self, workspace_id: &str, events_tx: Sender<Event>) -> PipelineOutcome {
        let mut run = create_run(workspace_id);
        self.execute(&mut run, &events_tx).await
    }

    /// Run the pipeline in a background task, yielding its events.
    ///
    /// The stream ends after the terminal `pipelineCompleted` or
    /// `pipelineFailed` event.
    pub fn run_stream(self: Arc<Self>, workspace_id: impl Into<String>) -> ReceiverStream<Event> {
        let workspace_id = workspace_id.into();
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(async move {
            self.run(&workspace_id, tx).await;
        });
        ReceiverStream::new(rx)
    }

    /// Drive an already created run to completion.
    ///
    /// `run` is updated in place, so callers that need the final run state
    /// keep it after this returns.
    pub async fn execute(
        &self,
        run: &mut PipelineRun,
        events_tx: &Sender<Event>,
    ) -> PipelineOutcome {
        let started = Instant::now();
        let mut steps: Vec<StepReport> = Vec::new();

        start_run(run, events_tx).await;

        if run.workspace_id.trim().is_empty() {
            return self
                .fail(
                    run,
                    events_tx,
                    FailedStage::Precondition,
                    "workspace id is required".to_string(),
                    steps,
                )
                .await;
        }
        let workspace_id = run.workspace_id.clone();
        info!(workspace_id = %workspace_id, run_id = %run.id, "pipeline started");

        // Crawl
        if let Err(e) = enter_step(run, events_tx, StepName::Crawling).await {
            return self
                .fail(run, events_tx, StepName::Crawling.into(), e.to_string(), steps)
                .await;
        }
        let step_started = Instant::now();
        match self.backend.crawl(&workspace_id).await {
            CrawlOutcome::Success(success) => {
                self.finish_step(
                    run,
                    events_tx,
                    &mut steps,
                    StepName::Crawling,
                    success,
                    step_started,
                )
                .await;
            }
            CrawlOutcome::NoUrlsToCrawl => {
                info!(workspace_id = %workspace_id, "no URLs to crawl, building from documents only");
                log_to_run(
                    run,
                    events_tx,
                    "No URLs to crawl; continuing with document structuring".to_string(),
                )
                .await;
                for step in PipelineBranch::DocumentsOnly.skipped_steps() {
                    skip_step(run, events_tx, *step).await;
                }
            }
            CrawlOutcome::Failure(e) => {
                return self
                    .fail(run, events_tx, StepName::Crawling.into(), e.to_string(), steps)
                    .await;
            }
        }

        // Everything after the crawl on the branch taken
        let remaining: Vec<StepName> = run
            .branch
            .required_steps()
            .iter()
            .copied()
            .filter(|step| *step != StepName::Crawling)
            .collect();

        for step in remaining {
            if let Err(e) = enter_step(run, events_tx, step).await {
                return self.fail(run, events_tx, step.into(), e.to_string(), steps).await;
            }
            let step_started = Instant::now();
            match self.backend.run_step(step, &workspace_id).await {
                Ok(success) => {
                    self.finish_step(run, events_tx, &mut steps, step, success, step_started)
                        .await;
                }
                Err(e) => {
                    return self.fail(run, events_tx, step.into(), e.to_string(), steps).await;
                }
            }
        }

        let total_secs = started.elapsed().as_secs_f64();
        log_to_run(
            run,
            events_tx,
            format!("Pipeline completed in {total_secs:.1}s"),
        )
        .await;
        complete_run(run, events_tx, total_secs).await;
        info!(workspace_id = %workspace_id, total_secs, "pipeline completed");

        PipelineOutcome::Completed(PipelineReport {
            run_id: run.id,
            workspace_id,
            branch: run.branch,
            durations: run.durations,
            steps,
            total_secs,
        })
    }

    /// Record a successful step and notify observers.
    async fn finish_step(
        &self,
        run: &mut PipelineRun,
        events_tx: &Sender<Event>,
        steps: &mut Vec<StepReport>,
        step: StepName,
        success: StepSuccess,
        step_started: Instant,
    ) {
        let duration_secs = success
            .execution_time
            .unwrap_or_else(|| step_started.elapsed().as_secs_f64());

        record_step(run, events_tx, step, duration_secs).await;
        log_to_run(
            run,
            events_tx,
            format!("{} finished in {duration_secs:.1}s", step.label()),
        )
        .await;
        info!(%step, duration_secs, "step completed");

        for observer in &self.observers {
            if let Err(e) = observer
                .on_step_complete(&run.workspace_id, step, duration_secs)
                .await
            {
                warn!(%step, error = %e, "step observer failed");
                log_to_run(
                    run,
                    events_tx,
                    format!("Progress callback failed after {step}: {e}"),
                )
                .await;
            }
        }

        steps.push(StepReport {
            step,
            duration_secs,
            results: success.results,
        });
    }

    async fn fail(
        &self,
        run: &mut PipelineRun,
        events_tx: &Sender<Event>,
        failed_stage: FailedStage,
        message: String,
        steps: Vec<StepReport>,
    ) -> PipelineOutcome {
        warn!(workspace_id = %run.workspace_id, %failed_stage, error = %message, "pipeline failed");
        log_to_run(
            run,
            events_tx,
            format!("Pipeline failed at {failed_stage}: {message}"),
        )
        .await;
        fail_run(run, events_tx, failed_stage, message.clone()).await;

        PipelineOutcome::Failed(PipelineFailure {
            run_id: run.id,
            workspace_id: run.workspace_id.clone(),
            failed_stage,
            message,
            durations: run.durations,
            steps,
        })
    }
}
