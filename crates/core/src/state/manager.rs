//! Run manager for coordinating pipeline runs across workspaces.
//!
//! The RunManager starts runs in the background, keeps the latest run of
//! every workspace, and refuses to start a second run for a workspace while
//! one is still active.

use crate::engine::{PipelineEngine, EVENT_BUFFER};
use crate::state::error::RunError;
use crate::state::run::{apply_event, create_run};
use anyhow::Result;
use gb_protocol::ipc::Event;
use gb_protocol::pipeline_models::PipelineOutcome;
use gb_protocol::run_models::PipelineRun;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;

/// A run started by [`RunManager::start_pipeline`].
pub struct RunHandle {
    pub run_id: Uuid,
    pub workspace_id: String,
    task: JoinHandle<PipelineOutcome>,
}

impl RunHandle {
    /// Wait for the run to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the run's task panicked or was aborted.
    pub async fn wait(self) -> Result<PipelineOutcome> {
        Ok(self.task.await?)
    }
}

/// Manages pipeline runs for all workspaces.
pub struct RunManager {
    /// Latest run per workspace id.
    ///
    /// Each entry is kept current from the run's events while it executes
    /// and replaced by the engine's final state when it ends.
    runs: Arc<Mutex<HashMap<String, Arc<Mutex<PipelineRun>>>>>,

    engine: Arc<PipelineEngine>,

    /// Channel every run's events are forwarded to.
    events_tx: mpsc::Sender<Event>,
}

impl RunManager {
    pub fn new(engine: Arc<PipelineEngine>, events_tx: mpsc::Sender<Event>) -> Self {
        Self {
            runs: Arc::new(Mutex::new(HashMap::new())),
            engine,
            events_tx,
        }
    }

    /// Start building a workspace in the background.
    ///
    /// # Errors
    ///
    /// Returns [`RunError::AlreadyRunning`] if the workspace has a run that
    /// has not finished yet.
    pub async fn start_pipeline(&self, workspace_id: &str) -> Result<RunHandle> {
        let mut runs = self.runs.lock().await;
        if let Some(existing) = runs.get(workspace_id) {
            if !existing.lock().await.status.is_terminal() {
                return Err(RunError::AlreadyRunning(workspace_id.to_string()).into());
            }
        }

        let run = create_run(workspace_id);
        let run_id = run.id;
        let shared = Arc::new(Mutex::new(run.clone()));
        runs.insert(workspace_id.to_string(), Arc::clone(&shared));
        drop(runs);

        // Mirror events onto the stored run before forwarding them
        let (run_tx, mut run_rx) = mpsc::channel::<Event>(EVENT_BUFFER);
        let mirror = {
            let shared = Arc::clone(&shared);
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                while let Some(event) = run_rx.recv().await {
                    apply_event(&mut *shared.lock().await, &event);
                    let _ = events_tx.send(event).await;
                }
            })
        };

        let engine = Arc::clone(&self.engine);
        let task = tokio::spawn(async move {
            let mut run = run;
            let outcome = engine.execute(&mut run, &run_tx).await;
            drop(run_tx);
            let _ = mirror.await;
            *shared.lock().await = run;
            outcome
        });

        info!(workspace_id, %run_id, "pipeline run started");
        Ok(RunHandle {
            run_id,
            workspace_id: workspace_id.to_string(),
            task,
        })
    }

    /// The latest run of a workspace, if it was ever started.
    pub async fn get_run(&self, workspace_id: &str) -> Option<PipelineRun> {
        let runs = self.runs.lock().await;
        match runs.get(workspace_id) {
            Some(run) => Some(run.lock().await.clone()),
            None => None,
        }
    }

    /// Runs that have not reached a terminal status.
    pub async fn active_runs(&self) -> Vec<PipelineRun> {
        let runs = self.runs.lock().await;
        let mut result = Vec::new();

        for run in runs.values() {
            let run = run.lock().await;
            if !run.status.is_terminal() {
                result.push(run.clone());
            }
        }

        result
    }

    pub async fn is_running(&self, workspace_id: &str) -> bool {
        let runs = self.runs.lock().await;
        match runs.get(workspace_id) {
            Some(run) => !run.lock().await.status.is_terminal(),
            None => false,
        }
    }

    /// Number of workspaces with a recorded run.
    pub async fn run_count(&self) -> usize {
        self.runs.lock().await.len()
    }
}
