//! Restoring progress after a restart.
//!
//! A caller that lost its in-memory run (page reload, CLI restart) combines
//! the persisted step times with the backend's processing flag to show how
//! far the last build got.

use crate::backend::Backend;
use crate::state::error::RunError;
use crate::store::ProgressStore;
use gb_protocol::pipeline_models::{StepDurations, StepName};
use std::time::Duration;
use tracing::debug;

/// Progress of a workspace as seen after a restart.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredProgress {
    /// Whether the backend is still building the workspace.
    pub processing: bool,

    /// Persisted durations of the steps completed so far.
    pub durations: StepDurations,

    pub last_completed: Option<StepName>,

    /// The step presumably in flight. Only set while the backend is
    /// processing.
    pub next_step: Option<StepName>,
}

/// Read back the stored progress and the backend's processing flag.
pub async fn restore_progress(
    backend: &dyn Backend,
    store: &dyn ProgressStore,
    workspace_id: &str,
) -> Result<RestoredProgress, RunError> {
    let processing = backend.processing_status(workspace_id).await?;
    let durations = store
        .load(workspace_id)
        .await?
        .map(|record| record.step_execution_times)
        .unwrap_or_default();
    let last_completed = durations.last_completed();

    let next_step = if processing {
        match last_completed {
            Some(step) => step.next(),
            None => Some(StepName::Crawling),
        }
    } else {
        None
    };

    debug!(workspace_id, processing, ?last_completed, ?next_step, "progress restored");
    Ok(RestoredProgress {
        processing,
        durations,
        last_completed,
        next_step,
    })
}

/// Poll the backend until it reports the workspace idle.
///
/// Returns the number of status checks made.
///
/// # Errors
///
/// [`RunError::StillProcessing`] once `max_polls` checks all reported
/// processing; backend errors are returned as they occur.
pub async fn wait_until_idle(
    backend: &dyn Backend,
    workspace_id: &str,
    interval: Duration,
    max_polls: u32,
) -> Result<u32, RunError> {
    for poll in 1..=max_polls {
        if !backend.processing_status(workspace_id).await? {
            return Ok(poll);
        }
        debug!(workspace_id, poll, "workspace still processing");
        if poll < max_polls {
            tokio::time::sleep(interval).await;
        }
    }

    Err(RunError::StillProcessing {
        workspace_id: workspace_id.to_string(),
        polls: max_polls,
    })
}
