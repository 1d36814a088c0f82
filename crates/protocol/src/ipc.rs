//! Progress events protocol.
//!
//! This module defines the events the core emits while a pipeline runs.
//! Callers (the CLI, or the web admin UI through the generated TypeScript
//! bindings) consume them to render per-step progress.
//!
//! Communication is asynchronous and channel-based: the engine never waits
//! on a slow consumer beyond the channel's capacity, and a dropped receiver
//! does not stop the run.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::pipeline_models::{FailedStage, PipelineBranch, StepName};
use crate::run_models::RunStatus;

/// Events sent from the core to whoever drives the run.
///
/// Uses tagged enum serialization for TypeScript compatibility:
/// ```json
/// {
///   "type": "stepCompleted",
///   "payload": {
///     "run_id": "uuid-here",
///     "step": "crawling",
///     "duration_secs": 5.0
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Event {
    /// A new run has been created for a workspace.
    PipelineStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        workspace_id: String,
    },

    /// The run's status or current step has changed.
    RunStatusUpdate {
        #[ts(type = "string")]
        run_id: Uuid,
        status: RunStatus,
        step: Option<StepName>,
    },

    /// A step request is about to be issued.
    StepStarted {
        #[ts(type = "string")]
        run_id: Uuid,
        step: StepName,
    },

    /// A step finished successfully.
    StepCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
        step: StepName,
        duration_secs: f64,
    },

    /// A step was skipped because of the branch taken.
    StepSkipped {
        #[ts(type = "string")]
        run_id: Uuid,
        step: StepName,
        branch: PipelineBranch,
    },

    /// The run produced a log line.
    RunLogChunk {
        #[ts(type = "string")]
        run_id: Uuid,
        content: String,
    },

    /// Every step of the branch finished.
    PipelineCompleted {
        #[ts(type = "string")]
        run_id: Uuid,
        total_secs: f64,
    },

    /// The run stopped on a failure.
    PipelineFailed {
        #[ts(type = "string")]
        run_id: Uuid,
        #[ts(type = "string")]
        failed_stage: FailedStage,
        error: String,
    },
}

impl Event {
    /// The run this event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::PipelineStarted { run_id, .. }
            | Event::RunStatusUpdate { run_id, .. }
            | Event::StepStarted { run_id, .. }
            | Event::StepCompleted { run_id, .. }
            | Event::StepSkipped { run_id, .. }
            | Event::RunLogChunk { run_id, .. }
            | Event::PipelineCompleted { run_id, .. }
            | Event::PipelineFailed { run_id, .. } => *run_id,
        }
    }

    /// True for the last event of a run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Event::PipelineCompleted { .. } | Event::PipelineFailed { .. }
        )
    }
}
