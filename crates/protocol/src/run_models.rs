//! Runtime run state models.
//!
//! This module defines the structures for tracking the state of a pipeline
//! run for one workspace.

use crate::pipeline_models::{PipelineBranch, StepDurations, StepName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Lifecycle status of a pipeline run.
///
/// Idle -> Running -> Completed | Failed
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    /// Created, no step issued yet.
    Idle,

    /// A step is in flight.
    Running,

    /// Every step of the taken branch finished.
    Completed,

    /// A step (or the precondition check) failed.
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }
}

/// Runtime state of a single pipeline run.
///
/// Each time a workspace is built a new run is created with a unique ID.
#[derive(Serialize, Deserialize, Debug, Clone, TS)]
pub struct PipelineRun {
    /// Unique identifier for this run.
    #[ts(type = "string")]
    pub id: Uuid,

    /// Workspace the run builds.
    pub workspace_id: String,

    /// Current execution status.
    pub status: RunStatus,

    /// Branch taken after the crawl step.
    pub branch: PipelineBranch,

    /// Step currently executing, or the last step entered.
    ///
    /// Only ever moves forward through [`StepName::ALL`].
    pub current_step: Option<StepName>,

    /// Durations of the steps completed so far.
    pub durations: StepDurations,

    pub started_at: Option<DateTime<Utc>>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Accumulated log messages from this run.
    pub logs: Vec<String>,
}

impl PipelineRun {
    /// True while a step is in flight.
    pub fn is_active(&self) -> bool {
        self.status == RunStatus::Running
    }

    /// True when every step of the taken branch has a duration.
    pub fn is_complete(&self) -> bool {
        self.durations.is_complete_for(self.branch)
    }
}
