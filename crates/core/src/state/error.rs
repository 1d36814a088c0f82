//! Errors raised while driving or inspecting pipeline runs.

use crate::backend::BackendError;
use crate::store::StoreError;
use gb_protocol::pipeline_models::StepName;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    /// The step pointer only moves forward through the fixed order.
    #[error("Cannot enter step {requested}: run is already at {current}")]
    StepRegression {
        current: StepName,
        requested: StepName,
    },

    #[error("A pipeline run is already active for workspace {0}")]
    AlreadyRunning(String),

    #[error("Workspace {workspace_id} still processing after {polls} status checks")]
    StillProcessing { workspace_id: String, polls: u32 },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
