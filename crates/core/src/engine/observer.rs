//! Step-complete observers.
//!
//! Observers are awaited inline after every completed step. A failing
//! observer is logged by the engine and never changes the run's outcome.

use crate::store::{ProgressStore, StoreError};
use async_trait::async_trait;
use gb_protocol::pipeline_models::{StepDurations, StepName};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ObserverError {
    #[error("Failed to persist step progress: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait StepObserver: Send + Sync {
    /// Called once per completed step, in execution order.
    async fn on_step_complete(
        &self,
        workspace_id: &str,
        step: StepName,
        duration_secs: f64,
    ) -> Result<(), ObserverError>;
}

/// Writes each completed step's duration to a [`ProgressStore`].
pub struct ProgressRecorder {
    store: Arc<dyn ProgressStore>,
}

impl ProgressRecorder {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StepObserver for ProgressRecorder {
    async fn on_step_complete(
        &self,
        workspace_id: &str,
        step: StepName,
        duration_secs: f64,
    ) -> Result<(), ObserverError> {
        let mut times = StepDurations::default();
        times.set(step, Some(duration_secs));
        self.store.merge_step_times(workspace_id, &times).await?;
        Ok(())
    }
}
