//! Mock observers and stores for deterministic testing.

use async_trait::async_trait;
use gb_core::engine::observer::{ObserverError, StepObserver};
use gb_core::store::{ProgressRecord, ProgressStore, StoreError, StoreResult};
use gb_protocol::pipeline_models::{StepDurations, StepName};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Records every callback it receives.
#[derive(Default, Clone)]
pub struct RecordingObserver {
    pub calls: Arc<Mutex<Vec<(String, StepName, f64)>>>,
}

#[allow(dead_code)]
impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn steps(&self) -> Vec<StepName> {
        self.calls.lock().await.iter().map(|(_, step, _)| *step).collect()
    }
}

#[async_trait]
impl StepObserver for RecordingObserver {
    async fn on_step_complete(
        &self,
        workspace_id: &str,
        step: StepName,
        duration_secs: f64,
    ) -> Result<(), ObserverError> {
        self.calls
            .lock()
            .await
            .push((workspace_id.to_string(), step, duration_secs));
        Ok(())
    }
}

/// An observer that fails every time it is called.
#[allow(dead_code)]
pub struct FailingObserver {
    pub message: String,
}

#[allow(dead_code)]
impl FailingObserver {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl StepObserver for FailingObserver {
    async fn on_step_complete(
        &self,
        _workspace_id: &str,
        _step: StepName,
        _duration_secs: f64,
    ) -> Result<(), ObserverError> {
        Err(ObserverError::Other(self.message.clone()))
    }
}

/// A progress store whose writes are always refused.
#[allow(dead_code)]
pub struct UnavailableProgressStore;

#[async_trait]
impl ProgressStore for UnavailableProgressStore {
    async fn merge_step_times(
        &self,
        _workspace_id: &str,
        _times: &StepDurations,
    ) -> StoreResult<ProgressRecord> {
        Err(StoreError::Unavailable("progress database offline".to_string()))
    }

    async fn load(&self, _workspace_id: &str) -> StoreResult<Option<ProgressRecord>> {
        Ok(None)
    }

    async fn clear(&self, _workspace_id: &str) -> StoreResult<()> {
        Ok(())
    }
}
