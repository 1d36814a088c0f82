//! Base Backend trait and supporting types.

use async_trait::async_trait;
use gb_protocol::pipeline_models::StepName;
use serde_json::Value;
use thiserror::Error;

/// Payload of a step the backend reported as successful.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepSuccess {
    /// Server-side execution time in seconds, when the backend reports one.
    pub execution_time: Option<f64>,

    /// Step-specific results (e.g. the structured documents).
    pub results: Option<Value>,
}

impl StepSuccess {
    pub fn new(execution_time: Option<f64>, results: Option<Value>) -> Self {
        Self {
            execution_time,
            results,
        }
    }
}

/// Result of the crawl step.
///
/// The crawl is the only step with a non-fatal failure: a workspace without
/// registered URLs sends the run straight to document structuring.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlOutcome {
    Success(StepSuccess),
    NoUrlsToCrawl,
    Failure(BackendError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend not available: {0}")]
    NotAvailable(String),
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
    #[error("{0}")]
    StepFailed(String),
}

/// The remote build backend.
///
/// Every method is one HTTP round trip in production; implementations must
/// not retry on their own.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Crawl the URLs registered for the workspace.
    async fn crawl(&self, workspace_id: &str) -> CrawlOutcome;

    /// Run any step after the crawl.
    async fn run_step(&self, step: StepName, workspace_id: &str)
        -> Result<StepSuccess, BackendError>;

    /// Whether the backend is still building the workspace.
    async fn processing_status(&self, workspace_id: &str) -> Result<bool, BackendError>;
}
