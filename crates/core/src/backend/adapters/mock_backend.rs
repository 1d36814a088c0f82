//! Scripted in-process backend.
//!
//! Used by tests and by `graphbuild run --dry-run` to exercise the engine
//! without a live server.

use crate::backend::base::{Backend, BackendError, CrawlOutcome, StepSuccess};
use async_trait::async_trait;
use gb_protocol::pipeline_models::StepName;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted behavior of one step.
#[derive(Debug, Clone, PartialEq)]
pub enum MockStep {
    Succeed {
        delay: Duration,
        execution_time: Option<f64>,
        results: Option<Value>,
    },
    Fail {
        delay: Duration,
        message: String,
    },
    /// Only meaningful for the crawl; any other step treats it as a failure.
    NoUrls,
}

impl MockStep {
    pub fn instant() -> Self {
        MockStep::Succeed {
            delay: Duration::ZERO,
            execution_time: None,
            results: None,
        }
    }

    /// Succeed after `secs` of (tokio) time, without reporting an execution time.
    pub fn after_secs(secs: u64) -> Self {
        MockStep::Succeed {
            delay: Duration::from_secs(secs),
            execution_time: None,
            results: None,
        }
    }

    /// Succeed immediately, reporting `secs` as the server-side execution time.
    pub fn reporting(secs: f64) -> Self {
        MockStep::Succeed {
            delay: Duration::ZERO,
            execution_time: Some(secs),
            results: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        MockStep::Fail {
            delay: Duration::ZERO,
            message: message.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct MockBackend {
    steps: HashMap<StepName, MockStep>,
    processing: Arc<Mutex<Vec<bool>>>,
    calls: Arc<Mutex<Vec<StepName>>>,
}

impl MockBackend {
    pub fn new(steps: HashMap<StepName, MockStep>) -> Self {
        Self {
            steps,
            processing: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every step succeeds immediately.
    pub fn success() -> Self {
        Self::new(HashMap::new())
    }

    /// Every step succeeds after a short pause and reports an execution
    /// time; the shape of a real build, scaled down.
    pub fn simulated() -> Self {
        let steps = StepName::ALL
            .into_iter()
            .map(|step| {
                let millis = 150 * (step.index() as u64 + 1);
                let behavior = MockStep::Succeed {
                    delay: Duration::from_millis(millis),
                    execution_time: Some(millis as f64 / 1000.0),
                    results: None,
                };
                (step, behavior)
            })
            .collect();
        Self::new(steps)
    }

    /// The crawl reports that the workspace has no URLs.
    pub fn without_urls() -> Self {
        Self::success().with_step(StepName::Crawling, MockStep::NoUrls)
    }

    /// Every step succeeds except `step`, which fails with `message`.
    pub fn failing_at(step: StepName, message: &str) -> Self {
        Self::success().with_step(step, MockStep::failing(message))
    }

    pub fn with_step(mut self, step: StepName, behavior: MockStep) -> Self {
        self.steps.insert(step, behavior);
        self
    }

    /// Script the answers of successive processing-status checks. Once the
    /// script is exhausted the backend reports idle.
    pub fn with_processing(self, answers: Vec<bool>) -> Self {
        if let Ok(mut processing) = self.processing.lock() {
            *processing = answers.into_iter().rev().collect();
        }
        self
    }

    /// Steps invoked so far, in call order.
    pub fn calls(&self) -> Vec<StepName> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, step: StepName) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(step);
        }
    }

    async fn play(&self, step: StepName) -> Result<StepSuccess, BackendError> {
        self.record(step);
        match self.steps.get(&step).cloned().unwrap_or_else(MockStep::instant) {
            MockStep::Succeed {
                delay,
                execution_time,
                results,
            } => {
                tokio::time::sleep(delay).await;
                Ok(StepSuccess::new(execution_time, results))
            }
            MockStep::Fail { delay, message } => {
                tokio::time::sleep(delay).await;
                Err(BackendError::StepFailed(message))
            }
            MockStep::NoUrls => Err(BackendError::StepFailed(format!(
                "{step} has nothing to process"
            ))),
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn crawl(&self, _workspace_id: &str) -> CrawlOutcome {
        if self.steps.get(&StepName::Crawling) == Some(&MockStep::NoUrls) {
            self.record(StepName::Crawling);
            return CrawlOutcome::NoUrlsToCrawl;
        }
        match self.play(StepName::Crawling).await {
            Ok(success) => CrawlOutcome::Success(success),
            Err(e) => CrawlOutcome::Failure(e),
        }
    }

    async fn run_step(
        &self,
        step: StepName,
        _workspace_id: &str,
    ) -> Result<StepSuccess, BackendError> {
        self.play(step).await
    }

    async fn processing_status(&self, _workspace_id: &str) -> Result<bool, BackendError> {
        let mut processing = self
            .processing
            .lock()
            .map_err(|_| BackendError::NotAvailable("mock state poisoned".to_string()))?;
        Ok(processing.pop().unwrap_or(false))
    }
}
