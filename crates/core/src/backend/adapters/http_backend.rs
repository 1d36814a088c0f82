//! HTTP adapter for the build backend.
//!
//! Every step is `POST <base-url><endpoint>` with `{"page_id": ...}` and
//! answers with a [`StepResponse`] body.

use crate::backend::base::{Backend, BackendError, CrawlOutcome, StepSuccess};
use async_trait::async_trait;
use gb_protocol::config_models::{BackendConfig, EndpointConfig};
use gb_protocol::pipeline_models::{ProcessingStatus, StepName, StepRequest, StepResponse};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, instrument};

/// Error code a backend sends when the workspace has no URLs to crawl.
pub const NO_URLS_ERROR_CODE: &str = "no_urls";

/// Message older backends send for the same condition ("no URLs to crawl").
///
/// Only consulted when no `error_code` is present.
pub const NO_URLS_MESSAGE: &str = "크롤링할 URL이 없습니다";

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("graphbuild/", env!("CARGO_PKG_VERSION"));

/// Longest response excerpt quoted in error messages.
const MAX_BODY_EXCERPT: usize = 200;

pub struct HttpBackend {
    client: Client,
    base_url: String,
    endpoints: EndpointConfig,
}

impl HttpBackend {
    /// Build an adapter from the `[backend]` configuration section.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut builder = Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| {
            BackendError::NotAvailable(format!("failed to build HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            endpoints: config.endpoints.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_step(
        &self,
        step: StepName,
        workspace_id: &str,
    ) -> Result<StepResponse, BackendError> {
        let endpoint = self.url(self.endpoints.for_step(step));
        let request = StepRequest {
            page_id: workspace_id.to_string(),
        };

        let response = self
            .client
            .post(&endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| BackendError::Transport {
            endpoint: endpoint.clone(),
            message: format!("failed to read body: {e}"),
        })?;
        debug!(%endpoint, %status, "backend responded");

        parse_step_response(&endpoint, status, &body)
    }
}

/// Decode a step response body.
///
/// A non-2xx status with a readable body is judged by the body; a readable
/// body that claims success under an error status is still a failure.
fn parse_step_response(
    endpoint: &str,
    status: StatusCode,
    body: &str,
) -> Result<StepResponse, BackendError> {
    match serde_json::from_str::<StepResponse>(body) {
        Ok(mut parsed) => {
            if !status.is_success() && parsed.success {
                parsed.success = false;
                parsed.error = Some(format!("HTTP {status}"));
            }
            Ok(parsed)
        }
        Err(_) if !status.is_success() => Err(BackendError::StepFailed(format!(
            "HTTP {status}: {}",
            excerpt(body)
        ))),
        Err(e) => Err(BackendError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        }),
    }
}

fn excerpt(body: &str) -> &str {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => &trimmed[..idx],
        None => trimmed,
    }
}

/// True when a failed crawl response means "nothing to crawl".
fn is_no_urls(response: &StepResponse) -> bool {
    match response.error_code.as_deref() {
        Some(code) => code == NO_URLS_ERROR_CODE,
        None => response
            .error
            .as_deref()
            .is_some_and(|message| message.contains(NO_URLS_MESSAGE)),
    }
}

fn into_success(response: StepResponse) -> Result<StepSuccess, BackendError> {
    if response.success {
        Ok(StepSuccess::new(response.execution_time, response.results))
    } else {
        Err(BackendError::StepFailed(
            response
                .error
                .unwrap_or_else(|| "backend reported failure without a message".to_string()),
        ))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self))]
    async fn crawl(&self, workspace_id: &str) -> CrawlOutcome {
        match self.post_step(StepName::Crawling, workspace_id).await {
            Ok(response) if !response.success && is_no_urls(&response) => {
                CrawlOutcome::NoUrlsToCrawl
            }
            Ok(response) => match into_success(response) {
                Ok(success) => CrawlOutcome::Success(success),
                Err(e) => CrawlOutcome::Failure(e),
            },
            Err(e) => CrawlOutcome::Failure(e),
        }
    }

    #[instrument(skip(self))]
    async fn run_step(
        &self,
        step: StepName,
        workspace_id: &str,
    ) -> Result<StepSuccess, BackendError> {
        into_success(self.post_step(step, workspace_id).await?)
    }

    async fn processing_status(&self, workspace_id: &str) -> Result<bool, BackendError> {
        let endpoint = self.url(&self.endpoints.processing_status);
        let response = self
            .client
            .get(&endpoint)
            .query(&[("page_id", workspace_id)])
            .send()
            .await
            .map_err(|e| BackendError::Transport {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Transport {
                endpoint,
                message: format!("HTTP {status}"),
            });
        }

        let parsed: ProcessingStatus =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                })?;
        Ok(parsed.processing)
    }
}
