//! Global configuration models for `.graphbuild/config.toml`.
//!
//! This module defines the structure of the configuration file that points
//! graphbuild at its backend and tunes status polling.

use crate::pipeline_models::StepName;
use serde::Deserialize;
use serde::Serialize;
use ts_rs::TS;

/// Represents global settings from `.graphbuild/config.toml`.
///
/// Every section is optional; missing values fall back to defaults.
///
/// # Example
///
/// ```toml
/// # .graphbuild/config.toml
/// [backend]
/// base-url = "http://localhost:5000"
/// request-timeout-secs = 600
///
/// [backend.endpoints]
/// crawl = "/api/crawl"
///
/// [status]
/// poll-interval-secs = 5
/// max-polls = 120
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct GlobalConfig {
    pub backend: BackendConfig,
    pub status: StatusConfig,
}

/// Location of the build backend.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct BackendConfig {
    /// Base URL every endpoint path is appended to.
    pub base_url: String,

    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout_secs: Option<u64>,

    pub endpoints: EndpointConfig,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            request_timeout_secs: None,
            endpoints: EndpointConfig::default(),
        }
    }
}

/// Endpoint paths of the backend, relative to `base-url`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct EndpointConfig {
    pub crawl: String,
    pub structure_web: String,
    pub clean_lines: String,
    pub structure_documents: String,
    pub apply: String,
    pub update: String,
    pub processing_status: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            crawl: "/api/crawl".to_string(),
            structure_web: "/api/structure-web".to_string(),
            clean_lines: "/api/clean-lines".to_string(),
            structure_documents: "/api/structure-documents".to_string(),
            apply: "/api/apply".to_string(),
            update: "/api/update".to_string(),
            processing_status: "/api/processing-status".to_string(),
        }
    }
}

impl EndpointConfig {
    /// Endpoint path for a build step.
    pub fn for_step(&self, step: StepName) -> &str {
        match step {
            StepName::Crawling => &self.crawl,
            StepName::Structuring => &self.structure_web,
            StepName::Line1 => &self.clean_lines,
            StepName::Document => &self.structure_documents,
            StepName::Indexing => &self.apply,
            StepName::Update => &self.update,
        }
    }
}

/// Polling of the backend's processing status when resuming.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(default, rename_all = "kebab-case")]
pub struct StatusConfig {
    pub poll_interval_secs: u64,
    pub max_polls: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            max_polls: 120,
        }
    }
}
