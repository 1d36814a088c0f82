//! Pipeline step models.
//!
//! This module defines the fixed build steps a workspace goes through, the
//! wire format of a single backend step call, and the structured outcome of
//! a whole pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

/// One of the fixed remote build steps, in execution order.
///
/// The derived `Ord` follows declaration order, which is the order in which
/// the engine runs the steps.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TS)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    /// Crawl the URLs registered for the workspace.
    Crawling,
    /// Structure the crawled web pages.
    Structuring,
    /// Line-level cleanup of the structured web text.
    Line1,
    /// Structure uploaded documents (and the cleaned web text).
    Document,
    /// Apply the structured corpus and build the index.
    Indexing,
    /// Incremental update of the knowledge graph.
    Update,
}

impl StepName {
    /// All steps in execution order.
    pub const ALL: [StepName; 6] = [
        StepName::Crawling,
        StepName::Structuring,
        StepName::Line1,
        StepName::Document,
        StepName::Indexing,
        StepName::Update,
    ];

    /// Wire name of the step (`crawling`, `line1`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Crawling => "crawling",
            StepName::Structuring => "structuring",
            StepName::Line1 => "line1",
            StepName::Document => "document",
            StepName::Indexing => "indexing",
            StepName::Update => "update",
        }
    }

    /// Human-readable label used in logs and progress output.
    pub fn label(&self) -> &'static str {
        match self {
            StepName::Crawling => "URL crawl",
            StepName::Structuring => "web structuring",
            StepName::Line1 => "text cleanup",
            StepName::Document => "document structuring",
            StepName::Indexing => "apply / index",
            StepName::Update => "incremental update",
        }
    }

    /// Zero-based position in [`StepName::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The step that follows this one in the full order, if any.
    pub fn next(&self) -> Option<StepName> {
        Self::ALL.get(self.index() + 1).copied()
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepName::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| format!("unknown step: {s}"))
    }
}

const WEB_STEPS: [StepName; 3] = [StepName::Crawling, StepName::Structuring, StepName::Line1];
const DOCUMENTS_ONLY_STEPS: [StepName; 3] =
    [StepName::Document, StepName::Indexing, StepName::Update];

/// Which path through the step list a run took.
///
/// The fork happens right after the crawl step and depends only on whether
/// the backend reported that the workspace has no URLs to crawl.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
pub enum PipelineBranch {
    /// Every step runs: crawl, structuring, line cleanup, document, index, update.
    #[default]
    Full,
    /// No URLs to crawl: document structuring, index and update only.
    DocumentsOnly,
}

impl PipelineBranch {
    /// Steps that must carry a duration for a run on this branch to be complete.
    pub fn required_steps(&self) -> &'static [StepName] {
        match self {
            PipelineBranch::Full => &StepName::ALL,
            PipelineBranch::DocumentsOnly => &DOCUMENTS_ONLY_STEPS,
        }
    }

    /// Steps that are skipped on this branch.
    pub fn skipped_steps(&self) -> &'static [StepName] {
        match self {
            PipelineBranch::Full => &[],
            PipelineBranch::DocumentsOnly => &WEB_STEPS,
        }
    }
}

/// Request body sent to every backend step endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StepRequest {
    /// The workspace the step operates on.
    pub page_id: String,
}

/// Response body returned by every backend step endpoint.
///
/// ```json
/// { "success": false, "error": "timeout", "execution_time": 3.2 }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StepResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable failure code (`no_urls` for an empty crawl list).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Server-side execution time of the step, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,

    /// Step-specific payload, e.g. the list of structured documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

/// Response body of the backend's processing-status endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
pub struct ProcessingStatus {
    /// Whether the backend is still building this workspace.
    pub processing: bool,
}

/// Mapping from step name to execution time in seconds.
///
/// A `None` entry means the step has not completed (or was skipped). This is
/// the shape persisted as `stepExecutionTimes` for a workspace.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default, TS)]
pub struct StepDurations {
    pub crawling: Option<f64>,
    pub structuring: Option<f64>,
    pub line1: Option<f64>,
    pub document: Option<f64>,
    pub indexing: Option<f64>,
    pub update: Option<f64>,
}

impl StepDurations {
    pub fn get(&self, step: StepName) -> Option<f64> {
        match step {
            StepName::Crawling => self.crawling,
            StepName::Structuring => self.structuring,
            StepName::Line1 => self.line1,
            StepName::Document => self.document,
            StepName::Indexing => self.indexing,
            StepName::Update => self.update,
        }
    }

    pub fn set(&mut self, step: StepName, duration_secs: Option<f64>) {
        let slot = match step {
            StepName::Crawling => &mut self.crawling,
            StepName::Structuring => &mut self.structuring,
            StepName::Line1 => &mut self.line1,
            StepName::Document => &mut self.document,
            StepName::Indexing => &mut self.indexing,
            StepName::Update => &mut self.update,
        };
        *slot = duration_secs;
    }

    /// Overlay the recorded entries of `other` onto `self`.
    ///
    /// Entries that are `None` in `other` leave `self` untouched, so merging
    /// growing subsets of the same run is idempotent.
    pub fn merge(&mut self, other: &StepDurations) {
        for step in StepName::ALL {
            if let Some(secs) = other.get(step) {
                self.set(step, Some(secs));
            }
        }
    }

    /// Steps with a recorded duration, in execution order.
    pub fn completed_steps(&self) -> Vec<StepName> {
        StepName::ALL
            .into_iter()
            .filter(|step| self.get(*step).is_some())
            .collect()
    }

    /// The latest step (in execution order) with a recorded duration.
    pub fn last_completed(&self) -> Option<StepName> {
        self.completed_steps().last().copied()
    }

    /// True when every step the branch requires has a duration.
    pub fn is_complete_for(&self, branch: PipelineBranch) -> bool {
        branch
            .required_steps()
            .iter()
            .all(|step| self.get(*step).is_some())
    }

    /// Sum of the recorded durations.
    pub fn sum(&self) -> f64 {
        StepName::ALL.into_iter().filter_map(|step| self.get(step)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.last_completed().is_none()
    }
}

/// Where a run stopped when it failed.
///
/// Serializes as the step's wire name, or `precondition` when the run was
/// rejected before any step was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailedStage {
    Precondition,
    Step(StepName),
}

impl FailedStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailedStage::Precondition => "precondition",
            FailedStage::Step(step) => step.as_str(),
        }
    }

    pub fn step(&self) -> Option<StepName> {
        match self {
            FailedStage::Precondition => None,
            FailedStage::Step(step) => Some(*step),
        }
    }
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<StepName> for FailedStage {
    fn from(step: StepName) -> Self {
        FailedStage::Step(step)
    }
}

impl Serialize for FailedStage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FailedStage {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s == "precondition" {
            return Ok(FailedStage::Precondition);
        }
        s.parse::<StepName>()
            .map(FailedStage::Step)
            .map_err(serde::de::Error::custom)
    }
}

/// Result of one successfully completed step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct StepReport {
    pub step: StepName,

    /// Duration recorded for the step: the backend's `execution_time` when it
    /// reports one, otherwise the measured round-trip time.
    pub duration_secs: f64,

    /// Step-specific payload returned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

/// Summary of a run that completed every step of its branch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PipelineReport {
    #[ts(type = "string")]
    pub run_id: Uuid,
    pub workspace_id: String,
    pub branch: PipelineBranch,
    pub durations: StepDurations,
    /// Per-step raw results, in execution order.
    pub steps: Vec<StepReport>,
    /// Wall-clock time from pipeline start to the end of the last step.
    pub total_secs: f64,
}

/// Summary of a run that stopped on a failure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
pub struct PipelineFailure {
    #[ts(type = "string")]
    pub run_id: Uuid,
    pub workspace_id: String,
    #[ts(type = "string")]
    pub failed_stage: FailedStage,
    pub message: String,
    /// Durations of the steps that completed before the failure.
    pub durations: StepDurations,
    pub steps: Vec<StepReport>,
}

/// Final outcome of a pipeline run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum PipelineOutcome {
    Completed(PipelineReport),
    Failed(PipelineFailure),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Completed(_))
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            PipelineOutcome::Completed(report) => report.run_id,
            PipelineOutcome::Failed(failure) => failure.run_id,
        }
    }

    pub fn workspace_id(&self) -> &str {
        match self {
            PipelineOutcome::Completed(report) => &report.workspace_id,
            PipelineOutcome::Failed(failure) => &failure.workspace_id,
        }
    }

    pub fn durations(&self) -> &StepDurations {
        match self {
            PipelineOutcome::Completed(report) => &report.durations,
            PipelineOutcome::Failed(failure) => &failure.durations,
        }
    }

    pub fn failed_stage(&self) -> Option<FailedStage> {
        match self {
            PipelineOutcome::Completed(_) => None,
            PipelineOutcome::Failed(failure) => Some(failure.failed_stage),
        }
    }

    pub fn total_secs(&self) -> Option<f64> {
        match self {
            PipelineOutcome::Completed(report) => Some(report.total_secs),
            PipelineOutcome::Failed(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_order_follows_declaration() {
        assert!(StepName::Crawling < StepName::Structuring);
        assert!(StepName::Line1 < StepName::Document);
        assert!(StepName::Indexing < StepName::Update);
        assert_eq!(StepName::Update.next(), None);
        assert_eq!(StepName::Line1.next(), Some(StepName::Document));
    }

    #[test]
    fn test_step_name_parse() {
        assert_eq!("line1".parse::<StepName>(), Ok(StepName::Line1));
        assert!("line2".parse::<StepName>().is_err());
    }

    #[test]
    fn test_branch_required_steps() {
        assert_eq!(PipelineBranch::Full.required_steps().len(), 6);
        assert_eq!(
            PipelineBranch::DocumentsOnly.required_steps(),
            &[StepName::Document, StepName::Indexing, StepName::Update]
        );
        assert_eq!(
            PipelineBranch::DocumentsOnly.skipped_steps(),
            &[StepName::Crawling, StepName::Structuring, StepName::Line1]
        );
    }

    #[test]
    fn test_durations_merge_keeps_existing_entries() {
        let mut stored = StepDurations::default();
        stored.set(StepName::Crawling, Some(5.0));

        let mut update = StepDurations::default();
        update.set(StepName::Structuring, Some(8.0));

        stored.merge(&update);
        stored.merge(&update);

        assert_eq!(stored.crawling, Some(5.0));
        assert_eq!(stored.structuring, Some(8.0));
        assert_eq!(stored.last_completed(), Some(StepName::Structuring));
        assert!(!stored.is_complete_for(PipelineBranch::Full));
    }

    #[test]
    fn test_durations_complete_for_documents_only() {
        let mut durations = StepDurations::default();
        durations.set(StepName::Document, Some(10.0));
        durations.set(StepName::Indexing, Some(20.0));
        durations.set(StepName::Update, Some(3.0));

        assert!(durations.is_complete_for(PipelineBranch::DocumentsOnly));
        assert!(!durations.is_complete_for(PipelineBranch::Full));
        assert_eq!(durations.sum(), 33.0);
    }

    #[test]
    fn test_failed_stage_wire_names() {
        let json = serde_json::to_value(FailedStage::Precondition).unwrap();
        assert_eq!(json, "precondition");

        let json = serde_json::to_value(FailedStage::Step(StepName::Structuring)).unwrap();
        assert_eq!(json, "structuring");

        let parsed: FailedStage = serde_json::from_str("\"line1\"").unwrap();
        assert_eq!(parsed, FailedStage::Step(StepName::Line1));
    }
}
