//! Persisted per-step execution times.
//!
//! Each workspace has one progress document holding the `stepExecutionTimes`
//! recorded so far. Writes merge partial mappings, so the engine's observer
//! can upsert one step at a time and a restarted caller can read back how far
//! the last run got.

use crate::store::atomic::replace_file;
use crate::store::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gb_protocol::pipeline_models::StepDurations;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// Stored progress of one workspace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub step_execution_times: StepDurations,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Upsert the recorded entries of `times` for the workspace.
    ///
    /// `None` entries never erase a stored value; calling this repeatedly
    /// with the same or growing subsets is idempotent.
    async fn merge_step_times(
        &self,
        workspace_id: &str,
        times: &StepDurations,
    ) -> StoreResult<ProgressRecord>;

    /// Stored progress, or `None` if nothing was recorded yet.
    async fn load(&self, workspace_id: &str) -> StoreResult<Option<ProgressRecord>>;

    /// Drop the stored progress (before starting a fresh run).
    async fn clear(&self, workspace_id: &str) -> StoreResult<()>;
}

fn merged(existing: Option<ProgressRecord>, times: &StepDurations) -> ProgressRecord {
    let mut step_execution_times = existing
        .map(|record| record.step_execution_times)
        .unwrap_or_default();
    step_execution_times.merge(times);
    ProgressRecord {
        step_execution_times,
        updated_at: Utc::now(),
    }
}

/// One JSON document per workspace under a directory.
pub struct FileProgressStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for a workspace. Bytes outside `[A-Za-z0-9_-]` are written as
    /// `%XX`, so distinct ids never share a file.
    fn path_for(&self, workspace_id: &str) -> PathBuf {
        let mut file_stem = String::with_capacity(workspace_id.len());
        for byte in workspace_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
                file_stem.push(char::from(byte));
            } else {
                file_stem.push_str(&format!("%{byte:02X}"));
            }
        }
        self.dir.join(format!("{file_stem}.json"))
    }

    async fn read(&self, path: &Path) -> StoreResult<Option<ProgressRecord>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| StoreError::Json {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl ProgressStore for FileProgressStore {
    async fn merge_step_times(
        &self,
        workspace_id: &str,
        times: &StepDurations,
    ) -> StoreResult<ProgressRecord> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(workspace_id);

        let record = merged(self.read(&path).await?, times);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let json = serde_json::to_string_pretty(&record).map_err(|source| {
            StoreError::Json {
                path: path.clone(),
                source,
            }
        })?;
        replace_file(&path, json).await?;

        debug!(workspace_id, path = %path.display(), "progress saved");
        Ok(record)
    }

    async fn load(&self, workspace_id: &str) -> StoreResult<Option<ProgressRecord>> {
        self.read(&self.path_for(workspace_id)).await
    }

    async fn clear(&self, workspace_id: &str) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(workspace_id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[derive(Default)]
pub struct MemoryProgressStore {
    records: Mutex<HashMap<String, ProgressRecord>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn merge_step_times(
        &self,
        workspace_id: &str,
        times: &StepDurations,
    ) -> StoreResult<ProgressRecord> {
        let mut records = self.records.lock().await;
        let record = merged(records.remove(workspace_id), times);
        records.insert(workspace_id.to_string(), record.clone());
        Ok(record)
    }

    async fn load(&self, workspace_id: &str) -> StoreResult<Option<ProgressRecord>> {
        Ok(self.records.lock().await.get(workspace_id).cloned())
    }

    async fn clear(&self, workspace_id: &str) -> StoreResult<()> {
        self.records.lock().await.remove(workspace_id);
        Ok(())
    }
}
