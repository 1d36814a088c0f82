//! Workspace registry.
//!
//! The registry keeps the single-`main` invariant itself: the first
//! workspace becomes `main`, promoting another workspace demotes the old one,
//! and deleting `main` promotes the oldest remaining workspace.

use crate::config::models::DATA_DIR_NAME;
use crate::store::atomic::replace_file;
use crate::store::error::{StoreError, StoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gb_protocol::workspace_models::{NewWorkspace, PageType, Workspace};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// All workspaces in creation order.
    async fn list(&self) -> StoreResult<Vec<Workspace>>;

    async fn get(&self, id: &str) -> StoreResult<Workspace>;

    async fn create(&self, new: NewWorkspace) -> StoreResult<Workspace>;

    async fn rename(&self, id: &str, name: &str) -> StoreResult<Workspace>;

    async fn set_type(&self, id: &str, page_type: PageType) -> StoreResult<Workspace>;

    /// Remove a workspace, returning it.
    async fn delete(&self, id: &str) -> StoreResult<Workspace>;

    /// The current `main` workspace, if any.
    async fn main(&self) -> StoreResult<Option<Workspace>>;
}

/// In-memory registry state shared by both store implementations.
#[derive(Debug, Clone, Default)]
struct Registry {
    workspaces: Vec<Workspace>,
}

impl Registry {
    fn sorted(mut workspaces: Vec<Workspace>) -> Self {
        workspaces.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Self { workspaces }
    }

    fn find(&self, id: &str) -> StoreResult<&Workspace> {
        self.workspaces
            .iter()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::WorkspaceNotFound(id.to_string()))
    }

    fn find_mut(&mut self, id: &str) -> StoreResult<&mut Workspace> {
        self.workspaces
            .iter_mut()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::WorkspaceNotFound(id.to_string()))
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        let mut millis = now.timestamp_millis();
        loop {
            let id = format!("page_{millis}");
            if self.workspaces.iter().all(|w| w.id != id) {
                return id;
            }
            millis += 1;
        }
    }

    fn create(&mut self, new: NewWorkspace, now: DateTime<Utc>) -> StoreResult<Workspace> {
        let name = validated_name(&new.name)?;
        let page_type = if self.workspaces.is_empty() {
            PageType::Main
        } else {
            PageType::Normal
        };
        let workspace = Workspace {
            id: self.next_id(now),
            name,
            domain_name: new.domain_name.trim().to_string(),
            system_name: new.system_name.trim().to_string(),
            page_type,
            created_at: now,
        };
        self.workspaces.push(workspace.clone());
        Ok(workspace)
    }

    fn rename(&mut self, id: &str, name: &str) -> StoreResult<Workspace> {
        let name = validated_name(name)?;
        let workspace = self.find_mut(id)?;
        workspace.name = name;
        Ok(workspace.clone())
    }

    fn set_type(&mut self, id: &str, page_type: PageType) -> StoreResult<Workspace> {
        self.find(id)?;
        if page_type == PageType::Main {
            for workspace in self.workspaces.iter_mut().filter(|w| w.id != id) {
                workspace.page_type = PageType::Normal;
            }
        }
        let workspace = self.find_mut(id)?;
        workspace.page_type = page_type;
        Ok(workspace.clone())
    }

    fn delete(&mut self, id: &str) -> StoreResult<Workspace> {
        let index = self
            .workspaces
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| StoreError::WorkspaceNotFound(id.to_string()))?;
        let removed = self.workspaces.remove(index);

        if removed.is_main() {
            // Kept sorted, so the first entry is the oldest
            if let Some(successor) = self.workspaces.first_mut() {
                successor.page_type = PageType::Main;
                info!(workspace_id = %successor.id, "promoted to main workspace");
            }
        }
        Ok(removed)
    }

    fn main(&self) -> Option<Workspace> {
        self.workspaces.iter().find(|w| w.is_main()).cloned()
    }
}

fn validated_name(name: &str) -> StoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidWorkspace(
            "workspace name must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

/// Registry persisted as a YAML list.
pub struct FileWorkspaceStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileWorkspaceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The registry file under a project root (`.graphbuild/workspaces.yaml`).
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(DATA_DIR_NAME).join("workspaces.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<Registry> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Registry::default())
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if content.trim().is_empty() {
            return Ok(Registry::default());
        }

        let workspaces: Vec<Workspace> =
            serde_yaml::from_str(&content).map_err(|source| StoreError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        Ok(Registry::sorted(workspaces))
    }

    async fn save(&self, registry: &Registry) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let yaml =
            serde_yaml::to_string(&registry.workspaces).map_err(|source| StoreError::Yaml {
                path: self.path.clone(),
                source,
            })?;
        replace_file(&self.path, yaml).await?;
        debug!(path = %self.path.display(), count = registry.workspaces.len(), "workspace registry saved");
        Ok(())
    }

    /// Load, apply `change`, and write back when it succeeds.
    async fn update<T>(
        &self,
        change: impl FnOnce(&mut Registry) -> StoreResult<T> + Send,
    ) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let mut registry = self.load().await?;
        let value = change(&mut registry)?;
        self.save(&registry).await?;
        Ok(value)
    }
}

#[async_trait]
impl WorkspaceStore for FileWorkspaceStore {
    async fn list(&self) -> StoreResult<Vec<Workspace>> {
        Ok(self.load().await?.workspaces)
    }

    async fn get(&self, id: &str) -> StoreResult<Workspace> {
        self.load().await?.find(id).cloned()
    }

    async fn create(&self, new: NewWorkspace) -> StoreResult<Workspace> {
        let now = Utc::now();
        self.update(move |registry| registry.create(new, now)).await
    }

    async fn rename(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        self.update(|registry| registry.rename(id, name)).await
    }

    async fn set_type(&self, id: &str, page_type: PageType) -> StoreResult<Workspace> {
        self.update(|registry| registry.set_type(id, page_type))
            .await
    }

    async fn delete(&self, id: &str) -> StoreResult<Workspace> {
        self.update(|registry| registry.delete(id)).await
    }

    async fn main(&self) -> StoreResult<Option<Workspace>> {
        Ok(self.load().await?.main())
    }
}

#[derive(Default)]
pub struct MemoryWorkspaceStore {
    registry: Mutex<Registry>,
}

impl MemoryWorkspaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing workspaces, as loaded from elsewhere.
    pub fn with_workspaces(workspaces: Vec<Workspace>) -> Self {
        Self {
            registry: Mutex::new(Registry::sorted(workspaces)),
        }
    }
}

#[async_trait]
impl WorkspaceStore for MemoryWorkspaceStore {
    async fn list(&self) -> StoreResult<Vec<Workspace>> {
        Ok(self.registry.lock().await.workspaces.clone())
    }

    async fn get(&self, id: &str) -> StoreResult<Workspace> {
        self.registry.lock().await.find(id).cloned()
    }

    async fn create(&self, new: NewWorkspace) -> StoreResult<Workspace> {
        self.registry.lock().await.create(new, Utc::now())
    }

    async fn rename(&self, id: &str, name: &str) -> StoreResult<Workspace> {
        self.registry.lock().await.rename(id, name)
    }

    async fn set_type(&self, id: &str, page_type: PageType) -> StoreResult<Workspace> {
        self.registry.lock().await.set_type(id, page_type)
    }

    async fn delete(&self, id: &str) -> StoreResult<Workspace> {
        self.registry.lock().await.delete(id)
    }

    async fn main(&self) -> StoreResult<Option<Workspace>> {
        Ok(self.registry.lock().await.main())
    }
}
