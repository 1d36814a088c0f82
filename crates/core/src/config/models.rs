//! Configuration models that aggregate all settings.

use gb_protocol::config_models::GlobalConfig;
use std::path::{Path, PathBuf};

/// Name of the per-project state directory.
pub const DATA_DIR_NAME: &str = ".graphbuild";

/// Application configuration resolved against a project root.
///
/// # Example
///
/// ```rust,no_run
/// use gb_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Backend at {}", config.global.backend.base_url);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Settings from `config.toml` (defaults when absent).
    pub global: GlobalConfig,

    /// The `.graphbuild/` directory holding the registry and progress files.
    pub data_dir: PathBuf,
}

impl AppConfig {
    /// Default settings for a project rooted at `root`.
    pub fn for_root(root: &Path) -> Self {
        Self {
            global: GlobalConfig::default(),
            data_dir: root.join(DATA_DIR_NAME),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn workspaces_path(&self) -> PathBuf {
        self.data_dir.join("workspaces.yaml")
    }

    /// Directory with one progress document per workspace.
    pub fn progress_dir(&self) -> PathBuf {
        self.data_dir.join("progress")
    }

    /// Replace the backend base URL (command-line override).
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.global.backend.base_url = url.into();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::for_root(Path::new("."))
    }
}
