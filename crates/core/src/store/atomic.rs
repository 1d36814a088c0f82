//! Whole-file replacement for the on-disk stores.

use crate::store::error::{StoreError, StoreResult};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("store"));
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `contents` next to `path`, then rename it over `path`.
///
/// Readers see either the old document or the new one, never a torn write.
pub(crate) async fn replace_file(path: &Path, contents: String) -> StoreResult<()> {
    let staging = staging_path(path);
    tokio::fs::write(&staging, contents)
        .await
        .map_err(|source| StoreError::Io {
            path: staging.clone(),
            source,
        })?;
    if let Err(source) = tokio::fs::rename(&staging, path).await {
        let _ = tokio::fs::remove_file(&staging).await;
        return Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}
