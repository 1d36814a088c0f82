//! Persistence for workspace registries and step progress.

mod atomic;
pub mod error;
pub mod progress;
pub mod workspace;

pub use error::{StoreError, StoreResult};
pub use progress::{FileProgressStore, MemoryProgressStore, ProgressRecord, ProgressStore};
pub use workspace::{FileWorkspaceStore, MemoryWorkspaceStore, WorkspaceStore};
