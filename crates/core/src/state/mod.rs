//! State management for pipeline runs.
//!
//! This module provides:
//! - The run state machine and its events
//! - RunManager for coordinating runs across workspaces
//! - Progress restoration after a restart

pub mod error;
pub mod manager;
pub mod resume;
pub mod run;

pub use error::RunError;
pub use manager::{RunHandle, RunManager};
pub use resume::{restore_progress, wait_until_idle, RestoredProgress};
