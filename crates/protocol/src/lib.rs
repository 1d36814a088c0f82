//! # gb-protocol
//!
//! Core protocol definitions and data models for graphbuild.
//!
//! This crate defines all shared data structures used for:
//! - Workspace ("page") records
//! - Backend step requests/responses and pipeline outcomes
//! - Runtime state of a pipeline run
//! - Configuration file parsing (`.graphbuild/config.toml`)
//! - Progress events streamed from the core to its callers
//!
//! ## Modules
//!
//! - [`workspace_models`]: Workspace records and page types
//! - [`pipeline_models`]: Step names, step wire format, durations and outcomes
//! - [`run_models`]: Runtime run state and status
//! - [`config_models`]: Global configuration from config.toml
//! - [`ipc`]: Events emitted while a pipeline runs
//!
//! ## Design Principles
//!
//! - Minimal dependencies: serde, ts-rs, uuid and chrono
//! - TypeScript generation: all types derive `TS` for the web admin UI
//! - Independent compilation: no dependencies on other graphbuild crates

pub mod config_models;
pub mod ipc;
pub mod pipeline_models;
pub mod run_models;
pub mod workspace_models;

// Re-export all public types for convenience
pub use config_models::*;
pub use ipc::*;
pub use pipeline_models::*;
pub use run_models::*;
pub use workspace_models::*;
