//! # gb-core
//!
//! Core pipeline engine and backend access for graphbuild.
//!
//! This crate provides:
//! - Configuration loading from the `.graphbuild/` directory
//! - The backend abstraction with HTTP and scripted adapters
//! - The pipeline execution engine
//! - Run state management and progress restoration
//! - Workspace registry and progress persistence
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and management
//! - [`backend`]: Backend trait and adapter implementations
//! - [`engine`]: Pipeline execution engine
//! - [`state`]: Run state management
//! - [`store`]: Workspace and progress stores

pub mod backend;
pub mod config;
pub mod engine;
pub mod state;
pub mod store;
