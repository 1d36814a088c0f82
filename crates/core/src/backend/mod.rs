//! Build backend abstraction.
//!
//! This module provides the `Backend` trait (Adapter Pattern) with an HTTP
//! implementation for the real service and a scripted one for tests and
//! dry runs.

pub mod adapters;
pub mod base;

pub use adapters::{HttpBackend, MockBackend, MockStep};
pub use base::{Backend, BackendError, CrawlOutcome, StepSuccess};
