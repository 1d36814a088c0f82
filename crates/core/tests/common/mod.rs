//! Common test utilities and helpers for integration tests.
//!
//! This module provides shared functionality across all integration tests
//! including:
//! - Test fixtures (scripted backends, project directories)
//! - Custom assertions
//! - Mock observers and stores

pub mod assertions;
pub mod fixtures;
pub mod mock_observers;

#[allow(unused_imports)]
pub use assertions::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use mock_observers::*;
