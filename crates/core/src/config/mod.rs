//! Configuration loading and management.
//!
//! This module loads `.graphbuild/config.toml` and resolves the paths of the
//! other files kept in `.graphbuild/`.

pub mod error;
pub mod loader;
pub mod models;

pub use error::{ConfigError, ConfigResult};
pub use loader::load_config;
pub use models::AppConfig;
