//! Configuration file loader for the `.graphbuild/` directory.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use gb_protocol::config_models::GlobalConfig;
use std::path::Path;

/// Loads configuration from `<root>/.graphbuild/config.toml`.
///
/// # Returns
///
/// An `AppConfig` with the parsed settings. A missing `.graphbuild/`
/// directory or `config.toml` yields the defaults rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The file exists but cannot be read
/// - The file is not valid TOML
/// - A value is out of range (see [`validate`])
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let mut config = AppConfig::for_root(root);
    let config_path = config.config_path();

    if !config_path.exists() {
        return Ok(config);
    }

    let content = tokio::fs::read_to_string(&config_path)
        .await
        .map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    let global: GlobalConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.clone(),
            source,
        })?;

    validate(&global, &config_path)?;
    config.global = global;
    Ok(config)
}

/// Checks values serde cannot: URL scheme, endpoint shape, polling bounds.
pub fn validate(global: &GlobalConfig, path: &Path) -> ConfigResult<()> {
    let invalid = |reason: String| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason,
    };

    let base_url = &global.backend.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(format!(
            "backend.base-url must start with http:// or https://, got '{base_url}'"
        )));
    }

    let endpoints = &global.backend.endpoints;
    for (key, value) in [
        ("crawl", &endpoints.crawl),
        ("structure-web", &endpoints.structure_web),
        ("clean-lines", &endpoints.clean_lines),
        ("structure-documents", &endpoints.structure_documents),
        ("apply", &endpoints.apply),
        ("update", &endpoints.update),
        ("processing-status", &endpoints.processing_status),
    ] {
        if !value.starts_with('/') {
            return Err(invalid(format!(
                "backend.endpoints.{key} must start with '/', got '{value}'"
            )));
        }
    }

    if global.backend.request_timeout_secs == Some(0) {
        return Err(invalid(
            "backend.request-timeout-secs must be greater than 0".to_string(),
        ));
    }
    if global.status.poll_interval_secs == 0 {
        return Err(invalid(
            "status.poll-interval-secs must be greater than 0".to_string(),
        ));
    }
    if global.status.max_polls == 0 {
        return Err(invalid("status.max-polls must be greater than 0".to_string()));
    }

    Ok(())
}
