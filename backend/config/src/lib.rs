//! `proglot-config`: ProGlot runtime configuration.
//!
//! Provides:
//! - Typed config schema (provider, model, window, timeout, retry, logging)
//! - YAML read/write with atomic replace and backup rotation
//! - `${ENV_VAR}` substitution and well-known environment overrides
//! - Default value application
//! - Validation and secret redaction

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use redact::redact;
pub use schema::{GenerationConfig, LoggingConfig, ProGlotConfig, ProviderKind, RetryConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Load, substitute env vars, apply overrides and defaults.
///
/// This is the main entry point for loading a config at runtime. Validation
/// problems are logged; callers that need a working model check `validate`.
pub async fn load_and_prepare(path: &Path) -> Result<ProGlotConfig> {
    let raw_config = load_config(path).await?;

    let value: Value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: ProGlotConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, &std::env::vars().collect());
    let config = apply_all_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::debug!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}
