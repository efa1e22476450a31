//! Environment variable substitution and overrides for config values.
//!
//! String values may reference `${VAR_NAME}` (uppercase names only); `$${`
//! escapes to a literal `${`. A fixed set of variables also overrides
//! individual fields after the file is parsed.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::schema::ProGlotConfig;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute env vars using a provided map (useful for testing).
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let whole = &caps[0];
        let var_name = &caps[1];
        if whole.starts_with("$$") {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Apply well-known environment overrides on top of the file config.
///
/// `GEMINI_API_KEY` / `OPENROUTER_API_KEY` (matching the selected provider),
/// `GEMINI_MODEL`, `PROGLOT_WINDOW_SIZE`, `PROGLOT_TIMEOUT_SECS`, `PROGLOT_DATA_DIR`.
pub fn apply_env_overrides(mut config: ProGlotConfig, env: &HashMap<String, String>) -> ProGlotConfig {
    let non_empty = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    if let Some(key) = non_empty(config.provider.api_key_env()) {
        config.api_key = Some(key);
    }
    if let Some(model) = non_empty("GEMINI_MODEL") {
        config.model = Some(model);
    }
    if let Some(raw) = non_empty("PROGLOT_WINDOW_SIZE") {
        match raw.trim().parse() {
            Ok(n) => config.window_size = Some(n),
            Err(_) => warn!(value = %raw, "Ignoring invalid PROGLOT_WINDOW_SIZE"),
        }
    }
    if let Some(raw) = non_empty("PROGLOT_TIMEOUT_SECS") {
        match raw.trim().parse() {
            Ok(secs) => config.request_timeout_secs = Some(secs),
            Err(_) => warn!(value = %raw, "Ignoring invalid PROGLOT_TIMEOUT_SECS"),
        }
    }
    if let Some(dir) = non_empty("PROGLOT_DATA_DIR") {
        config.data_dir = Some(PathBuf::from(dir));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ProviderKind;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn substitutes_simple_var() {
        let v = json!({"apiKey": "${GEMINI_API_KEY}"});
        let result = resolve_env_vars_with(&v, &env(&[("GEMINI_API_KEY", "AIza-123")])).unwrap();
        assert_eq!(result["apiKey"], "AIza-123");
    }

    #[test]
    fn error_on_missing_var_names_it() {
        let v = json!({"logging": {"dir": "${LOG_HOME}/proglot"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("LOG_HOME"));
        assert!(err.to_string().contains("logging.dir"));
    }

    #[test]
    fn escaped_reference_is_kept_literally() {
        let v = json!({"model": "$${NOT_A_VAR}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["model"], "${NOT_A_VAR}");
    }

    #[test]
    fn overrides_follow_selected_provider() {
        let vars = env(&[
            ("GEMINI_API_KEY", "gem"),
            ("OPENROUTER_API_KEY", "or"),
            ("PROGLOT_WINDOW_SIZE", "8"),
            ("PROGLOT_TIMEOUT_SECS", "nope"),
        ]);
        let cfg = apply_env_overrides(
            ProGlotConfig {
                provider: ProviderKind::OpenRouter,
                request_timeout_secs: Some(15),
                ..Default::default()
            },
            &vars,
        );
        assert_eq!(cfg.api_key.as_deref(), Some("or"));
        assert_eq!(cfg.window_size, Some(8));
        assert_eq!(cfg.request_timeout_secs, Some(15));
    }
}
