//! Config validation with user-friendly messages.

use thiserror::Error;

use crate::schema::ProGlotConfig;

/// Windows larger than this rarely help and cost tokens on every turn.
const LARGE_WINDOW: usize = 200;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &ProGlotConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_credentials(config, &mut report);
    validate_window(config, &mut report);
    validate_request(config, &mut report);
    report
}

fn validate_credentials(config: &ProGlotConfig, report: &mut ValidationReport) {
    let missing = config
        .api_key
        .as_deref()
        .map_or(true, |k| k.trim().is_empty());
    if missing {
        report.error(
            "apiKey",
            format!(
                "No API key configured; set apiKey or {}",
                config.provider.api_key_env()
            ),
        );
    }
    if config.model().trim().is_empty() {
        report.error("model", "Model identifier cannot be empty");
    }
}

fn validate_window(config: &ProGlotConfig, report: &mut ValidationReport) {
    let window = config.window_size();
    if window == 0 {
        report.warn(
            "windowSize",
            "Window size is 0; the tutor will not see any earlier turns",
        );
    } else if window > LARGE_WINDOW {
        report.warn(
            "windowSize",
            format!("Window size {window} is very large; requests may exceed the model context"),
        );
    }
}

fn validate_request(config: &ProGlotConfig, report: &mut ValidationReport) {
    if config.request_timeout().is_zero() {
        report.error("requestTimeoutSecs", "Request timeout must be at least 1 second");
    }
    if config.max_attempts() == 0 {
        report.error("retry.maxAttempts", "At least one attempt is required");
    }
    if config.backoff_factor() < 1.0 {
        report.warn("retry.backoffFactor", "Backoff factor below 1.0 shortens each delay");
    }
    let temperature = config.temperature();
    if !(0.0..=2.0).contains(&temperature) {
        report.error(
            "generation.temperature",
            format!("Temperature {temperature} is outside 0.0-2.0"),
        );
    }
    let top_p = config.top_p();
    if !(0.0..=1.0).contains(&top_p) {
        report.error("generation.topP", format!("topP {top_p} is outside 0.0-1.0"));
    }
    if config.max_output_tokens() == 0 {
        report.error("generation.maxOutputTokens", "maxOutputTokens must be positive");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GenerationConfig, RetryConfig};

    fn keyed() -> ProGlotConfig {
        ProGlotConfig {
            api_key: Some("AIza-test".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_with_key_are_valid() {
        let report = validate(&keyed());
        assert!(report.is_valid(), "{:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn missing_key_names_env_var() {
        let report = validate(&ProGlotConfig::default());
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "apiKey");
        assert!(report.errors[0].message.contains("GEMINI_API_KEY"));
    }

    #[test]
    fn zero_window_is_only_a_warning() {
        let report = validate(&ProGlotConfig {
            window_size: Some(0),
            ..keyed()
        });
        assert!(report.is_valid());
        assert_eq!(report.warnings[0].path, "windowSize");
    }

    #[test]
    fn rejects_bad_request_settings() {
        let report = validate(&ProGlotConfig {
            request_timeout_secs: Some(0),
            retry: Some(RetryConfig {
                max_attempts: Some(0),
                ..Default::default()
            }),
            generation: Some(GenerationConfig {
                temperature: Some(3.5),
                ..Default::default()
            }),
            ..keyed()
        });
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"requestTimeoutSecs"));
        assert!(paths.contains(&"retry.maxAttempts"));
        assert!(paths.contains(&"generation.temperature"));
    }
}
