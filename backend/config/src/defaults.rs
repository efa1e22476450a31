//! Config defaults: applies default values to a parsed config.

use crate::schema::{GenerationConfig, LoggingConfig, ProGlotConfig, RetryConfig};

/// Turns of history sent with each request.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_OPENROUTER_MODEL: &str = "google/gemini-flash-1.5";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// One attempt, then fall back to manual export.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: ProGlotConfig) -> ProGlotConfig {
    let config = apply_model_defaults(config);
    let config = apply_generation_defaults(config);
    let config = apply_retry_defaults(config);
    apply_logging_defaults(config)
}

fn apply_model_defaults(mut config: ProGlotConfig) -> ProGlotConfig {
    if config.model.is_none() {
        config.model = Some(config.provider.default_model().to_string());
    }
    if config.window_size.is_none() {
        config.window_size = Some(DEFAULT_WINDOW_SIZE);
    }
    if config.request_timeout_secs.is_none() {
        config.request_timeout_secs = Some(DEFAULT_REQUEST_TIMEOUT_SECS);
    }
    config
}

fn apply_generation_defaults(mut config: ProGlotConfig) -> ProGlotConfig {
    let generation = config
        .generation
        .get_or_insert_with(GenerationConfig::default);
    generation.temperature.get_or_insert(DEFAULT_TEMPERATURE);
    generation.top_p.get_or_insert(DEFAULT_TOP_P);
    generation
        .max_output_tokens
        .get_or_insert(DEFAULT_MAX_OUTPUT_TOKENS);
    config
}

fn apply_retry_defaults(mut config: ProGlotConfig) -> ProGlotConfig {
    let retry = config.retry.get_or_insert_with(RetryConfig::default);
    retry.max_attempts.get_or_insert(DEFAULT_MAX_ATTEMPTS);
    retry.base_delay_ms.get_or_insert(DEFAULT_BASE_DELAY_MS);
    retry.backoff_factor.get_or_insert(DEFAULT_BACKOFF_FACTOR);
    retry.max_delay_ms.get_or_insert(DEFAULT_MAX_DELAY_MS);
    config
}

fn apply_logging_defaults(mut config: ProGlotConfig) -> ProGlotConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    config
}
