//! Turn the loaded configuration into runtime components.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;

use proglot_agent::{InferenceSettings, RetryPolicy};
use proglot_config::{validate, ProGlotConfig, ProviderKind};
use proglot_core::{CompletionProvider, GenerationSettings};
use proglot_providers::{GeminiProvider, OpenRouterProvider};

/// Load the config file (or defaults) and apply command-line overrides.
pub async fn load(config_path: Option<&Path>, data_dir: Option<PathBuf>) -> Result<ProGlotConfig> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => proglot_config::config_file_path(&proglot_config::config_dir()),
    };
    let mut config = proglot_config::load_and_prepare(&path).await?;
    if let Some(dir) = data_dir {
        config.data_dir = Some(dir);
    }
    Ok(config)
}

/// Fail early with every config error when the model is going to be called.
pub fn require_valid(config: &ProGlotConfig) -> Result<()> {
    let report = validate(config);
    if report.is_valid() {
        return Ok(());
    }
    let messages: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
    bail!("invalid configuration:\n  {}", messages.join("\n  "))
}

pub fn inference_settings(config: &ProGlotConfig) -> InferenceSettings {
    InferenceSettings {
        model: config.model().to_string(),
        generation: GenerationSettings {
            temperature: config.temperature(),
            top_p: config.top_p(),
            max_output_tokens: config.max_output_tokens(),
        },
        timeout: config.request_timeout(),
        retry: RetryPolicy {
            max_attempts: config.max_attempts(),
            base_delay_ms: config.base_delay_ms(),
            backoff_factor: config.backoff_factor(),
            max_delay_ms: config.max_delay_ms(),
        },
    }
}

/// Build the configured completion provider. Requires a valid config.
pub fn build_provider(config: &ProGlotConfig) -> Result<Arc<dyn CompletionProvider>> {
    let Some(api_key) = config.api_key.clone() else {
        bail!(
            "no API key configured; set {} or apiKey in the config file",
            config.provider.api_key_env()
        );
    };

    let provider: Arc<dyn CompletionProvider> = match config.provider {
        ProviderKind::Gemini => {
            let mut provider = GeminiProvider::new(api_key);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
        ProviderKind::OpenRouter => {
            let mut provider = OpenRouterProvider::new(api_key);
            if let Some(url) = &config.base_url {
                provider = provider.with_base_url(url);
            }
            Arc::new(provider)
        }
    };

    info!(
        provider = provider.name(),
        model = %config.model(),
        timeout_secs = config.request_timeout().as_secs(),
        "Completion provider ready"
    );
    Ok(provider)
}

/// Timeout shown to users in status lines.
pub fn describe_timeout(timeout: Duration) -> String {
    format!("{}s", timeout.as_secs())
}
