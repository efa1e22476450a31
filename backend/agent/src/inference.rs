//! Inference call wrapper: request shaping, timeout, and retry policy.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use proglot_core::{
    CompletionProvider, CompletionRequest, GenerationSettings, InferenceError, Turn,
};

/// Backoff for transient failures. The default is a single attempt: fail
/// once, then let the caller degrade.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 1_000,
            backoff_factor: 2.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay_ms =
            self.base_delay_ms as f64 * self.backoff_factor.powi((attempt - 1) as i32);
        Duration::from_millis(delay_ms.min(self.max_delay_ms as f64) as u64)
    }

    pub fn should_retry(&self, attempt: u32, error: &InferenceError) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }
}

/// Everything about a request that comes from configuration.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub model: String,
    pub generation: GenerationSettings,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".to_string(),
            generation: GenerationSettings::default(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }
}

/// Wraps a completion provider with request shaping and error handling.
pub struct Inference<P: CompletionProvider + ?Sized> {
    provider: Arc<P>,
    settings: InferenceSettings,
}

impl<P: CompletionProvider + ?Sized> Inference<P> {
    pub fn new(provider: Arc<P>, settings: InferenceSettings) -> Self {
        Self { provider, settings }
    }

    pub fn settings(&self) -> &InferenceSettings {
        &self.settings
    }

    /// Persona, then the window, then the new user turn.
    pub fn request(&self, instruction: &str, window: &[Turn], new_turn: &Turn) -> CompletionRequest {
        let mut messages = Vec::with_capacity(window.len() + 1);
        messages.extend_from_slice(window);
        messages.push(new_turn.clone());
        CompletionRequest {
            model: self.settings.model.clone(),
            system_instruction: instruction.to_string(),
            messages,
            generation: self.settings.generation,
        }
    }

    /// Send one turn. Timeouts are reported as `TransientNetwork`.
    pub async fn infer(
        &self,
        instruction: &str,
        window: &[Turn],
        new_turn: &Turn,
    ) -> Result<String, InferenceError> {
        let request = self.request(instruction, window, new_turn);
        let timeout = self.settings.timeout;
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                provider = self.provider.name(),
                attempt,
                messages = request.messages.len(),
                "Calling completion provider"
            );

            let outcome = match tokio::time::timeout(timeout, self.provider.complete(&request)).await {
                Ok(result) => result,
                Err(_) => Err(InferenceError::TransientNetwork(format!(
                    "no response within {}s",
                    timeout.as_secs_f32()
                ))),
            };

            match outcome {
                Ok(response) => {
                    info!(
                        provider = %response.provider,
                        tokens = response.tokens_used,
                        latency_ms = response.latency_ms,
                        "Provider responded"
                    );
                    return Ok(response.text);
                }
                Err(err) if self.settings.retry.should_retry(attempt, &err) => {
                    let delay = self.settings.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max = self.settings.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "Completion failed");
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proglot_providers::MockProvider;

    fn settings(retry: RetryPolicy, timeout: Duration) -> InferenceSettings {
        InferenceSettings {
            model: "test-model".into(),
            timeout,
            retry,
            ..Default::default()
        }
    }

    fn quick_retries(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            max_delay_ms: 3_000,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(2_000));
        assert_eq!(policy.delay_for(5), Duration::from_millis(3_000));
    }

    #[test]
    fn request_appends_new_turn_after_window() {
        let inference = Inference::new(
            Arc::new(MockProvider::new("mock")),
            settings(RetryPolicy::default(), Duration::from_secs(1)),
        );
        let window = vec![Turn::user("a"), Turn::assistant("b")];
        let new_turn = Turn::user("c");
        let req = inference.request("persona", &window, &new_turn);
        assert_eq!(req.model, "test-model");
        assert_eq!(req.system_instruction, "persona");
        assert_eq!(req.messages.len(), 3);
        assert_eq!(req.messages[2], new_turn);
    }

    #[tokio::test]
    async fn single_attempt_by_default() {
        let provider = Arc::new(MockProvider::new("mock").with_script(vec![Err(
            InferenceError::TransientNetwork("reset".into()),
        )]));
        let inference = Inference::new(
            provider.clone(),
            settings(RetryPolicy::default(), Duration::from_secs(5)),
        );

        let err = inference.infer("p", &[], &Turn::user("hi")).await.unwrap_err();
        assert!(matches!(err, InferenceError::TransientNetwork(_)));
        assert_eq!(provider.call_count().await, 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_up_to_the_limit() {
        let provider = Arc::new(MockProvider::new("mock").with_script(vec![
            Err(InferenceError::TransientNetwork("503".into())),
            Err(InferenceError::TransientNetwork("503".into())),
            Ok("finally".into()),
        ]));
        let inference = Inference::new(
            provider.clone(),
            settings(quick_retries(3), Duration::from_secs(5)),
        );

        let reply = inference.infer("p", &[], &Turn::user("hi")).await.unwrap();
        assert_eq!(reply, "finally");
        assert_eq!(provider.call_count().await, 3);
    }

    #[tokio::test]
    async fn never_retries_quota_or_auth() {
        for err in [
            InferenceError::QuotaExceeded("429".into()),
            InferenceError::Auth("401".into()),
        ] {
            let provider =
                Arc::new(MockProvider::new("mock").with_script(vec![Err(err.clone())]));
            let inference = Inference::new(
                provider.clone(),
                settings(quick_retries(5), Duration::from_secs(5)),
            );
            assert_eq!(
                inference.infer("p", &[], &Turn::user("hi")).await.unwrap_err(),
                err
            );
            assert_eq!(provider.call_count().await, 1);
        }
    }

    #[tokio::test]
    async fn timeout_is_transient() {
        let provider = Arc::new(MockProvider::new("slow").with_delay(Duration::from_secs(2)));
        let inference = Inference::new(
            provider,
            settings(RetryPolicy::default(), Duration::from_millis(20)),
        );
        let err = inference.infer("p", &[], &Turn::user("hi")).await.unwrap_err();
        assert!(matches!(err, InferenceError::TransientNetwork(m) if m.contains("no response")));
    }
}
