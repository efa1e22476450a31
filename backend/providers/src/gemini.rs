use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use proglot_core::{
    CompletionProvider, CompletionRequest, CompletionResponse, InferenceError, Role,
};

use crate::classify::{classify_status, classify_transport};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        // Accept both "gemini-1.5-flash" and "models/gemini-1.5-flash".
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    total_token_count: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_body(request: &CompletionRequest) -> GenerateContentRequest {
    let contents = request
        .messages
        .iter()
        .map(|turn| Content {
            role: Some(gemini_role(turn.role()).to_string()),
            parts: vec![Part {
                text: turn.text().to_string(),
            }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction: Content {
            role: None,
            parts: vec![Part {
                text: request.system_instruction.clone(),
            }],
        },
        contents,
        generation_config: GenerationConfig {
            temperature: request.generation.temperature,
            top_p: request.generation.top_p,
            max_output_tokens: request.generation.max_output_tokens,
        },
    }
}

/// Pull the reply text out of a decoded response.
fn extract_text(response: GenerateContentResponse) -> Result<(String, u64), InferenceError> {
    let tokens = response
        .usage_metadata
        .and_then(|u| u.total_token_count)
        .unwrap_or(0);

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(InferenceError::Unknown(format!("Gemini returned no reply: {reason}")));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "empty".to_string());
        return Err(InferenceError::Unknown(format!(
            "Gemini returned an empty reply (finish reason: {reason})"
        )));
    }

    Ok((text, tokens))
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<CompletionResponse, InferenceError> {
        let start = Instant::now();
        let body = build_body(request);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &error_body));
        }

        let decoded: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| InferenceError::Unknown(format!("failed to parse Gemini response: {e}")))?;

        let (text, tokens_used) = extract_text(decoded)?;

        Ok(CompletionResponse {
            text,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            tokens_used,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proglot_core::{GenerationSettings, Turn};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gemini-1.5-flash".into(),
            system_instruction: "You are 'ProGlot'.".into(),
            messages: vec![
                Turn::user("Ciao"),
                Turn::assistant("Ciao! Come ti chiami?"),
                Turn::user("Mi chiamo Ada"),
            ],
            generation: GenerationSettings::default(),
        }
    }

    #[test]
    fn body_maps_roles_and_system_instruction() {
        let body = serde_json::to_value(build_body(&request())).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are 'ProGlot'.");
        assert!(body["systemInstruction"].get("role").is_none());
        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "Mi chiamo Ada");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn endpoint_strips_models_prefix() {
        let provider = GeminiProvider::new("k").with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            provider.endpoint("models/gemini-pro"),
            "http://localhost:9999/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn extracts_joined_parts_and_usage() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "Bene, "}, {"text": "grazie!"}]}, "finishReason": "STOP"}],
            "usageMetadata": {"totalTokenCount": 42}
        }"#;
        let decoded: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        let (text, tokens) = extract_text(decoded).unwrap();
        assert_eq!(text, "Bene, grazie!");
        assert_eq!(tokens, 42);
    }

    #[test]
    fn blocked_prompt_is_unknown_error() {
        let raw = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let decoded: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        match extract_text(decoded) {
            Err(InferenceError::Unknown(m)) => assert!(m.contains("SAFETY")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
