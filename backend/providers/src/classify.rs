//! Map HTTP failures onto the tutor's inference error taxonomy.

use reqwest::StatusCode;
use serde::Deserialize;

use proglot_core::InferenceError;

const MAX_BODY_IN_MESSAGE: usize = 300;

/// `{"error": {"message": ..., "status": ...}}`, shared by Google and
/// OpenAI-style APIs (the latter omit `status`).
#[derive(Deserialize, Default)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Deserialize, Default)]
struct ErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

fn truncate(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX_BODY_IN_MESSAGE) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

fn mentions_api_key(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("api key") || lower.contains("api_key_invalid")
}

/// Classify a non-success response by status code and error body.
pub fn classify_status(status: StatusCode, body: &str) -> InferenceError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error)
        .unwrap_or_default();
    let message = detail.message.unwrap_or_else(|| truncate(body));
    let summary = format!("{status}: {message}");

    match (status.as_u16(), detail.status.as_deref()) {
        (_, Some("RESOURCE_EXHAUSTED")) | (429, _) => InferenceError::QuotaExceeded(summary),
        (_, Some("UNAUTHENTICATED" | "PERMISSION_DENIED")) | (401 | 403, _) => {
            InferenceError::Auth(summary)
        }
        (400, _) if mentions_api_key(&message) => InferenceError::Auth(summary),
        (_, Some("UNAVAILABLE" | "DEADLINE_EXCEEDED")) | (408 | 500 | 502 | 503 | 504, _) => {
            InferenceError::TransientNetwork(summary)
        }
        _ => InferenceError::Unknown(summary),
    }
}

/// Classify a failure that happened before a response was received.
pub fn classify_transport(err: &reqwest::Error) -> InferenceError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        InferenceError::TransientNetwork(err.to_string())
    } else {
        InferenceError::Unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_by_status_or_google_code() {
        let google = r#"{"error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, google),
            InferenceError::QuotaExceeded(m) if m.contains("Resource has been exhausted")
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            InferenceError::QuotaExceeded(_)
        ));
    }

    #[test]
    fn auth_failures() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, ""),
            InferenceError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, r#"{"error": {"message": "denied", "status": "PERMISSION_DENIED"}}"#),
            InferenceError::Auth(_)
        ));
        let bad_key = r#"{"error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, bad_key),
            InferenceError::Auth(_)
        ));
    }

    #[test]
    fn server_side_outages_are_transient() {
        for status in [
            StatusCode::REQUEST_TIMEOUT,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            assert!(matches!(
                classify_status(status, "<html>oops</html>"),
                InferenceError::TransientNetwork(_)
            ));
        }
    }

    #[test]
    fn other_client_errors_are_unknown() {
        let body = r#"{"error": {"message": "model not found", "status": "NOT_FOUND"}}"#;
        match classify_status(StatusCode::NOT_FOUND, body) {
            InferenceError::Unknown(m) => assert!(m.contains("model not found")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(2_000);
        let err = classify_status(StatusCode::IM_A_TEAPOT, &body);
        assert!(err.to_string().len() < 400);
    }

    #[tokio::test]
    async fn connection_refused_is_transient() {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:1/")
            .send()
            .await
            .unwrap_err();
        assert!(matches!(
            classify_transport(&err),
            InferenceError::TransientNetwork(_)
        ));
    }
}
