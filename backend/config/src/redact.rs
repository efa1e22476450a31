//! Config redaction: produce safe-to-display config snapshots.

use serde_json::Value;

use crate::schema::ProGlotConfig;

static SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Keep a short prefix as a hint so users can tell keys apart.
fn mask(s: &str) -> String {
    if s.chars().count() > 8 {
        let hint: String = s.chars().take(4).collect();
        format!("{hint}***")
    } else {
        "***".to_string()
    }
}

/// Serialize the config with every secret masked.
pub fn redact(config: &ProGlotConfig) -> Value {
    let value = serde_json::to_value(config).unwrap_or(Value::Null);
    redact_value(&value)
}

/// Mask sensitive fields anywhere in a JSON tree.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match v {
                        Value::String(s) if is_sensitive_key(k) && !s.is_empty() => {
                            Value::String(mask(s))
                        }
                        other => redact_value(other),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(arr) => Value::Array(arr.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_api_key_but_keeps_other_fields() {
        let cfg = ProGlotConfig {
            api_key: Some("AIzaSyD-very-secret".into()),
            model: Some("gemini-1.5-flash".into()),
            ..Default::default()
        };
        let out = redact(&cfg);
        assert_eq!(out["apiKey"], "AIza***");
        assert_eq!(out["model"], "gemini-1.5-flash");
        assert!(!out.to_string().contains("very-secret"));
    }

    #[test]
    fn short_secrets_are_fully_masked() {
        let v = serde_json::json!({"nested": {"token": "abc"}});
        assert_eq!(redact_value(&v)["nested"]["token"], "***");
    }
}
