//! Typed payloads for the prefill and inference endpoints.
//!
//! Bodies are checked here, at the boundary, so the pipeline only ever sees
//! values of a known shape. Fields this client does not model are kept in
//! `extra` and forwarded untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DecodeError, kind_of};

/// `output=` mode of `POST /api/prefill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefillOutput {
    /// Only the description heuristics.
    Json,
    /// A ready-to-send LLM request.
    Complete,
}

impl PrefillOutput {
    pub fn as_str(self) -> &'static str {
        match self {
            PrefillOutput::Json => "json",
            PrefillOutput::Complete => "complete",
        }
    }
}

/// Body of `POST /api/prefill`.
#[derive(Debug, Clone, Serialize)]
pub struct PrefillRequest<'a> {
    pub description: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
}

/// Chat-completion request, as produced by the prefill stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i64,
    #[serde(default)]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_temperature() -> f64 {
    1.0
}

fn default_max_tokens() -> i64 {
    1024
}

impl LlmRequest {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let obj = decode_object(body)?;
        if !obj.contains_key("messages") {
            return Err(DecodeError::MissingField("messages"));
        }
        let req: LlmRequest = serde_json::from_value(Value::Object(obj))?;
        if req.messages.is_empty() {
            return Err(DecodeError::Empty("messages"));
        }
        Ok(req)
    }
}

/// Envelope sent to `POST /api/llm`. The endpoint config stays empty; the
/// server picks it from the `localhost` query flag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceRequest {
    pub config: Map<String, Value>,
    pub request: LlmRequest,
}

impl InferenceRequest {
    pub fn wrap(request: LlmRequest) -> Self {
        Self {
            config: Map::new(),
            request,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
    #[serde(default)]
    pub total_tokens: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<Message>,
    #[serde(default)]
    pub finish_reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

/// A decoded inference response plus the body it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub response: LlmResponse,
    pub raw: Value,
}

impl InferenceResult {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let obj = decode_object(body)?;
        if !obj.contains_key("choices") {
            return Err(DecodeError::MissingField("choices"));
        }
        let raw = Value::Object(obj);
        let response = serde_json::from_value(raw.clone())?;
        Ok(Self { response, raw })
    }

    /// What the result viewer shows.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.raw).unwrap_or_else(|_| self.raw.to_string())
    }

    /// Content of the first choice, if any.
    pub fn content(&self) -> Option<&str> {
        self.response
            .choices
            .first()
            .and_then(|c| c.message.as_ref().or(c.delta.as_ref()))
            .map(|m| m.content.as_str())
    }
}

/// Result of `output=json`: the heuristics extracted from a description.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionHeuristics(pub Map<String, Value>);

impl DescriptionHeuristics {
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        decode_object(body).map(Self)
    }

    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }
}

fn decode_object(body: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(obj) => Ok(obj),
        other => Err(DecodeError::Shape {
            expected: "an object",
            found: kind_of(&other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn decodes_complete_prefill() {
        let body = json!({
            "messages": [
                {"role": "system", "content": "You are a parser"},
                {"role": "user", "content": "Return the JSON without the // comments"}
            ],
            "temperature": 1.0,
            "max_tokens": 1024,
            "stream": false
        });
        let req = LlmRequest::decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert_eq!(req.max_tokens, 1024);
        assert!(!req.stream);
    }

    #[test]
    fn unknown_prefill_fields_are_forwarded() {
        let body = json!({
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.5,
            "max_tokens": 10,
            "stream": false,
            "top_p": 0.9
        });
        let req = LlmRequest::decode(body.to_string().as_bytes()).unwrap();
        let wire = serde_json::to_value(InferenceRequest::wrap(req)).unwrap();
        assert_eq!(wire["config"], json!({}));
        assert_eq!(wire["request"]["top_p"], json!(0.9));
        assert_eq!(wire["request"]["messages"][0]["content"], json!("hi"));
    }

    #[test]
    fn prefill_without_messages_is_rejected() {
        let err = LlmRequest::decode(br#"{"temperature":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("messages")));

        let err = LlmRequest::decode(br#"{"messages":[]}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Empty("messages")));

        let err = LlmRequest::decode(br#"[1,2]"#).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Shape {
                found: "an array",
                ..
            }
        ));
    }

    #[test]
    fn bad_role_is_a_json_error() {
        let err = LlmRequest::decode(br#"{"messages":[{"role":"robot","content":"x"}]}"#)
            .unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn inference_result_keeps_raw_body() {
        let body = json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1713700000,
            "model": "local",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"prompt\":\"sunset\"}"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15},
            "system_fingerprint": "abc"
        });
        let res = InferenceResult::decode(body.to_string().as_bytes()).unwrap();
        assert_eq!(res.content(), Some("{\"prompt\":\"sunset\"}"));
        assert_eq!(res.response.usage.total_tokens, 15);
        assert_eq!(res.raw["system_fingerprint"], json!("abc"));
        assert!(res.pretty().contains("\"system_fingerprint\": \"abc\""));
    }

    #[test]
    fn inference_result_needs_choices() {
        let err = InferenceResult::decode(br#"{"id":"x"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField("choices")));
    }

    #[test]
    fn heuristics_must_be_an_object() {
        let h = DescriptionHeuristics::decode(br#"{"prompt":"a cat","steps":30}"#).unwrap();
        assert!(h.pretty().contains("\"steps\": 30"));
        assert!(DescriptionHeuristics::decode(b"\"text\"").is_err());
    }
}
