use thiserror::Error;

/// A response body did not have the shape this client expects.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected {expected}, got {found}")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, body read failure and the like.
    #[error("request failed: {0}")]
    Transport(String),

    #[error("server returned {status}{}", detail(.message))]
    Status { status: u16, message: Option<String> },

    #[error("unexpected response: {0}")]
    Decode(#[from] DecodeError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        ApiError::Transport(format!("bad endpoint url: {e}"))
    }
}

impl ApiError {
    /// Text shown to the user: the server's own message when it sent one,
    /// otherwise `fallback` (plus the cause for non-HTTP failures).
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                message: Some(m), ..
            } => m.clone(),
            ApiError::Status { message: None, .. } => fallback.to_string(),
            ApiError::Transport(e) => format!("{fallback}: {e}"),
            ApiError::Decode(e) => format!("{fallback}: {e}"),
        }
    }
}

fn detail(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

/// Pull `message` (or the backend's `error`) out of a failure body.
pub fn error_message(body: &[u8]) -> Option<String> {
    let v: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|k| v.get(*k).and_then(|m| m.as_str()))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

/// JSON kind name for shape errors.
pub(crate) fn kind_of(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
