//! In-process backend for unit tests.

use std::sync::Mutex;

use serde_json::json;

use crate::api::DashboardApi;
use crate::domain::credentials::Credentials;
use crate::domain::inference::{
    DescriptionHeuristics, InferenceRequest, InferenceResult, LlmRequest,
};
use crate::domain::mail::MailRecord;
use crate::error::ApiError;
use crate::mail::loader::MailQuery;

/// A failure the stub should answer with.
#[derive(Debug, Clone)]
pub(crate) enum Fail {
    Status(u16, Option<&'static str>),
    Transport(&'static str),
}

impl Fail {
    fn err(&self) -> ApiError {
        match self {
            Fail::Status(status, message) => ApiError::Status {
                status: *status,
                message: message.map(str::to_string),
            },
            Fail::Transport(e) => ApiError::Transport(e.to_string()),
        }
    }
}

pub(crate) struct StubApi {
    pub login: Result<&'static str, Fail>,
    pub prefill: Result<LlmRequest, Fail>,
    pub preview: Result<DescriptionHeuristics, Fail>,
    pub infer: Result<InferenceResult, Fail>,
    pub mails: Result<Vec<MailRecord>, Fail>,
    pub calls: Mutex<Vec<String>>,
}

impl StubApi {
    /// Every endpoint succeeds.
    pub fn ok() -> Self {
        Self {
            login: Ok("sid-123"),
            prefill: Ok(sample_llm_request()),
            preview: Ok(DescriptionHeuristics(
                json!({"prompt": "sunset", "steps": 30})
                    .as_object()
                    .cloned()
                    .unwrap_or_default(),
            )),
            infer: Ok(sample_result()),
            mails: Ok(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }
}

pub(crate) fn sample_llm_request() -> LlmRequest {
    LlmRequest::decode(
        json!({
            "messages": [
                {"role": "system", "content": "Extract the parameters"},
                {"role": "user", "content": "Return the JSON without the // comments"}
            ],
            "temperature": 1.0,
            "max_tokens": 1024,
            "stream": false
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap()
}

pub(crate) fn sample_result() -> InferenceResult {
    InferenceResult::decode(
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "local",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "ok"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap()
}

impl DashboardApi for StubApi {
    fn login(&self, _credentials: &Credentials) -> Result<String, ApiError> {
        self.record("login");
        self.login.clone().map(str::to_string).map_err(|f| f.err())
    }

    fn prefill(&self, _description: &str) -> Result<LlmRequest, ApiError> {
        self.record("prefill");
        self.prefill.clone().map_err(|f| f.err())
    }

    fn prefill_preview(&self, _description: &str) -> Result<DescriptionHeuristics, ApiError> {
        self.record("preview");
        self.preview.clone().map_err(|f| f.err())
    }

    fn infer(
        &self,
        _request: &InferenceRequest,
        _localhost: bool,
    ) -> Result<InferenceResult, ApiError> {
        self.record("infer");
        self.infer.clone().map_err(|f| f.err())
    }

    fn search_mail(&self, _query: &MailQuery) -> Result<Vec<MailRecord>, ApiError> {
        self.record("search");
        self.mails.clone().map_err(|f| f.err())
    }

    fn fetch_image(&self, _url: &str) -> Result<Vec<u8>, ApiError> {
        self.record("image");
        Err(ApiError::Status {
            status: 404,
            message: None,
        })
    }
}
