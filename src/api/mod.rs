pub mod http;
#[cfg(test)]
pub(crate) mod stub;

use crate::domain::credentials::Credentials;
use crate::domain::inference::{DescriptionHeuristics, InferenceRequest, InferenceResult, LlmRequest};
use crate::domain::mail::MailRecord;
use crate::error::ApiError;
use crate::mail::loader::MailQuery;

/// Name of the cookie (and keyring entry) holding the session token.
pub const SESSION_COOKIE: &str = "PHPSESSID";

/// The backend endpoints the dashboard consumes.
pub trait DashboardApi: Send + Sync {
    /// `POST /api/login`; returns the session token.
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError>;

    /// `POST /api/prefill?output=complete`.
    fn prefill(&self, description: &str) -> Result<LlmRequest, ApiError>;

    /// `POST /api/prefill?output=json`.
    fn prefill_preview(&self, description: &str) -> Result<DescriptionHeuristics, ApiError>;

    /// `POST /api/llm?localhost=<bool>`.
    fn infer(&self, request: &InferenceRequest, localhost: bool)
    -> Result<InferenceResult, ApiError>;

    /// `GET /api/inkbunny/search?...&output=mail`.
    fn search_mail(&self, query: &MailQuery) -> Result<Vec<MailRecord>, ApiError>;

    /// `GET /api/image?url=...`; raw image bytes.
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError>;
}
