use std::sync::RwLock;

use log::{debug, warn};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, COOKIE};
use serde::Deserialize;
use url::Url;

use crate::api::{DashboardApi, SESSION_COOKIE};
use crate::domain::credentials::Credentials;
use crate::domain::inference::{
    DescriptionHeuristics, InferenceRequest, InferenceResult, LlmRequest, PrefillOutput,
    PrefillRequest,
};
use crate::domain::mail::{MailRecord, decode_mail_list};
use crate::error::{ApiError, DecodeError, error_message};
use crate::mail::loader::MailQuery;
use crate::mail::sanitize::image_proxy_path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    session_id: String,
}

/// Blocking client for the dashboard backend.
pub struct HttpApi {
    client: Client,
    base: Url,
    session: RwLock<Option<String>>,
}

impl HttpApi {
    pub fn new(base: &str) -> Result<Self, ApiError> {
        // Url::join treats a base without trailing slash as a file.
        let mut base = Url::parse(base)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base,
            session: RwLock::new(None),
        })
    }

    pub fn with_session(self, token: Option<String>) -> Self {
        self.set_session(token);
        self
    }

    /// Token sent as the session cookie on every following request.
    pub fn set_session(&self, token: Option<String>) {
        if let Ok(mut s) = self.session.write() {
            *s = token;
        }
    }

    pub fn session(&self) -> Option<String> {
        self.session.read().ok().and_then(|s| s.clone())
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        match self.session() {
            Some(token) => req.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => req,
        }
    }

    fn send(&self, req: RequestBuilder) -> Result<Vec<u8>, ApiError> {
        let resp = self.authed(req).header(ACCEPT, "application/json").send()?;
        read_body(resp)
    }
}

/// Body bytes of a 2xx response; otherwise a `Status` error carrying the
/// server's message when it sent one.
fn read_body(resp: Response) -> Result<Vec<u8>, ApiError> {
    let status = resp.status();
    let url = resp.url().clone();
    let body = resp.bytes()?;
    if !status.is_success() {
        let message = error_message(&body);
        warn!("{} {} failed: {:?}", status.as_u16(), url.path(), message);
        return Err(ApiError::Status {
            status: status.as_u16(),
            message,
        });
    }
    debug!("{} {} ({} bytes)", status.as_u16(), url.path(), body.len());
    Ok(body.to_vec())
}

impl DashboardApi for HttpApi {
    fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let url = self.endpoint("api/login")?;
        let body = self.send(self.client.post(url).json(&credentials.as_request()))?;
        let resp: LoginResponse = serde_json::from_slice(&body).map_err(DecodeError::from)?;
        if resp.session_id.is_empty() {
            return Err(DecodeError::Empty("sessionId").into());
        }
        Ok(resp.session_id)
    }

    fn prefill(&self, description: &str) -> Result<LlmRequest, ApiError> {
        let body = self.post_prefill(description, PrefillOutput::Complete)?;
        Ok(LlmRequest::decode(&body)?)
    }

    fn prefill_preview(&self, description: &str) -> Result<DescriptionHeuristics, ApiError> {
        let body = self.post_prefill(description, PrefillOutput::Json)?;
        Ok(DescriptionHeuristics::decode(&body)?)
    }

    fn infer(
        &self,
        request: &InferenceRequest,
        localhost: bool,
    ) -> Result<InferenceResult, ApiError> {
        let mut url = self.endpoint("api/llm")?;
        url.query_pairs_mut()
            .append_pair("localhost", if localhost { "true" } else { "false" });
        let body = self.send(self.client.post(url).json(request))?;
        Ok(InferenceResult::decode(&body)?)
    }

    fn search_mail(&self, query: &MailQuery) -> Result<Vec<MailRecord>, ApiError> {
        let mut url = self.endpoint("api/inkbunny/search")?;
        url.query_pairs_mut()
            .append_pair("sid", &query.sid)
            .append_pair("output", "mail")
            .append_pair("temp", query.temp.as_str());
        let body = self.send(self.client.get(url))?;
        Ok(decode_mail_list(&body)?)
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        let proxied = self.endpoint(&image_proxy_path(url))?;
        let resp = self.authed(self.client.get(proxied)).send()?;
        read_body(resp)
    }
}

impl HttpApi {
    fn post_prefill(&self, description: &str, output: PrefillOutput) -> Result<Vec<u8>, ApiError> {
        let mut url = self.endpoint("api/prefill")?;
        url.query_pairs_mut().append_pair("output", output.as_str());
        self.send(self.client.post(url).json(&PrefillRequest { description }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_resolve_under_base_path() {
        let api = HttpApi::new("http://127.0.0.1:1323").unwrap();
        assert_eq!(
            api.endpoint("api/login").unwrap().as_str(),
            "http://127.0.0.1:1323/api/login"
        );

        let api = HttpApi::new("https://example.test/dashboard").unwrap();
        assert_eq!(
            api.endpoint("/api/llm").unwrap().as_str(),
            "https://example.test/dashboard/api/llm"
        );
    }

    #[test]
    fn image_endpoint_keeps_encoded_url() {
        let api = HttpApi::new("http://127.0.0.1:1323/").unwrap();
        let url = api
            .endpoint(&image_proxy_path("https://x.test/a.png"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:1323/api/image?url=https%3A%2F%2Fx.test%2Fa.png"
        );
    }

    #[test]
    fn session_can_be_swapped() {
        let api = HttpApi::new("http://localhost/").unwrap().with_session(Some("abc".into()));
        assert_eq!(api.session().as_deref(), Some("abc"));
        api.set_session(None);
        assert_eq!(api.session(), None);
    }
}
