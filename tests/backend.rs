//! Drives the real HTTP client against a tiny_http stand-in for the backend.

use std::sync::{Arc, Mutex};
use std::thread;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tiny_http::{Header, Response, Server};

use mail_dashboard::api::DashboardApi;
use mail_dashboard::api::http::HttpApi;
use mail_dashboard::auth::login::{LoginOutcome, login};
use mail_dashboard::auth::session_store::{MemorySessionStore, SessionStore};
use mail_dashboard::domain::credentials::Credentials;
use mail_dashboard::mail::loader::{MailListLoader, MailQuery, TempFlag};
use mail_dashboard::pipeline::{Pipeline, PipelineState, run};

#[derive(Debug, Clone)]
struct Hit {
    method: String,
    url: String,
    cookie: Option<String>,
    body: String,
}

impl Hit {
    fn path(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

type Route = Box<dyn Fn(&str) -> (u16, String) + Send + 'static>;

struct Backend {
    base: String,
    hits: Arc<Mutex<Vec<Hit>>>,
}

impl Backend {
    /// `routes` maps a path to a handler returning status and JSON body.
    fn start(routes: Vec<(&'static str, Route)>) -> Self {
        let server = Server::http("127.0.0.1:0").unwrap();
        let base = format!("http://127.0.0.1:{}", server.server_addr().port());
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = hits.clone();

        thread::spawn(move || {
            for mut req in server.incoming_requests() {
                let mut body = String::new();
                req.as_reader().read_to_string(&mut body).unwrap();
                let hit = Hit {
                    method: req.method().to_string(),
                    url: req.url().to_string(),
                    cookie: req
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("Cookie"))
                        .map(|h| h.value.to_string()),
                    body,
                };
                let (status, payload) = routes
                    .iter()
                    .find(|(path, _)| *path == hit.path())
                    .map(|(_, f)| f(&hit.body))
                    .unwrap_or((404, r#"{"error":"not found"}"#.to_string()));
                sink.lock().unwrap().push(hit);

                let header: Header = "Content-Type: application/json".parse().unwrap();
                let _ = req.respond(
                    Response::from_string(payload)
                        .with_status_code(status)
                        .with_header(header),
                );
            }
        });

        Self { base, hits }
    }

    fn api(&self) -> HttpApi {
        HttpApi::new(&self.base).unwrap()
    }

    fn hits(&self) -> Vec<Hit> {
        self.hits.lock().unwrap().clone()
    }

    fn count(&self, path: &str) -> usize {
        self.hits().iter().filter(|h| h.path() == path).count()
    }
}

fn ok(body: Value) -> Route {
    let body = body.to_string();
    Box::new(move |_| (200, body.clone()))
}

fn status(code: u16, body: Value) -> Route {
    let body = body.to_string();
    Box::new(move |_| (code, body.clone()))
}

fn llm_request() -> Value {
    json!({
        "messages": [
            {"role": "system", "content": "You are a helpful assistant."},
            {"role": "user", "content": "steps: 30"}
        ],
        "temperature": 1.0,
        "max_tokens": 1024,
        "stream": false
    })
}

fn llm_response() -> Value {
    json!({
        "id": "chatcmpl-42",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "local",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": "looks fine"},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
    })
}

#[test]
fn failing_prefill_never_reaches_the_llm() {
    let backend = Backend::start(vec![
        ("/api/prefill", status(400, json!({"error": "bad description"}))),
        ("/api/llm", ok(llm_response())),
    ]);
    let api = backend.api();

    let mut pipeline = Pipeline::new();
    let mut markers = Vec::new();
    let state = run(&mut pipeline, &api, "steps: 30", true, |s| markers.push(s.marker()));

    assert_eq!(state, &PipelineState::Error("bad description".into()));
    assert_eq!(markers, vec![0, -1]);
    assert_eq!(backend.count("/api/prefill"), 1);
    assert_eq!(backend.count("/api/llm"), 0);
}

#[test]
fn full_pipeline_posts_the_prefilled_request() {
    let backend = Backend::start(vec![
        ("/api/prefill", ok(llm_request())),
        ("/api/llm", ok(llm_response())),
    ]);
    let api = backend.api();

    let mut pipeline = Pipeline::new();
    let mut markers = Vec::new();
    let state = run(&mut pipeline, &api, "steps: 30", true, |s| markers.push(s.marker()));

    let PipelineState::Done(result) = state else {
        panic!("expected Done, got {state:?}");
    };
    assert_eq!(result.content(), Some("looks fine"));
    assert_eq!(markers, vec![0, 1, 2, 3, 4]);

    let hits = backend.hits();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].method, "POST");
    assert_eq!(hits[0].url, "/api/prefill?output=complete");
    let prefill_body: Value = serde_json::from_str(&hits[0].body).unwrap();
    assert_eq!(prefill_body, json!({"description": "steps: 30"}));

    assert_eq!(hits[1].url, "/api/llm?localhost=true");
    let envelope: Value = serde_json::from_str(&hits[1].body).unwrap();
    assert_eq!(envelope["request"]["messages"], llm_request()["messages"]);
    assert_eq!(envelope["request"]["max_tokens"], json!(1024));
    assert!(envelope["config"].is_object());
}

#[test]
fn malformed_inference_body_fails_the_run() {
    let backend = Backend::start(vec![
        ("/api/prefill", ok(llm_request())),
        ("/api/llm", ok(json!({"id": "x"}))),
    ]);
    let api = backend.api();

    let mut pipeline = Pipeline::new();
    let state = run(&mut pipeline, &api, "steps: 30", false, |_| {});
    assert!(matches!(state, PipelineState::Error(_)), "{state:?}");
    assert_eq!(backend.hits()[1].url, "/api/llm?localhost=false");
}

#[test]
fn failed_search_leaves_an_empty_list() {
    let backend = Backend::start(vec![(
        "/api/inkbunny/search",
        status(500, json!({"error": "boom"})),
    )]);
    let api = backend.api();

    let mut loader = MailListLoader::new();
    let mails = loader.load(&api, &MailQuery::new(None, TempFlag::No));
    assert!(mails.is_empty());
    assert!(!loader.loading());
}

#[test]
fn search_sends_sid_and_temp() {
    let backend = Backend::start(vec![(
        "/api/inkbunny/search",
        ok(json!([
            {"id": "1", "name": "Ann", "subject": "hi", "text": "steps: 30",
             "labels": ["digital art"], "files": null, "read": false},
            {"id": "2", "name": "Bo", "subject": "yo", "text": "", "labels": [], "read": true}
        ])),
    )]);
    let api = backend.api();

    let mut loader = MailListLoader::new();
    let mails = loader.load(&api, &MailQuery::new(None, TempFlag::Yes));
    assert_eq!(mails.len(), 2);
    assert_eq!(mails[0].labels[0].as_str(), "digital_art");
    assert!(mails[0].files.is_empty());

    assert_eq!(
        backend.hits()[0].url,
        "/api/inkbunny/search?sid=guest&output=mail&temp=yes"
    );
}

#[test]
fn null_search_result_is_an_empty_list() {
    let backend = Backend::start(vec![("/api/inkbunny/search", ok(Value::Null))]);
    let api = backend.api();
    let mut loader = MailListLoader::new();
    assert!(loader.load(&api, &MailQuery::new(None, TempFlag::No)).is_empty());
}

#[test]
fn login_token_is_stored_and_sent_as_cookie() {
    let backend = Backend::start(vec![
        ("/api/login", ok(json!({"sessionId": "abc123"}))),
        ("/api/inkbunny/search", ok(json!([]))),
    ]);
    let api = backend.api();
    let store = MemorySessionStore::new();

    let outcome = login(&api, &store, &Credentials::new("alice", "secret1"));
    let LoginOutcome::Success { token } = outcome else {
        panic!("expected success, got {outcome:?}");
    };
    assert_eq!(store.load().unwrap().as_deref(), Some("abc123"));

    let body: Value = serde_json::from_str(&backend.hits()[0].body).unwrap();
    assert_eq!(body, json!({"username": "alice", "password": "secret1"}));

    api.set_session(Some(token));
    api.search_mail(&MailQuery::new(api.session(), TempFlag::No))
        .unwrap();

    let search = &backend.hits()[1];
    assert_eq!(search.cookie.as_deref(), Some("PHPSESSID=abc123"));
    assert!(search.url.contains("sid=abc123"), "{}", search.url);
}

#[test]
fn rejected_login_reports_the_server_message() {
    let backend = Backend::start(vec![(
        "/api/login",
        status(401, json!({"message": "wrong password", "error": "unauthorized"})),
    )]);
    let api = backend.api();
    let store = MemorySessionStore::new();

    let outcome = login(&api, &store, &Credentials::new("alice", "secret1"));
    assert_eq!(outcome, LoginOutcome::Failed("wrong password".into()));
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn short_password_sends_nothing() {
    let backend = Backend::start(vec![("/api/login", ok(json!({"sessionId": "x"})))]);
    let api = backend.api();
    let store = MemorySessionStore::new();

    let outcome = login(&api, &store, &Credentials::new("alice", "123"));
    assert!(matches!(outcome, LoginOutcome::Invalid(_)));
    assert!(backend.hits().is_empty());
}

#[test]
fn image_proxy_returns_raw_bytes() {
    let backend = Backend::start(vec![("/api/image", ok(json!("pixels")))]);
    let api = backend.api();

    let bytes = api.fetch_image("https://x.test/a.png").unwrap();
    assert_eq!(bytes, b"\"pixels\"");
    assert_eq!(
        backend.hits()[0].url,
        "/api/image?url=https%3A%2F%2Fx.test%2Fa.png"
    );
}
