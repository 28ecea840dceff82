use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use image::DynamicImage;
use log::{debug, warn};

use crate::api::DashboardApi;
use crate::api::http::HttpApi;
use crate::auth::login::{LoginOutcome, login};
use crate::auth::session_store::SessionStore;
use crate::domain::credentials::Credentials;
use crate::domain::mail::{MailId, MailRecord};
use crate::error::ApiError;
use crate::mail::loader::{MailQuery, TempFlag};
use crate::mail::preview::reply_preview;
use crate::pipeline::{Effect, Event, perform};
use crate::terminal::images;

/// Blocking work the UI thread asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    LoadMails { generation: u64, query: MailQuery },
    Preview(MailRecord),
    Pipeline { run: u64, effect: Effect },
    Image(String),
    Login(Credentials),
}

/// Results coming back to the UI thread.
pub enum Incoming {
    Mails {
        generation: u64,
        result: Result<Vec<MailRecord>, ApiError>,
    },
    Preview { id: MailId, text: String },
    Pipeline { run: u64, event: Event },
    Image { url: String, result: Result<DynamicImage, String> },
    Login(LoginOutcome),
}

/// Runs each [`Job`] on its own thread and reports over a channel.
pub struct Worker {
    api: Arc<HttpApi>,
    sessions: Arc<dyn SessionStore>,
    tx: Sender<Incoming>,
    localhost: bool,
}

impl Worker {
    pub fn new(
        api: Arc<HttpApi>,
        sessions: Arc<dyn SessionStore>,
        tx: Sender<Incoming>,
        localhost: bool,
    ) -> Self {
        Self {
            api,
            sessions,
            tx,
            localhost,
        }
    }

    pub fn dispatch(&self, job: Job) {
        debug!("dispatching {}", job_name(&job));
        let api = self.api.clone();
        let sessions = self.sessions.clone();
        let tx = self.tx.clone();
        let localhost = self.localhost;

        thread::spawn(move || {
            let msg = match job {
                Job::LoadMails { generation, query } => Some(Incoming::Mails {
                    generation,
                    result: api.search_mail(&query),
                }),
                Job::Preview(mail) => Some(Incoming::Preview {
                    text: reply_preview(&*api, &mail),
                    id: mail.id,
                }),
                Job::Pipeline { run, effect } => perform(&*api, &effect, localhost)
                    .map(|event| Incoming::Pipeline { run, event }),
                Job::Image(url) => {
                    let result = api
                        .fetch_image(&url)
                        .map_err(|e| e.to_string())
                        .and_then(|bytes| images::decode(&bytes));
                    Some(Incoming::Image { url, result })
                }
                Job::Login(credentials) => {
                    let outcome = login(&*api, &*sessions, &credentials);
                    if let LoginOutcome::Success { token } = &outcome {
                        api.set_session(Some(token.clone()));
                    }
                    Some(Incoming::Login(outcome))
                }
            };
            if let Some(msg) = msg
                && tx.send(msg).is_err()
            {
                warn!("ui went away before a job finished");
            }
        });
    }

    /// Query for the mail list with the current session.
    pub fn mail_query(&self, temp: TempFlag) -> MailQuery {
        MailQuery::new(self.api.session(), temp)
    }
}

fn job_name(job: &Job) -> &'static str {
    match job {
        Job::LoadMails { .. } => "load-mails",
        Job::Preview(_) => "preview",
        Job::Pipeline { .. } => "pipeline",
        Job::Image(_) => "image",
        Job::Login(_) => "login",
    }
}
