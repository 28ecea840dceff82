use log::{debug, info, warn};
use ratatui::widgets::ListState;
use ratatui_image::{picker::Picker, protocol::StatefulProtocol};

use crate::auth::login::{Banner, LoginOutcome};
use crate::domain::credentials::{Credentials, FieldViolation};
use crate::domain::mail::{MailId, MailRecord};
use crate::mail::loader::{MailListLoader, MailQuery, TempFlag};
use crate::mail::sanitize::{Sanitizer, to_text};
use crate::pipeline::{Effect, Event, Pipeline, PipelineState};
use crate::store::AppContext;
use crate::terminal::images;
use crate::terminal::worker::{Incoming, Job};

const BODY_WIDTH: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    List,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    ListOnly,
    Split,
    Login,
}

#[derive(Debug, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub on_password: bool,
    pub violations: Vec<FieldViolation>,
    pub submitting: bool,
}

impl LoginForm {
    pub fn input(&mut self) -> &mut String {
        if self.on_password {
            &mut self.password
        } else {
            &mut self.username
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }
}

pub struct AppState {
    pub ctx: AppContext,
    pub loader: MailListLoader,
    pub list_state: ListState,
    pub temp: TempFlag,

    pub focus: Focus,
    pub mode: ViewMode,
    pub previous: Option<ViewMode>,

    /// Sanitized body of the selected mail, rendered to text.
    pub body_text: String,
    pub body_scroll: u16,
    pub reply: String,
    pub reply_loading: bool,

    pub pipeline: Pipeline,
    pub banner: Option<Banner>,
    pub login: LoginForm,

    // Images
    pub show_images: bool,
    pub carousel: usize,
    pub img_url: Option<String>,
    pub img_picker: Option<Picker>,
    pub img_state: Option<StatefulProtocol>,

    sanitizer: Sanitizer,
}

impl AppState {
    pub fn new(sanitizer: Sanitizer, temp: TempFlag) -> Self {
        Self {
            ctx: AppContext::new(),
            loader: MailListLoader::new(),
            list_state: ListState::default(),
            temp,
            focus: Focus::List,
            mode: ViewMode::ListOnly,
            previous: None,
            body_text: String::new(),
            body_scroll: 0,
            reply: String::new(),
            reply_loading: false,
            pipeline: Pipeline::new(),
            banner: None,
            login: LoginForm::default(),
            show_images: false,
            carousel: 0,
            img_url: None,
            img_picker: None,
            img_state: None,
            sanitizer,
        }
    }

    pub fn load_mails(&mut self, query: MailQuery) -> Job {
        let generation = self.loader.begin();
        Job::LoadMails { generation, query }
    }

    pub fn selected_mail(&self) -> Option<&MailRecord> {
        self.loader.get(self.ctx.selected()?)
    }

    fn cursor_id(&self) -> Option<MailId> {
        let idx = self.list_state.selected()?;
        self.loader.mails().get(idx).map(|m| m.id.clone())
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.loader.mails().len() as i32;
        if len == 0 {
            self.list_state.select(None);
            return;
        }
        let cur = self.list_state.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, len - 1) as usize;
        self.list_state.select(Some(next));
    }

    /// Show the mail under the cursor in the detail pane.
    pub fn open_selected(&mut self) -> Vec<Job> {
        match self.cursor_id() {
            Some(id) => self.open(id),
            None => Vec::new(),
        }
    }

    fn open(&mut self, id: MailId) -> Vec<Job> {
        self.ctx.select(Some(id));
        let Some(mail) = self.selected_mail().cloned() else {
            return Vec::new();
        };

        self.mode = ViewMode::Split;
        self.focus = Focus::Body;
        self.body_scroll = 0;
        self.body_text = match mail.html() {
            Some(html) => to_text(&self.sanitizer.clean(html), BODY_WIDTH),
            None => mail.text.clone(),
        };
        self.carousel = 0;
        self.img_url = None;
        self.img_state = None;
        self.reply.clear();
        self.reply_loading = !mail.text.is_empty();

        let mut jobs = Vec::new();
        if self.reply_loading {
            jobs.push(Job::Preview(mail));
        }
        jobs.extend(self.image_job());
        jobs
    }

    pub fn close_mail(&mut self) {
        self.mode = ViewMode::ListOnly;
        self.focus = Focus::List;
        self.body_scroll = 0;
        self.img_state = None;
        self.img_url = None;
    }

    pub fn toggle_focus(&mut self) {
        if self.mode != ViewMode::Split {
            return;
        }
        self.focus = match self.focus {
            Focus::List => Focus::Body,
            Focus::Body => Focus::List,
        };
    }

    pub fn scroll_body(&mut self, delta: i32) {
        if self.mode != ViewMode::Split {
            return;
        }
        if delta < 0 {
            self.body_scroll = self.body_scroll.saturating_sub((-delta) as u16);
        } else {
            self.body_scroll = self.body_scroll.saturating_add(delta as u16);
        }
    }

    // ----- Images -----

    pub fn carousel_urls(&self) -> Vec<String> {
        self.selected_mail()
            .map(images::carousel_urls)
            .unwrap_or_default()
    }

    pub fn toggle_images(&mut self) -> Vec<Job> {
        self.show_images = !self.show_images;
        self.img_state = None;
        self.img_url = None;
        self.image_job().into_iter().collect()
    }

    pub fn step_carousel(&mut self, delta: i32) -> Vec<Job> {
        let len = self.carousel_urls().len();
        if len == 0 {
            return Vec::new();
        }
        self.carousel = (self.carousel as i64 + delta as i64).rem_euclid(len as i64) as usize;
        self.img_state = None;
        self.image_job().into_iter().collect()
    }

    fn image_job(&mut self) -> Option<Job> {
        if !self.show_images || self.mode != ViewMode::Split {
            return None;
        }
        let url = self.carousel_urls().into_iter().nth(self.carousel)?;
        self.img_url = Some(url.clone());
        Some(Job::Image(url))
    }

    // ----- Inference -----

    /// Run prefill then inference on the selected mail's text.
    pub fn start_inference(&mut self) -> Vec<Job> {
        let Some(description) = self.selected_mail().map(|m| m.text.clone()) else {
            return Vec::new();
        };
        let effects = self.pipeline.start(&description);
        self.follow(effects)
    }

    /// Dismiss a finished or failed run.
    pub fn dismiss_result(&mut self) {
        self.pipeline.reset();
    }

    pub fn pipeline_visible(&self) -> bool {
        !matches!(self.pipeline.state(), PipelineState::Idle)
    }

    fn follow(&mut self, effects: Vec<Effect>) -> Vec<Job> {
        let run = self.pipeline.run();
        let mut jobs = Vec::new();
        let mut queue = effects;
        while !queue.is_empty() {
            let mut next = Vec::new();
            for effect in queue {
                match effect {
                    Effect::Step(_) => {}
                    // no I/O, feed straight back
                    Effect::Chain => next.extend(self.pipeline.handle(run, Event::Chain)),
                    Effect::Show(_) => info!("inference run {run} finished"),
                    Effect::Fail(message) => warn!("inference run {run} failed: {message}"),
                    effect @ (Effect::Prefill { .. } | Effect::Infer(_)) => {
                        jobs.push(Job::Pipeline { run, effect })
                    }
                }
            }
            queue = next;
        }
        jobs
    }

    // ----- Login -----

    pub fn open_login(&mut self) {
        if self.mode != ViewMode::Login {
            self.previous = Some(self.mode);
        }
        self.mode = ViewMode::Login;
        self.login = LoginForm::default();
    }

    pub fn close_login(&mut self) {
        self.mode = self.previous.take().unwrap_or_default();
    }

    /// Validate locally; only a valid form produces a job.
    pub fn submit_login(&mut self) -> Option<Job> {
        if self.login.submitting {
            return None;
        }
        let credentials = self.login.credentials();
        match credentials.validate() {
            Err(violations) => {
                self.login.violations = violations;
                None
            }
            Ok(()) => {
                self.login.violations.clear();
                self.login.submitting = true;
                Some(Job::Login(credentials))
            }
        }
    }

    // ----- Worker results -----

    pub fn receive(&mut self, msg: Incoming) -> Vec<Job> {
        match msg {
            Incoming::Mails { generation, result } => {
                if !self.loader.finish(generation, result) {
                    return Vec::new();
                }
                let first = self.loader.mails().first().map(|m| m.id.clone());
                self.list_state.select(first.as_ref().map(|_| 0));
                match first {
                    Some(id) => self.open(id),
                    None => {
                        self.ctx.select(None);
                        self.close_mail();
                        Vec::new()
                    }
                }
            }
            Incoming::Preview { id, text } => {
                if self.ctx.selected() == Some(id.as_str()) {
                    self.reply = text;
                    self.reply_loading = false;
                } else {
                    debug!("dropping preview for {id}, no longer selected");
                }
                Vec::new()
            }
            Incoming::Pipeline { run, event } => {
                let effects = self.pipeline.handle(run, event);
                self.follow(effects)
            }
            Incoming::Image { url, result } => {
                if self.img_url.as_deref() != Some(url.as_str()) {
                    return Vec::new();
                }
                match (result, self.img_picker.as_mut()) {
                    (Ok(img), Some(picker)) => {
                        self.img_state = Some(picker.new_resize_protocol(img));
                    }
                    (Ok(_), None) => debug!("no image protocol available"),
                    (Err(e), _) => {
                        warn!("image {url} failed: {e}");
                        self.img_state = None;
                    }
                }
                Vec::new()
            }
            Incoming::Login(outcome) => {
                self.login.submitting = false;
                self.banner = outcome.banner();
                match outcome {
                    LoginOutcome::Invalid(violations) => {
                        self.login.violations = violations;
                        Vec::new()
                    }
                    LoginOutcome::Success { token } => {
                        self.close_login();
                        vec![self.load_mails(MailQuery::new(Some(token), self.temp))]
                    }
                    LoginOutcome::Failed(_) => Vec::new(),
                }
            }
        }
    }
}
