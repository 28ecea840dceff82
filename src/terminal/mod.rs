pub mod events;
pub mod images;
pub mod state;
pub mod ui;
pub mod worker;

use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use color_eyre::eyre::Result;
use ratatui::DefaultTerminal;
use ratatui::crossterm::event::{self, Event, KeyEventKind};
use ratatui_image::picker::Picker;

use crate::api::http::HttpApi;
use crate::auth::session_store::SessionStore;
use crate::mail::loader::TempFlag;
use crate::mail::sanitize::Sanitizer;
use crate::terminal::state::AppState;
use crate::terminal::worker::{Incoming, Worker};

const TICK: Duration = Duration::from_millis(100);

pub struct TuiOptions {
    pub temp: TempFlag,
    pub link_base: String,
    pub llm_localhost: bool,
}

pub fn run_tui(
    api: Arc<HttpApi>,
    sessions: Arc<dyn SessionStore>,
    opts: TuiOptions,
) -> Result<()> {
    color_eyre::install()?;

    let sanitizer = Sanitizer::new(&opts.link_base).map_err(|e| color_eyre::eyre::eyre!("{e}"))?;
    let (tx, rx) = mpsc::channel();
    let worker = Worker::new(api, sessions, tx, opts.llm_localhost);

    let mut state = AppState::new(sanitizer, opts.temp);

    let terminal = ratatui::init();
    // Must run after entering the alternate screen.
    state.img_picker = Picker::from_query_stdio().ok();

    let first = state.load_mails(worker.mail_query(opts.temp));
    worker.dispatch(first);

    let result = run(terminal, &mut state, &worker, &rx);

    ratatui::restore();

    result
}

fn run(
    mut terminal: DefaultTerminal,
    state: &mut AppState,
    worker: &Worker,
    rx: &Receiver<Incoming>,
) -> Result<()> {
    loop {
        while let Ok(msg) = rx.try_recv() {
            for job in state.receive(msg) {
                worker.dispatch(job);
            }
        }

        terminal.draw(|f| ui::render(f, state))?;

        if !event::poll(TICK)? {
            continue;
        }
        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            let outcome = events::handle_key(key, state);
            for job in outcome.jobs {
                worker.dispatch(job);
            }
            if outcome.quit {
                break;
            }
        }
    }
    Ok(())
}
