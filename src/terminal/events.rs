use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::terminal::state::{AppState, Focus, ViewMode};
use crate::terminal::worker::Job;

/// What the loop should do after a key press.
#[derive(Debug, Default, PartialEq)]
pub struct KeyResult {
    pub quit: bool,
    pub jobs: Vec<Job>,
}

impl KeyResult {
    fn quit() -> Self {
        Self {
            quit: true,
            jobs: Vec::new(),
        }
    }

    fn jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        Self {
            quit: false,
            jobs: jobs.into_iter().collect(),
        }
    }
}

pub fn handle_key(key: KeyEvent, state: &mut AppState) -> KeyResult {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return KeyResult::quit();
    }

    if state.mode == ViewMode::Login {
        return handle_login_keys(key, state);
    }

    // The loader / result modal swallows everything until dismissed.
    if state.pipeline_visible() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) && !state.pipeline.state().in_flight()
        {
            state.dismiss_result();
        }
        return KeyResult::default();
    }

    match key.code {
        KeyCode::Char('q') => return KeyResult::quit(),

        KeyCode::Esc => {
            if state.banner.take().is_some() {
                return KeyResult::default();
            }
            if state.mode == ViewMode::Split {
                state.close_mail();
                return KeyResult::default();
            }
            return KeyResult::quit();
        }

        KeyCode::Enter => return KeyResult::jobs(state.open_selected()),

        KeyCode::Tab => {
            state.toggle_focus();
            return KeyResult::default();
        }

        KeyCode::Char('L') => {
            state.open_login();
            return KeyResult::default();
        }

        KeyCode::Char('s') => return KeyResult::jobs(state.start_inference()),
        KeyCode::Char('i') => return KeyResult::jobs(state.toggle_images()),
        KeyCode::Char('h') => return KeyResult::jobs(state.step_carousel(-1)),
        KeyCode::Char('l') => return KeyResult::jobs(state.step_carousel(1)),

        _ => {}
    }

    match state.focus {
        Focus::List => handle_list_keys(key, state),
        Focus::Body => handle_body_keys(key, state),
    }
    KeyResult::default()
}

fn handle_list_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.move_selection(1),
        KeyCode::Up | KeyCode::Char('k') => state.move_selection(-1),
        KeyCode::Home => state.list_state.select(Some(0)),
        KeyCode::End => {
            let len = state.loader.mails().len();
            if len > 0 {
                state.list_state.select(Some(len - 1));
            }
        }
        _ => {}
    }
}

fn handle_body_keys(key: KeyEvent, state: &mut AppState) {
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => state.scroll_body(1),
        KeyCode::Up | KeyCode::Char('k') => state.scroll_body(-1),
        KeyCode::PageDown => state.scroll_body(10),
        KeyCode::PageUp => state.scroll_body(-10),
        KeyCode::Home => state.body_scroll = 0,
        _ => {}
    }
}

fn handle_login_keys(key: KeyEvent, state: &mut AppState) -> KeyResult {
    match key.code {
        KeyCode::Esc => state.close_login(),
        KeyCode::Tab | KeyCode::Up | KeyCode::Down => {
            state.login.on_password = !state.login.on_password
        }
        KeyCode::Enter => return KeyResult::jobs(state.submit_login()),
        KeyCode::Backspace => {
            state.login.input().pop();
        }
        KeyCode::Char(c) => state.login.input().push(c),
        _ => {}
    }
    KeyResult::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mail::MailRecord;
    use crate::mail::loader::TempFlag;
    use crate::mail::sanitize::Sanitizer;
    use crate::terminal::worker::Incoming;

    fn press(state: &mut AppState, code: KeyCode) -> KeyResult {
        handle_key(KeyEvent::new(code, KeyModifiers::NONE), state)
    }

    fn state_with_mails() -> AppState {
        let mut s = AppState::new(Sanitizer::default(), TempFlag::No);
        let mails: Vec<MailRecord> = (1..=3)
            .map(|i| serde_json::from_value(serde_json::json!({"id": i.to_string()})).unwrap())
            .collect();
        let generation = s.loader.begin();
        s.receive(Incoming::Mails {
            generation,
            result: Ok(mails),
        });
        s
    }

    #[test]
    fn q_quits_and_esc_closes_first() {
        let mut s = state_with_mails();
        assert_eq!(s.mode, ViewMode::Split);
        assert!(!press(&mut s, KeyCode::Esc).quit);
        assert_eq!(s.mode, ViewMode::ListOnly);
        assert!(press(&mut s, KeyCode::Esc).quit);
        assert!(press(&mut s, KeyCode::Char('q')).quit);
    }

    #[test]
    fn typing_in_the_login_form() {
        let mut s = state_with_mails();
        press(&mut s, KeyCode::Char('L'));
        for c in "bob".chars() {
            press(&mut s, KeyCode::Char(c));
        }
        press(&mut s, KeyCode::Tab);
        for c in "pw".chars() {
            press(&mut s, KeyCode::Char(c));
        }
        press(&mut s, KeyCode::Backspace);
        assert_eq!(s.login.username, "bob");
        assert_eq!(s.login.password, "p");

        // 'q' is text here, not quit
        assert!(!press(&mut s, KeyCode::Char('q')).quit);
        assert!(press(&mut s, KeyCode::Enter).jobs.is_empty());
        assert_eq!(s.login.violations.len(), 1);
    }

    #[test]
    fn list_navigation_then_enter() {
        let mut s = state_with_mails();
        press(&mut s, KeyCode::Esc);
        press(&mut s, KeyCode::Char('j'));
        press(&mut s, KeyCode::Char('j'));
        press(&mut s, KeyCode::Char('j'));
        assert_eq!(s.list_state.selected(), Some(2));
        press(&mut s, KeyCode::Enter);
        assert_eq!(s.ctx.selected(), Some("3"));
        assert_eq!(s.focus, Focus::Body);
    }
}
