use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use ratatui_image::StatefulImage;

use crate::auth::login::BannerKind;
use crate::pipeline::{PipelineState, Step};
use crate::pipeline::machine::{ERROR_LABELS, STEP_LABELS};
use crate::terminal::state::{AppState, Focus, ViewMode};

pub fn render(f: &mut Frame, state: &mut AppState) {
    let [main, footer] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(f.area());

    if state.mode == ViewMode::ListOnly {
        render_list(f, state, main);
    } else {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
                .margin(1)
                .areas(main);
        render_list(f, state, left);
        render_detail(f, state, right);
    }

    render_footer(f, footer);

    if let Some(banner) = &state.banner {
        let color = match banner.kind {
            BannerKind::Success => Color::Green,
            BannerKind::Failure => Color::Red,
        };
        let area = Rect { height: 1, ..f.area() };
        f.render_widget(Clear, area);
        f.render_widget(
            Paragraph::new(banner.text.as_str()).style(Style::default().fg(Color::Black).bg(color)),
            area,
        );
    }

    if state.mode == ViewMode::Login {
        render_login(f, state);
    }
    if state.pipeline_visible() {
        render_pipeline(f, state);
    }
}

fn border(active: bool) -> Style {
    Style::default().fg(if active { Color::Yellow } else { Color::DarkGray })
}

fn render_list(f: &mut Frame, state: &mut AppState, area: Rect) {
    let title = if state.loader.loading() {
        " Inbox (loading...) ".to_string()
    } else {
        format!(" Inbox ({}) ", state.loader.mails().len())
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border(state.focus == Focus::List));

    let selected = state.ctx.selected().map(str::to_string);
    let items: Vec<ListItem> = state
        .loader
        .mails()
        .iter()
        .map(|m| {
            let mut name = Style::default();
            if !m.read {
                name = name.add_modifier(Modifier::BOLD);
            }
            if selected.as_deref() == Some(m.id.as_str()) {
                name = name.fg(Color::Cyan);
            }
            let mut head = vec![Span::styled(m.name.clone(), name)];
            if let Some(date) = m.date() {
                head.push(Span::styled(format!("  {date}"), Style::default().fg(Color::Gray)));
            }
            let labels: Vec<Span> = m
                .labels
                .iter()
                .map(|l| Span::styled(format!("[{}] ", l.display()), Style::default().fg(Color::Magenta)))
                .collect();
            ListItem::new(Text::from(vec![
                Line::from(head),
                Line::from(Span::raw(m.subject.clone())),
                Line::from(labels),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_symbol("➜ ")
        .highlight_style(Style::default().fg(Color::Green));

    f.render_stateful_widget(list, area, &mut state.list_state);
}

fn render_detail(f: &mut Frame, state: &mut AppState, area: Rect) {
    let Some(mail) = state.selected_mail() else {
        f.render_widget(
            Paragraph::new("No message selected").block(Block::default().borders(Borders::ALL)),
            area,
        );
        return;
    };

    let title = format!(" {} <{}> ", mail.name, mail.email);
    let subject = mail.subject.clone();

    let image_height = if state.show_images { 12 } else { 0 };
    let [head, body, images, reply] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(5),
        Constraint::Length(image_height),
        Constraint::Length(8),
    ])
    .areas(area);

    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            subject,
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .block(Block::default().title(title).borders(Borders::TOP)),
        head,
    );

    f.render_widget(
        Paragraph::new(state.body_text.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border(state.focus == Focus::Body)),
            )
            .wrap(Wrap { trim: false })
            .scroll((state.body_scroll, 0)),
        body,
    );

    if state.show_images {
        let count = state.carousel_urls().len();
        let block = Block::default()
            .title(format!(" Images {}/{} (h/l) ", (state.carousel + 1).min(count), count))
            .borders(Borders::ALL);
        let inner = block.inner(images);
        f.render_widget(block, images);
        match state.img_state.as_mut() {
            Some(protocol) => f.render_stateful_widget(StatefulImage::default(), inner, protocol),
            None if count > 0 => f.render_widget(Paragraph::new("loading..."), inner),
            None => f.render_widget(Paragraph::new("no images"), inner),
        }
    }

    let reply_text = if state.reply_loading {
        "Loading..."
    } else {
        state.reply.as_str()
    };
    f.render_widget(
        Paragraph::new(reply_text)
            .block(Block::default().title(" Reply (s: send) ").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        reply,
    );
}

fn render_footer(f: &mut Frame, area: Rect) {
    let key = |k: &'static str| Span::styled(k, Style::default().add_modifier(Modifier::BOLD));
    let hint = Paragraph::new(Line::from(vec![
        key("j/k"),
        Span::raw(" move  "),
        key("Enter"),
        Span::raw(" open  "),
        key("Tab"),
        Span::raw(" focus  "),
        key("s"),
        Span::raw(" infer  "),
        key("i"),
        Span::raw(" images  "),
        key("L"),
        Span::raw(" login  "),
        key("q"),
        Span::raw(" quit"),
    ]));
    f.render_widget(hint, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn render_login(f: &mut Frame, state: &AppState) {
    let area = centered(f.area(), 50, 9);
    f.render_widget(Clear, area);

    let form = &state.login;
    let field = |label: &str, value: String, active: bool| {
        let style = if active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(format!("{label:<10}"), style),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        field("Username", form.username.clone(), !form.on_password),
        field("Password", "*".repeat(form.password.chars().count()), form.on_password),
        Line::default(),
    ];
    for v in &form.violations {
        lines.push(Line::from(Span::styled(
            v.message.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    if form.submitting {
        lines.push(Line::from("Logging in..."));
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Login (Enter submit, Esc cancel) ")
                .borders(Borders::ALL),
        ),
        area,
    );
}

fn render_pipeline(f: &mut Frame, state: &AppState) {
    match state.pipeline.state() {
        PipelineState::Done(result) => {
            let area = centered(f.area(), f.area().width.saturating_sub(8), f.area().height.saturating_sub(4));
            f.render_widget(Clear, area);
            f.render_widget(
                Paragraph::new(result.pretty())
                    .block(Block::default().title(" Result (Esc close) ").borders(Borders::ALL))
                    .wrap(Wrap { trim: false }),
                area,
            );
        }
        _ => {
            let current = state.pipeline.current_step();
            let labels = if current == Some(Step::Error) {
                ERROR_LABELS
            } else {
                STEP_LABELS
            };
            let reached = state.pipeline.steps();
            let mut lines: Vec<Line> = labels
                .iter()
                .enumerate()
                .map(|(slot, label)| {
                    let style = match current {
                        Some(step) if step.slot() == slot && step == Step::Error => {
                            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                        }
                        Some(step) if step.slot() == slot => {
                            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
                        }
                        _ if reached.iter().any(|s| *s != Step::Error && s.slot() == slot) => {
                            Style::default().fg(Color::Green)
                        }
                        _ => Style::default().fg(Color::DarkGray),
                    };
                    Line::from(Span::styled(*label, style))
                })
                .collect();
            if let PipelineState::Error(message) = state.pipeline.state() {
                lines.push(Line::default());
                lines.push(Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red),
                )));
            }

            let area = centered(f.area(), 50, lines.len() as u16 + 2);
            f.render_widget(Clear, area);
            f.render_widget(
                Paragraph::new(lines)
                    .block(Block::default().title(" Inference ").borders(Borders::ALL))
                    .wrap(Wrap { trim: false }),
                area,
            );
        }
    }
}
