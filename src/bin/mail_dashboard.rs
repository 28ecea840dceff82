use std::io::Read;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};

use mail_dashboard::api::http::HttpApi;
use mail_dashboard::auth::login::{LoginOutcome, login, logout};
use mail_dashboard::auth::session_store::{
    KeyringSessionStore, MemorySessionStore, SessionStore, load_or_guest,
};
use mail_dashboard::config::load_config;
use mail_dashboard::domain::credentials::Credentials;
use mail_dashboard::mail::loader::{MailListLoader, MailQuery, TempFlag};
use mail_dashboard::mail::sanitize::{Sanitizer, to_text};
use mail_dashboard::pipeline::machine::{ERROR_LABELS, STEP_LABELS};
use mail_dashboard::pipeline::{Pipeline, PipelineState, Step, run};
use mail_dashboard::terminal::{TuiOptions, run_tui};

#[derive(Parser)]
#[command(name = "mail_dashboard")]
#[command(about = "Mail dashboard with a prefill -> LLM inference pipeline", long_about = None)]
struct Cli {
    /// Backend origin; overrides config and environment
    #[arg(long, global = true)]
    api: Option<String>,

    /// Keep the session in memory only
    #[arg(long, global = true)]
    no_keyring: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the TUI
    Tui {
        /// Page query string, e.g. `?temp=yes`
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        temp: Option<String>,
    },

    /// Log in and remember the session
    Login {
        #[arg(long, default_value = "")]
        username: String,

        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Print the mail list
    List {
        #[arg(long)]
        temp: Option<String>,
    },

    /// Print one mail, sanitized and rendered as text
    Show { id: String },

    /// Run prefill + inference on one mail's text
    Infer { id: String },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let mut cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
    if let Some(api) = cli.api {
        cfg.api_base = api;
    }

    let sessions: Arc<dyn SessionStore> = if cli.no_keyring {
        Arc::new(MemorySessionStore::new())
    } else {
        Arc::new(KeyringSessionStore::new())
    };
    let api = HttpApi::new(&cfg.api_base)?.with_session(load_or_guest(&*sessions));

    match cli.cmd {
        Command::Tui { query, temp } => {
            let temp = match (temp, query) {
                (Some(t), _) => TempFlag::parse(&t),
                (None, Some(qs)) => TempFlag::from_query_string(&qs),
                (None, None) => cfg.temp_flag(),
            };
            let opts = TuiOptions {
                temp,
                link_base: cfg.link_base.clone(),
                llm_localhost: cfg.llm_localhost,
            };
            run_tui(Arc::new(api), sessions, opts).map_err(|e| anyhow!("{e:?}"))
        }

        Command::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => {
                    eprintln!("Password (end with Ctrl-D):");
                    let mut p = String::new();
                    std::io::stdin().read_to_string(&mut p)?;
                    p.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            let outcome = login(&api, sessions.as_ref(), &Credentials::new(username, password));
            match &outcome {
                LoginOutcome::Invalid(violations) => {
                    let msgs: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
                    Err(anyhow!(msgs.join(" ")))
                }
                LoginOutcome::Success { .. } => {
                    if let Some(b) = outcome.banner() {
                        println!("{}", b.text);
                    }
                    Ok(())
                }
                LoginOutcome::Failed(_) => Err(anyhow!(
                    outcome.banner().map(|b| b.text).unwrap_or_default()
                )),
            }
        }

        Command::Logout => {
            logout(sessions.as_ref())?;
            println!("Logged out");
            Ok(())
        }

        Command::List { temp } => {
            let temp = temp.map(|t| TempFlag::parse(&t)).unwrap_or(cfg.temp_flag());
            let query = MailQuery::new(api.session(), temp);
            let mut loader = MailListLoader::new();
            for m in loader.load(&api, &query) {
                let unread = if m.read { ' ' } else { '*' };
                let labels: Vec<String> = m.labels.iter().map(|l| l.display()).collect();
                println!(
                    "{unread} {:<10} {:<20} {}  [{}]",
                    m.id,
                    m.name,
                    m.subject,
                    labels.join(", ")
                );
            }
            Ok(())
        }

        Command::Show { id } => {
            let query = MailQuery::new(api.session(), cfg.temp_flag());
            let mut loader = MailListLoader::new();
            loader.load(&api, &query);
            let mail = loader.get(&id).ok_or_else(|| anyhow!("no mail with id {id}"))?;

            println!("From: {} <{}>", mail.name, mail.email);
            println!("Subject: {}", mail.subject);
            if let Some(date) = mail.date() {
                println!("Date: {date}");
            }
            println!();
            match mail.html() {
                Some(html) => {
                    let clean = Sanitizer::new(&cfg.link_base)?.clean(html);
                    println!("{}", to_text(&clean, 100));
                }
                None => println!("{}", mail.text),
            }
            Ok(())
        }

        Command::Infer { id } => {
            let query = MailQuery::new(api.session(), cfg.temp_flag());
            let mut loader = MailListLoader::new();
            loader.load(&api, &query);
            let mail = loader.get(&id).ok_or_else(|| anyhow!("no mail with id {id}"))?;

            let mut pipeline = Pipeline::new();
            let state = run(&mut pipeline, &api, &mail.text, cfg.llm_localhost, |step| {
                let label = match step {
                    Step::Error => ERROR_LABELS[step.slot()],
                    s => STEP_LABELS[s.slot()],
                };
                eprintln!("[{}] {label}", step.marker());
            });
            match state {
                PipelineState::Done(result) => {
                    println!("{}", result.pretty());
                    Ok(())
                }
                PipelineState::Error(message) => Err(anyhow!(message.clone())),
                _ => Err(anyhow!("mail {id} has no text to infer from")),
            }
        }
    }
}
