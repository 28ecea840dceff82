use anyhow::Result;
use log::{info, warn};

use crate::api::DashboardApi;
use crate::auth::session_store::SessionStore;
use crate::domain::credentials::{Credentials, FieldViolation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Rejected before anything was sent.
    Invalid(Vec<FieldViolation>),
    /// Token issued and stored.
    Success { token: String },
    /// The server refused or could not be reached.
    Failed(String),
}

/// Banner variant shown for a finished login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub text: String,
}

impl LoginOutcome {
    /// Invalid input is reported inline on the form, not in a banner.
    pub fn banner(&self) -> Option<Banner> {
        match self {
            LoginOutcome::Invalid(_) => None,
            LoginOutcome::Success { .. } => Some(Banner {
                kind: BannerKind::Success,
                text: "Login successful!".into(),
            }),
            LoginOutcome::Failed(reason) => Some(Banner {
                kind: BannerKind::Failure,
                text: format!("Login failed! {reason}"),
            }),
        }
    }
}

pub fn login(
    api: &dyn DashboardApi,
    store: &dyn SessionStore,
    credentials: &Credentials,
) -> LoginOutcome {
    if let Err(violations) = credentials.validate() {
        return LoginOutcome::Invalid(violations);
    }

    match api.login(credentials) {
        Ok(token) => {
            if let Err(e) = store.save(&token) {
                // The token still works for this run.
                warn!("could not persist session token: {e}");
            }
            info!(
                "logged in as {}",
                credentials.username.as_deref().unwrap_or("(anonymous)")
            );
            LoginOutcome::Success { token }
        }
        Err(e) => {
            warn!("login failed: {e}");
            LoginOutcome::Failed(e.user_message("invalid credentials"))
        }
    }
}

pub fn logout(store: &dyn SessionStore) -> Result<()> {
    store.clear()?;
    info!("session cleared");
    Ok(())
}
