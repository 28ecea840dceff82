use std::sync::Mutex;

use anyhow::{Result, anyhow};
use keyring::{Entry, Error as KeyringError};
use log::warn;

use crate::api::SESSION_COOKIE;

const SERVICE: &str = "mail_dashboard";

/// Where the session token lives between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&self, token: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stored token, or `None` when the store cannot be read. A broken keyring
/// (no Secret Service on a headless box, say) only costs the session.
pub fn load_or_guest(store: &dyn SessionStore) -> Option<String> {
    store.load().unwrap_or_else(|e| {
        warn!("could not read stored session, continuing as guest: {e}");
        None
    })
}

/// OS keyring, one entry named after the session cookie.
pub struct KeyringSessionStore {
    service: String,
}

impl KeyringSessionStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE.to_string(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, SESSION_COOKIE).map_err(|e| anyhow!(e.to_string()))
    }
}

impl Default for KeyringSessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringSessionStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(v) => Ok(Some(v)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(KeyringError::NoEntry) => Ok(()),
            Err(e) => Err(anyhow!(e.to_string())),
        }
    }
}

/// Process-local store, for `--no-keyring` and tests.
#[derive(Default)]
pub struct MemorySessionStore {
    token: Mutex<Option<String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<String>> {
        let token = self.token.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        Ok(token.clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        let mut slot = self.token.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.token.lock().map_err(|_| anyhow!("session lock poisoned"))?;
        *slot = None;
        Ok(())
    }
}
