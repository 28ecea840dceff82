use log::{debug, info, warn};

use crate::api::DashboardApi;
use crate::domain::mail::MailRecord;
use crate::error::ApiError;

/// Placeholder sid used before anyone has logged in.
pub const GUEST_SID: &str = "guest";

/// The search endpoint's `temp` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempFlag {
    Yes,
    #[default]
    No,
}

impl TempFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            TempFlag::Yes => "yes",
            TempFlag::No => "no",
        }
    }

    /// Only an exact `yes` turns it on.
    pub fn parse(value: &str) -> Self {
        if value == "yes" {
            TempFlag::Yes
        } else {
            TempFlag::No
        }
    }

    /// Read `temp` from a page query string such as `?temp=yes&x=1`.
    pub fn from_query_string(qs: &str) -> Self {
        url::form_urlencoded::parse(qs.trim_start_matches('?').as_bytes())
            .find(|(k, _)| k == "temp")
            .map(|(_, v)| Self::parse(&v))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailQuery {
    pub sid: String,
    pub temp: TempFlag,
}

impl MailQuery {
    pub fn new(session: Option<String>, temp: TempFlag) -> Self {
        Self {
            sid: session
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| GUEST_SID.to_string()),
            temp,
        }
    }
}

/// Mail list state: records plus an in-flight flag.
///
/// Every request gets a generation from [`begin`](Self::begin); only the
/// newest one may change the list or clear `loading`.
#[derive(Debug, Default)]
pub struct MailListLoader {
    mails: Vec<MailRecord>,
    loading: bool,
    generation: u64,
}

impl MailListLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mails(&self) -> &[MailRecord] {
        &self.mails
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn get(&self, id: &str) -> Option<&MailRecord> {
        self.mails.iter().find(|m| m.id == id)
    }

    /// Marks a new request as outstanding and returns its generation. Pair
    /// with [`finish`](Self::finish).
    pub fn begin(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.generation
    }

    /// Applies the outcome of a search. A failure leaves the list empty and
    /// is only logged. Replies from superseded requests are dropped; returns
    /// whether this one was applied.
    pub fn finish(&mut self, generation: u64, result: Result<Vec<MailRecord>, ApiError>) -> bool {
        if generation != self.generation {
            debug!(
                "dropping mail list from request {generation}, current is {}",
                self.generation
            );
            return false;
        }
        match result {
            Ok(mails) => {
                info!("loaded {} mails", mails.len());
                self.mails = mails;
            }
            Err(e) => {
                warn!("mail list fetch failed: {e}");
                self.mails.clear();
            }
        }
        self.loading = false;
        true
    }

    /// Fetch synchronously.
    pub fn load(&mut self, api: &dyn DashboardApi, query: &MailQuery) -> &[MailRecord] {
        let generation = self.begin();
        let result = api.search_mail(query);
        self.finish(generation, result);
        &self.mails
    }
}
