//! Per-campaign search session record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionKeyError;
use crate::filter::SearchFilter;
use crate::result::DiscoveredResult;
use crate::schedule::{self, LoadSchedule};

// ============================================================================
// Session Key
// ============================================================================

/// Identity a session is persisted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum SessionKey {
    /// No campaign exists yet.
    Global,
    Campaign(Uuid),
}

impl SessionKey {
    pub fn campaign(&self) -> Option<Uuid> {
        match self {
            SessionKey::Global => None,
            SessionKey::Campaign(id) => Some(*id),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKey::Global => write!(f, "global"),
            SessionKey::Campaign(id) => write!(f, "campaign:{}", id),
        }
    }
}

impl FromStr for SessionKey {
    type Err = SessionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "global" {
            return Ok(SessionKey::Global);
        }
        s.strip_prefix("campaign:")
            .and_then(|id| Uuid::parse_str(id).ok())
            .map(SessionKey::Campaign)
            .ok_or_else(|| SessionKeyError(s.to_string()))
    }
}

impl From<SessionKey> for String {
    fn from(key: SessionKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for SessionKey {
    type Error = SessionKeyError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Option<Uuid>> for SessionKey {
    fn from(campaign: Option<Uuid>) -> Self {
        campaign.map_or(SessionKey::Global, SessionKey::Campaign)
    }
}

// ============================================================================
// Tabs and Requests
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultTab {
    #[default]
    Discovered,
    Shortlisted,
}

/// Whether a fetch replaces or extends the held results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Reset,
    Append,
}

/// The one request whose response the session will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlight {
    pub seq: u64,
    pub mode: FetchMode,
}

// ============================================================================
// SearchSession
// ============================================================================

/// State of one discovery search, keyed by campaign.
///
/// Fields marked `serde(skip)` belong to the current mount and are never
/// persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub key: SessionKey,
    #[serde(default)]
    pub filter: SearchFilter,
    #[serde(default)]
    pub results: Vec<DiscoveredResult>,
    /// Total declared by the server; never computed locally.
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub tab: ResultTab,
    #[serde(default)]
    pub platform: Option<String>,
    /// Completed fetch rounds since the last reset.
    #[serde(default)]
    pub round: u32,
    /// Set once filters were explicitly applied; gates platform-switch fetches.
    #[serde(default)]
    pub filters_active: bool,
    /// Identity of the last ingested external batch.
    #[serde(default)]
    pub last_batch: Option<DateTime<Utc>>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,

    /// Restore-once guard for the current mount.
    #[serde(skip)]
    pub restored: bool,
    /// Last issued request sequence number.
    #[serde(skip)]
    pub request_seq: u64,
    #[serde(skip)]
    pub in_flight: Option<InFlight>,
}

impl SearchSession {
    pub fn new(key: SessionKey) -> Self {
        Self {
            key,
            filter: SearchFilter::default(),
            results: Vec::new(),
            total: 0,
            tab: ResultTab::default(),
            platform: None,
            round: 0,
            filters_active: false,
            last_batch: None,
            saved_at: None,
            restored: false,
            request_seq: 0,
            in_flight: None,
        }
    }

    /// Results the server still holds beyond what has been loaded.
    pub fn remaining(&self) -> u64 {
        schedule::remaining(self.total, self.results.len())
    }

    /// Size of the next "load more" page.
    pub fn next_batch_size(&self, schedule: &LoadSchedule) -> u32 {
        schedule.next_batch(self.round, self.total, self.results.len())
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Issue a new request sequence number and mark it as the one to accept.
    pub fn begin_request(&mut self, mode: FetchMode) -> u64 {
        self.request_seq += 1;
        self.in_flight = Some(InFlight {
            seq: self.request_seq,
            mode,
        });
        self.request_seq
    }

    /// Take the in-flight marker if `seq` is the outstanding request.
    pub fn settle_request(&mut self, seq: u64) -> Option<FetchMode> {
        match self.in_flight {
            Some(flight) if flight.seq == seq => {
                self.in_flight = None;
                Some(flight.mode)
            }
            _ => None,
        }
    }

    /// Drop any outstanding request so its response is discarded on arrival.
    pub fn supersede_request(&mut self) {
        self.in_flight = None;
    }

    /// Copy every persisted field from `stored`, keeping mount-local state.
    pub fn restore_from(&mut self, stored: SearchSession) {
        let restored = SearchSession {
            key: self.key,
            restored: true,
            request_seq: self.request_seq,
            in_flight: self.in_flight,
            ..stored
        };
        *self = restored;
    }
}
