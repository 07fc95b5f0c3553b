//! The discovery search state machine.
//!
//! [`DiscoveryMachine`] owns one campaign's [`SearchSession`] for the
//! lifetime of a mount. It turns user triggers, timer ticks, backend
//! responses and external batches into session mutations and, at most one
//! per event, [`DiscoveryCommand`]s for the engine to execute.
//!
//! # Lifecycle
//!
//! ```text
//! Created --Mounted--> Restoring --SessionLoaded--> LoadingPlatforms --PlatformsLoaded--> Ready
//!                                        \_____________(platforms cached)______________/
//! Ready --Unmounted--> Closed
//! ```
//!
//! User triggers are ignored until the machine is `Ready`, so nothing
//! fetches before the persisted session has been restored.
//!
//! # Triggers
//!
//! | Trigger          | Latency            | Fetch                         |
//! |------------------|--------------------|-------------------------------|
//! | text edit        | debounced          | reset                         |
//! | apply filters    | immediate          | reset                         |
//! | sort change      | immediate          | reset                         |
//! | platform switch  | immediate          | reset, only if filters active |
//! | clear filters    | immediate          | reset                         |
//! | load more        | immediate          | append, one at a time         |

use tracing::{debug, info, warn};

use crate::aggregate;
use crate::api::SearchResponse;
use crate::config::DiscoveryConfig;
use crate::defaults::Composer;
use crate::filter::{SearchFilter, SortSpec};
use crate::ingest::{self, ExternalResultBatch, IngestOutcome};
use crate::machine::{Machine, Timed};
use crate::platform::{PlatformList, PlatformRegistry};
use crate::schedule::LoadSchedule;
use crate::session::{FetchMode, ResultTab, SearchSession, SessionKey};
use crate::timer::{Millis, TimerKind, Timers};

// ============================================================================
// Events and Commands
// ============================================================================

/// Everything the machine reacts to.
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// The discovery tab was opened for the machine's key.
    Mounted,
    /// Answer to [`DiscoveryCommand::LoadSession`].
    SessionLoaded(Option<Box<SearchSession>>),
    /// The store could not be read; treated as "nothing saved".
    SessionLoadFailed { error: String },
    PlatformsLoaded(PlatformList),
    PlatformsFailed { error: String },
    /// The discovery tab was closed.
    Unmounted,

    TextEdited(String),
    FiltersApplied(SearchFilter),
    SortChanged(SortSpec),
    PlatformSelected(String),
    FiltersCleared,
    TabSelected(ResultTab),
    LoadMoreRequested,

    SearchCompleted { seq: u64, response: SearchResponse },
    SearchFailed { seq: u64, error: String },

    BatchReceived(ExternalResultBatch),

    /// Logical clock advanced; fires at most one due timer.
    Tick,
}

impl DiscoveryEvent {
    pub fn at(self, at: Millis) -> Timed<Self> {
        Timed::new(at, self)
    }
}

/// IO the machine asks the engine to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryCommand {
    LoadSession {
        key: SessionKey,
    },
    LoadPlatforms,
    /// Run a search. `filter` is fully composed and paged.
    Search {
        seq: u64,
        mode: FetchMode,
        filter: SearchFilter,
    },
    PersistSession {
        session: Box<SearchSession>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Created,
    Restoring,
    LoadingPlatforms,
    Ready,
    Closed,
}

/// Read-only view published to the UI after every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoverySnapshot {
    pub phase: Phase,
    pub session: SearchSession,
    pub remaining: u64,
    pub next_batch_size: u32,
}

impl DiscoverySnapshot {
    pub fn is_loading(&self) -> bool {
        self.session.is_loading()
    }

    pub fn can_load_more(&self) -> bool {
        self.phase == Phase::Ready && !self.is_loading() && self.next_batch_size > 0
    }
}

// ============================================================================
// DiscoveryMachine
// ============================================================================

pub struct DiscoveryMachine {
    phase: Phase,
    session: SearchSession,
    registry: PlatformRegistry,
    composer: Composer,
    schedule: LoadSchedule,
    timers: Timers,
    search_debounce: Millis,
    persist_debounce: Millis,
    /// Whether the store returned a record on mount.
    had_record: bool,
    /// Batch that arrived before the session was restored.
    early_batch: Option<ExternalResultBatch>,
    now: Millis,
}

impl DiscoveryMachine {
    pub fn new(key: SessionKey, config: &DiscoveryConfig) -> Self {
        Self {
            phase: Phase::Created,
            session: SearchSession::new(key),
            registry: PlatformRegistry::new(),
            composer: Composer::new(config.defaults.clone()),
            schedule: config.schedule,
            timers: Timers::new(),
            search_debounce: config.search_debounce.as_millis() as Millis,
            persist_debounce: config.persist_debounce.as_millis() as Millis,
            had_record: false,
            early_batch: None,
            now: 0,
        }
    }

    /// Use an already-loaded platform list instead of fetching one.
    pub fn with_platforms(mut self, list: PlatformList) -> Self {
        self.registry = PlatformRegistry::seeded(list);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn schedule(&self) -> &LoadSchedule {
        &self.schedule
    }

    /// Earliest pending timer; the engine sends `Tick` once it passes.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.timers.next_deadline()
    }

    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.timers.is_armed(kind)
    }

    pub fn snapshot(&self) -> DiscoverySnapshot {
        DiscoverySnapshot {
            phase: self.phase,
            session: self.session.clone(),
            remaining: self.session.remaining(),
            next_batch_size: self.session.next_batch_size(&self.schedule),
        }
    }

    /// The filter a reset fetch would send right now.
    pub fn composed_filter(&self) -> SearchFilter {
        let id = self.session.platform.as_deref();
        let platform = id.and_then(|id| self.registry.get(id));
        let mut filter = self.composer.compose(&self.session.filter, platform);
        // Capabilities unknown without a registry entry, but the id still goes out
        if platform.is_none() {
            if let Some(id) = id {
                filter.platform = Some(id.to_string());
            }
        }
        filter
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    fn on_mounted(&mut self) -> Option<DiscoveryCommand> {
        if self.phase != Phase::Created {
            debug!(key = %self.session.key, phase = ?self.phase, "ignoring repeated mount");
            return None;
        }
        self.phase = Phase::Restoring;
        Some(DiscoveryCommand::LoadSession {
            key: self.session.key,
        })
    }

    fn on_session_loaded(&mut self, stored: Option<SearchSession>) -> Option<DiscoveryCommand> {
        if self.phase != Phase::Restoring || self.session.restored {
            debug!(key = %self.session.key, "session already restored; ignoring stored record");
            return None;
        }

        match stored {
            Some(stored) => {
                info!(
                    key = %self.session.key,
                    results = stored.results.len(),
                    total = stored.total,
                    "restored discovery session"
                );
                self.session.restore_from(stored);
                self.had_record = true;
            }
            None => {
                self.session.restored = true;
            }
        }

        if self.registry.is_loaded() {
            self.become_ready()
        } else {
            self.phase = Phase::LoadingPlatforms;
            Some(DiscoveryCommand::LoadPlatforms)
        }
    }

    fn on_platforms(&mut self, list: Option<PlatformList>) -> Option<DiscoveryCommand> {
        if let Some(list) = list {
            self.registry.replace(list);
        }
        if self.phase != Phase::LoadingPlatforms {
            return None;
        }
        self.become_ready()
    }

    fn become_ready(&mut self) -> Option<DiscoveryCommand> {
        self.phase = Phase::Ready;

        let known = self
            .session
            .platform
            .as_deref()
            .is_some_and(|id| self.registry.get(id).is_some());
        if !known {
            if let Some(platform) = self.registry.default_platform() {
                self.session.platform = Some(platform.id.clone());
                self.mark_dirty();
            }
        }

        if let Some(batch) = self.early_batch.take() {
            if ingest::ingest(&mut self.session, batch) == IngestOutcome::Applied {
                self.mark_dirty();
                return None;
            }
        }

        // Round 0 in a stored record means its reset never settled, so the
        // held results belong to an older filter
        if self.had_record && self.session.round > 0 {
            return None;
        }
        if self.had_record {
            info!(key = %self.session.key, "stored session has no settled search; refetching");
        }
        Some(self.reset_fetch())
    }

    fn on_unmounted(&mut self) -> Option<DiscoveryCommand> {
        self.timers.cancel_all();
        self.phase = Phase::Closed;
        debug!(key = %self.session.key, "discovery session unmounted");
        None
    }

    // ------------------------------------------------------------------------
    // User triggers
    // ------------------------------------------------------------------------

    fn on_text_edited(&mut self, text: String) -> Option<DiscoveryCommand> {
        self.session.filter.text = Some(text);
        self.timers
            .arm(TimerKind::SearchDebounce, self.now + self.search_debounce);
        self.mark_dirty();
        None
    }

    fn on_filters_applied(&mut self, mut filter: SearchFilter) -> Option<DiscoveryCommand> {
        // The filter panel does not own the search box or the sort control
        if filter.text.is_none() {
            filter.text = self.session.filter.text.take();
        }
        if filter.sort.is_none() {
            filter.sort = self.session.filter.sort.take();
        }
        self.session.filter = filter;
        self.session.filters_active = true;
        Some(self.reset_fetch())
    }

    fn on_sort_changed(&mut self, sort: SortSpec) -> Option<DiscoveryCommand> {
        self.session.filter.sort = Some(sort);
        Some(self.reset_fetch())
    }

    fn on_platform_selected(&mut self, id: String) -> Option<DiscoveryCommand> {
        if self.session.platform.as_deref() == Some(id.as_str()) {
            return None;
        }
        if self.registry.is_loaded()
            && !self.registry.platforms().is_empty()
            && self.registry.get(&id).is_none()
        {
            warn!(key = %self.session.key, platform = %id, "ignoring unknown platform");
            return None;
        }

        self.session.platform = Some(id);
        self.mark_dirty();
        if self.session.filters_active {
            Some(self.reset_fetch())
        } else {
            None
        }
    }

    fn on_filters_cleared(&mut self) -> Option<DiscoveryCommand> {
        self.timers.cancel(TimerKind::SearchDebounce);
        self.session.filter = self.session.filter.cleared();
        self.session.filters_active = false;
        Some(self.reset_fetch())
    }

    fn on_tab_selected(&mut self, tab: ResultTab) -> Option<DiscoveryCommand> {
        if self.session.tab != tab {
            self.session.tab = tab;
            self.mark_dirty();
        }
        None
    }

    fn on_load_more(&mut self) -> Option<DiscoveryCommand> {
        if self.session.is_loading() {
            debug!(key = %self.session.key, "load more ignored: request outstanding");
            return None;
        }
        let size = self.session.next_batch_size(&self.schedule);
        if size == 0 {
            debug!(key = %self.session.key, "load more ignored: nothing remaining");
            return None;
        }

        let offset = self.session.results.len() as u32;
        self.session.filter.offset = offset;
        self.session.filter.limit = size;
        let seq = self.session.begin_request(FetchMode::Append);
        let filter = self.composed_filter().page(offset, size);
        self.mark_dirty();

        info!(key = %self.session.key, seq, offset, limit = size, "issuing append fetch");
        Some(DiscoveryCommand::Search {
            seq,
            mode: FetchMode::Append,
            filter,
        })
    }

    /// Start a fresh search from page one. Supersedes any outstanding request.
    fn reset_fetch(&mut self) -> DiscoveryCommand {
        let limit = self.schedule.first_page_limit;
        self.session.round = 0;
        self.session.filter.offset = 0;
        self.session.filter.limit = limit;
        let seq = self.session.begin_request(FetchMode::Reset);
        let filter = self.composed_filter().page(0, limit);
        self.mark_dirty();

        info!(
            key = %self.session.key,
            seq,
            platform = ?filter.platform,
            "issuing reset fetch"
        );
        DiscoveryCommand::Search {
            seq,
            mode: FetchMode::Reset,
            filter,
        }
    }

    // ------------------------------------------------------------------------
    // Responses
    // ------------------------------------------------------------------------

    fn on_search_completed(&mut self, seq: u64, response: SearchResponse) -> Option<DiscoveryCommand> {
        match self.session.settle_request(seq) {
            Some(mode) => {
                aggregate::apply_response(&mut self.session, mode, response);
                self.mark_dirty();
            }
            None => {
                warn!(
                    key = %self.session.key,
                    seq,
                    latest = self.session.request_seq,
                    "discarding stale search response"
                );
            }
        }
        None
    }

    fn on_search_failed(&mut self, seq: u64, error: String) -> Option<DiscoveryCommand> {
        match self.session.settle_request(seq) {
            Some(mode) => {
                warn!(key = %self.session.key, seq, ?mode, error = %error, "search failed");
                aggregate::apply_failure(&mut self.session, mode);
                if mode == FetchMode::Reset {
                    self.mark_dirty();
                }
            }
            None => {
                debug!(key = %self.session.key, seq, error = %error, "ignoring failure of stale request");
            }
        }
        None
    }

    fn on_batch(&mut self, batch: ExternalResultBatch) -> Option<DiscoveryCommand> {
        match self.phase {
            Phase::Created | Phase::Restoring | Phase::LoadingPlatforms => {
                debug!(key = %self.session.key, batch_id = %batch.batch_id, "holding batch until restored");
                self.early_batch = Some(batch);
            }
            Phase::Ready => {
                if ingest::ingest(&mut self.session, batch) == IngestOutcome::Applied {
                    self.mark_dirty();
                }
            }
            Phase::Closed => {}
        }
        None
    }

    fn on_tick(&mut self) -> Option<DiscoveryCommand> {
        match self.timers.pop_due(self.now)? {
            TimerKind::SearchDebounce => Some(self.reset_fetch()),
            TimerKind::PersistDebounce => Some(DiscoveryCommand::PersistSession {
                session: Box::new(self.session.clone()),
            }),
        }
    }

    /// Schedule a debounced write of the session.
    fn mark_dirty(&mut self) {
        self.timers
            .arm(TimerKind::PersistDebounce, self.now + self.persist_debounce);
    }
}

impl Machine for DiscoveryMachine {
    type Event = DiscoveryEvent;
    type Command = DiscoveryCommand;

    fn decide(&mut self, event: Timed<DiscoveryEvent>) -> Option<DiscoveryCommand> {
        self.now = self.now.max(event.at);

        use DiscoveryEvent::*;
        match (self.phase, event.event) {
            (Phase::Closed, _) => None,

            (_, Mounted) => self.on_mounted(),
            (_, SessionLoaded(stored)) => self.on_session_loaded(stored.map(|s| *s)),
            (_, SessionLoadFailed { error }) => {
                warn!(key = %self.session.key, error = %error, "session load failed; starting fresh");
                self.on_session_loaded(None)
            }
            (_, PlatformsLoaded(list)) => self.on_platforms(Some(list)),
            (_, PlatformsFailed { error }) => {
                warn!(key = %self.session.key, error = %error, "platform list unavailable");
                self.on_platforms(None)
            }
            (_, Unmounted) => self.on_unmounted(),
            (_, BatchReceived(batch)) => self.on_batch(batch),

            (Phase::Ready, TextEdited(text)) => self.on_text_edited(text),
            (Phase::Ready, FiltersApplied(filter)) => self.on_filters_applied(filter),
            (Phase::Ready, SortChanged(sort)) => self.on_sort_changed(sort),
            (Phase::Ready, PlatformSelected(id)) => self.on_platform_selected(id),
            (Phase::Ready, FiltersCleared) => self.on_filters_cleared(),
            (Phase::Ready, TabSelected(tab)) => self.on_tab_selected(tab),
            (Phase::Ready, LoadMoreRequested) => self.on_load_more(),
            (Phase::Ready, SearchCompleted { seq, response }) => {
                self.on_search_completed(seq, response)
            }
            (Phase::Ready, SearchFailed { seq, error }) => self.on_search_failed(seq, error),
            (Phase::Ready, Tick) => self.on_tick(),

            (phase, event) => {
                debug!(key = %self.session.key, ?phase, ?event, "event ignored before ready");
                None
            }
        }
    }
}
