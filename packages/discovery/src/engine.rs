//! Async engine that drives a [`DiscoveryMachine`].
//!
//! The engine owns the machine and is its only caller. Each loop turn takes
//! one event from the trigger channel, the outcome channel or the timer
//! clock, stamps it with logical time, and runs whatever command the machine
//! decides on. Backend and store calls run as spawned tasks that report back
//! through the outcome channel, so the machine never blocks on IO.
//!
//! ```ignore
//! let (engine, handle) = DiscoveryEngine::builder(key, backend, store)
//!     .config(DiscoveryConfig::from_env()?)
//!     .build();
//! tokio::spawn(engine.run());
//!
//! handle.apply_filters(filter)?;
//! let snapshot = handle.wait_until(|s| !s.is_loading()).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::api::{SearchBackend, ShortlistPage, ShortlistQuery};
use crate::config::DiscoveryConfig;
use crate::error::EngineError;
use crate::filter::{SearchFilter, SortSpec};
use crate::ingest::ExternalResultBatch;
use crate::machine::Machine;
use crate::orchestrator::{DiscoveryCommand, DiscoveryEvent, DiscoveryMachine, DiscoverySnapshot, Phase};
use crate::persistence::SessionStore;
use crate::platform::PlatformList;
use crate::session::{ResultTab, SearchSession, SessionKey};
use crate::timer::Millis;

// ============================================================================
// Builder
// ============================================================================

pub struct EngineBuilder<B, S> {
    key: SessionKey,
    backend: Arc<B>,
    store: Arc<S>,
    config: DiscoveryConfig,
    platforms: Option<PlatformList>,
}

impl<B: SearchBackend, S: SessionStore> EngineBuilder<B, S> {
    pub fn config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Reuse a platform list loaded by an earlier engine.
    pub fn platforms(mut self, list: PlatformList) -> Self {
        self.platforms = Some(list);
        self
    }

    pub fn build(self) -> (DiscoveryEngine<B, S>, EngineHandle) {
        let mut machine = DiscoveryMachine::new(self.key, &self.config);
        if let Some(list) = self.platforms {
            machine = machine.with_platforms(list);
        }

        let (triggers_tx, triggers_rx) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(machine.snapshot());

        let handle = EngineHandle {
            key: self.key,
            triggers: triggers_tx,
            snapshots: snapshots_rx,
            backend: self.backend.clone(),
        };

        let engine = DiscoveryEngine {
            machine,
            backend: self.backend,
            store: self.store,
            request_timeout: self.config.request_timeout,
            triggers: triggers_rx,
            outcomes_tx,
            outcomes_rx,
            snapshots: snapshots_tx,
            epoch: Instant::now(),
        };

        (engine, handle)
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct DiscoveryEngine<B, S> {
    machine: DiscoveryMachine,
    backend: Arc<B>,
    store: Arc<S>,
    request_timeout: Duration,
    triggers: mpsc::UnboundedReceiver<DiscoveryEvent>,
    outcomes_tx: mpsc::UnboundedSender<DiscoveryEvent>,
    outcomes_rx: mpsc::UnboundedReceiver<DiscoveryEvent>,
    snapshots: watch::Sender<DiscoverySnapshot>,
    /// Logical time zero.
    epoch: Instant,
}

impl<B: SearchBackend, S: SessionStore> DiscoveryEngine<B, S> {
    pub fn builder(key: SessionKey, backend: Arc<B>, store: Arc<S>) -> EngineBuilder<B, S> {
        EngineBuilder {
            key,
            backend,
            store,
            config: DiscoveryConfig::default(),
            platforms: None,
        }
    }

    /// Mount the session and process events until it is unmounted.
    ///
    /// Dropping every [`EngineHandle`] counts as an unmount. Returns the
    /// final session state.
    pub async fn run(mut self) -> SearchSession {
        let key = self.machine.session().key;
        info!(%key, "discovery engine starting");

        self.step(DiscoveryEvent::Mounted).await;

        let mut triggers_open = true;
        while self.machine.phase() != Phase::Closed {
            let deadline = self
                .machine
                .next_deadline()
                .map(|ms| self.epoch + Duration::from_millis(ms));

            let event = tokio::select! {
                biased;

                Some(event) = self.outcomes_rx.recv() => event,

                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    DiscoveryEvent::Tick
                }

                trigger = self.triggers.recv(), if triggers_open => match trigger {
                    Some(event) => event,
                    None => {
                        debug!(%key, "all handles dropped");
                        triggers_open = false;
                        DiscoveryEvent::Unmounted
                    }
                },
            };

            self.step(event).await;
        }

        info!(%key, "discovery engine stopped");
        self.machine.session().clone()
    }

    fn now(&self) -> Millis {
        self.epoch.elapsed().as_millis() as Millis
    }

    async fn step(&mut self, event: DiscoveryEvent) {
        let at = self.now();
        if let Some(command) = self.machine.decide(event.at(at)) {
            self.execute(command).await;
        }
        self.snapshots.send_replace(self.machine.snapshot());
    }

    async fn execute(&self, command: DiscoveryCommand) {
        match command {
            DiscoveryCommand::LoadSession { key } => {
                let store = self.store.clone();
                let tx = self.outcomes_tx.clone();
                tokio::spawn(async move {
                    let event = match store.load(&key).await {
                        Ok(stored) => DiscoveryEvent::SessionLoaded(stored.map(Box::new)),
                        Err(e) => DiscoveryEvent::SessionLoadFailed {
                            error: e.to_string(),
                        },
                    };
                    let _ = tx.send(event);
                });
            }

            DiscoveryCommand::LoadPlatforms => {
                let backend = self.backend.clone();
                let tx = self.outcomes_tx.clone();
                tokio::spawn(async move {
                    let event = match backend.platforms().await {
                        Ok(list) => DiscoveryEvent::PlatformsLoaded(list),
                        Err(e) => DiscoveryEvent::PlatformsFailed {
                            error: format!("{:#}", e),
                        },
                    };
                    let _ = tx.send(event);
                });
            }

            DiscoveryCommand::Search { seq, mode, filter } => {
                let backend = self.backend.clone();
                let tx = self.outcomes_tx.clone();
                let timeout = self.request_timeout;
                debug!(seq, ?mode, offset = filter.offset, limit = filter.limit, "dispatching search");
                tokio::spawn(async move {
                    let event = match tokio::time::timeout(timeout, backend.search(&filter)).await {
                        Ok(Ok(response)) => DiscoveryEvent::SearchCompleted { seq, response },
                        Ok(Err(e)) => DiscoveryEvent::SearchFailed {
                            seq,
                            error: format!("{:#}", e),
                        },
                        Err(_) => DiscoveryEvent::SearchFailed {
                            seq,
                            error: format!("search timed out after {}s", timeout.as_secs()),
                        },
                    };
                    let _ = tx.send(event);
                });
            }

            // Awaited in place so writes for one key never reorder
            DiscoveryCommand::PersistSession { mut session } => {
                session.saved_at = Some(Utc::now());
                match self.store.save(&session.key, &session).await {
                    Ok(()) => debug!(key = %session.key, "persisted discovery session"),
                    Err(e) => warn!(key = %session.key, error = %e, "failed to persist discovery session"),
                }
            }
        }
    }
}

// ============================================================================
// Handle
// ============================================================================

/// Cloneable front door to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    key: SessionKey,
    triggers: mpsc::UnboundedSender<DiscoveryEvent>,
    snapshots: watch::Receiver<DiscoverySnapshot>,
    backend: Arc<dyn SearchBackend>,
}

impl EngineHandle {
    pub fn key(&self) -> SessionKey {
        self.key
    }

    fn send(&self, event: DiscoveryEvent) -> Result<(), EngineError> {
        self.triggers.send(event).map_err(|_| EngineError::Closed)
    }

    /// Search-box keystroke. Debounced.
    pub fn edit_text(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::TextEdited(text.into()))
    }

    pub fn apply_filters(&self, filter: SearchFilter) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::FiltersApplied(filter))
    }

    pub fn change_sort(&self, sort: SortSpec) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::SortChanged(sort))
    }

    pub fn select_platform(&self, id: impl Into<String>) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::PlatformSelected(id.into()))
    }

    pub fn clear_filters(&self) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::FiltersCleared)
    }

    pub fn select_tab(&self, tab: ResultTab) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::TabSelected(tab))
    }

    pub fn load_more(&self) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::LoadMoreRequested)
    }

    /// Hand over a result set from the recommendation feed.
    pub fn ingest(&self, batch: ExternalResultBatch) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::BatchReceived(batch))
    }

    pub fn unmount(&self) -> Result<(), EngineError> {
        self.send(DiscoveryEvent::Unmounted)
    }

    pub fn subscribe(&self) -> watch::Receiver<DiscoverySnapshot> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> DiscoverySnapshot {
        self.snapshots.borrow().clone()
    }

    /// Wait for the first snapshot matching `predicate`, including the
    /// current one.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&DiscoverySnapshot) -> bool,
    ) -> Result<DiscoverySnapshot, EngineError> {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| EngineError::Closed)?;
        Ok(snapshot.clone())
    }

    /// One page of the campaign's shortlist, fetched straight from the
    /// backend. Session state is not touched.
    pub async fn shortlist(&self, query: &ShortlistQuery) -> Result<ShortlistPage, EngineError> {
        let campaign = self.key.campaign().ok_or(EngineError::NoCampaign)?;
        self.backend
            .campaign_members(campaign, query)
            .await
            .map_err(EngineError::Backend)
    }
}
