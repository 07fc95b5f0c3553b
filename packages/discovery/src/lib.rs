//! # Discovery
//!
//! Search orchestration for the influencer-discovery tab of a campaign.
//!
//! ## Architecture
//!
//! ```text
//! EngineHandle (UI / CLI)
//!     │ triggers
//!     ▼
//! DiscoveryEngine.run() loop ◄──────── outcomes ──────────┐
//!     │                                                   │
//!     ▼ decide(Timed<Event>)                              │
//! DiscoveryMachine ─► Some(Command)                       │
//!     │   ├─ Composer       (background defaults)         │
//!     │   ├─ LoadSchedule   (5 / 5 / 5 / 10)              │
//!     │   ├─ aggregate      (reset / append)              │
//!     │   ├─ ingest         (external batches)            │
//!     │   └─ Timers         (search + persist debounce)   │
//!     ▼                                                   │
//! execute(): SearchBackend / SessionStore ────────────────┘
//!     │
//!     ▼ watch
//! DiscoverySnapshot
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Restore before fetch** - no search runs until the stored session
//!    for the key has been loaded (or found missing)
//! 2. **Latest request wins** - every search carries a sequence number and
//!    only the newest outstanding one is applied
//! 3. **One page at a time** - load more is refused while a request is out
//! 4. **Server total is authoritative** - `total` is only ever copied from a
//!    response or an ingested batch
//! 5. **User values are never overwritten** - background defaults only fill
//!    gaps, and unsupported platform blocks are stripped
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use discovery::{DiscoveryConfig, DiscoveryEngine, FileStore, SearchFilter, SessionKey};
//!
//! let (engine, handle) = DiscoveryEngine::builder(
//!     SessionKey::Campaign(campaign_id),
//!     Arc::new(backend),
//!     Arc::new(FileStore::new("./sessions")),
//! )
//! .config(DiscoveryConfig::from_env()?)
//! .build();
//! tokio::spawn(engine.run());
//!
//! handle.apply_filters(SearchFilter {
//!     creator_locations: vec!["US".into()],
//!     ..Default::default()
//! })?;
//! let snapshot = handle.wait_until(|s| !s.is_loading()).await?;
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod machine;
pub mod orchestrator;
pub mod persistence;
pub mod platform;
pub mod result;
pub mod schedule;
pub mod session;
pub mod timer;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use api::{
    CampaignMember, MemberStatus, SearchBackend, SearchResponse, ShortlistPage, ShortlistQuery,
};
pub use config::DiscoveryConfig;
pub use defaults::{BackgroundDefaults, Composer};
pub use engine::{DiscoveryEngine, EngineBuilder, EngineHandle};
pub use error::{EngineError, SessionKeyError, StoreError};
pub use filter::{
    AgeRange, CountRange, Gender, GenderThreshold, LocationWeight, PlatformOptions, SearchFilter,
    SortDirection, SortSpec,
};
pub use ingest::{ExternalResultBatch, IngestOutcome};
pub use machine::{Machine, Timed};
pub use orchestrator::{DiscoveryCommand, DiscoveryEvent, DiscoveryMachine, DiscoverySnapshot, Phase};
pub use persistence::{FileStore, SessionStore};
pub use platform::{Platform, PlatformList, PlatformRegistry};
pub use result::{CreatorCard, DiscoveredResult, InfluencerRow};
pub use schedule::LoadSchedule;
pub use session::{FetchMode, ResultTab, SearchSession, SessionKey};
pub use timer::{Millis, TimerKind, Timers};
