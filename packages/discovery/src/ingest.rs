//! External result ingestion.
//!
//! A recommendation step outside the search box can hand over a complete
//! result set. It replaces the session's results in one step, bypassing the
//! composer and the load schedule, and leaves the round counter as if one
//! reset round had completed so "load more" keeps working.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::filter::SearchFilter;
use crate::result::DiscoveredResult;
use crate::session::{ResultTab, SearchSession};

/// A result set delivered by an external producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalResultBatch {
    /// Distinguishes deliveries; a repeat of the last one is ignored.
    pub batch_id: DateTime<Utc>,
    pub results: Vec<DiscoveredResult>,
    pub total: u64,
    /// Filter the producer applied. Replaces the session filter wholesale.
    #[serde(default)]
    pub filter: Option<SearchFilter>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Applied,
    /// Same `batch_id` as the last ingested batch.
    Duplicate,
    /// No results; manual results were left in place.
    Empty,
}

/// Apply `batch` to `session`.
pub fn ingest(session: &mut SearchSession, batch: ExternalResultBatch) -> IngestOutcome {
    if session.last_batch == Some(batch.batch_id) {
        debug!(key = %session.key, batch_id = %batch.batch_id, "ignoring re-delivered batch");
        return IngestOutcome::Duplicate;
    }
    if batch.results.is_empty() {
        debug!(key = %session.key, batch_id = %batch.batch_id, "ignoring empty batch");
        return IngestOutcome::Empty;
    }

    info!(
        key = %session.key,
        batch_id = %batch.batch_id,
        results = batch.results.len(),
        total = batch.total,
        "ingesting external result batch"
    );

    session.results = batch.results;
    session.total = batch.total;
    if let Some(filter) = batch.filter {
        if let Some(platform) = &filter.platform {
            session.platform = Some(platform.clone());
        }
        session.filter = filter;
        session.filters_active = true;
    }
    session.round = 1;
    session.tab = ResultTab::Discovered;
    session.last_batch = Some(batch.batch_id);
    session.supersede_request();

    IngestOutcome::Applied
}
