//! Applies search responses to the held result list.
//!
//! A reset replaces what is held, an append extends it. The total always
//! comes from the response metadata.

use tracing::debug;

use crate::api::SearchResponse;
use crate::session::{FetchMode, SearchSession};

/// Apply a successful response for a fetch of the given mode.
pub fn apply_response(session: &mut SearchSession, mode: FetchMode, response: SearchResponse) {
    let received = response.results.len();
    match mode {
        FetchMode::Reset => {
            session.results = response.results;
            session.round = 1;
        }
        FetchMode::Append => {
            session.results.extend(response.results);
            session.round += 1;
        }
    }
    session.total = response.total;

    debug!(
        key = %session.key,
        ?mode,
        received,
        held = session.results.len(),
        total = session.total,
        round = session.round,
        "applied search response"
    );
}

/// Apply a failed fetch.
///
/// A failed reset leaves nothing behind so old results are never shown
/// against a new filter. A failed append changes nothing.
pub fn apply_failure(session: &mut SearchSession, mode: FetchMode) {
    match mode {
        FetchMode::Reset => {
            session.results.clear();
            session.total = 0;
            session.round = 0;
        }
        FetchMode::Append => {}
    }
}
