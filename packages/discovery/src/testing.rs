//! Test doubles for the discovery engine.
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for downstream crates.
//!
//! ```ignore
//! let backend = Arc::new(ScriptedBackend::new().with_platforms(list));
//! backend.push_response(first_page);
//! backend.push_failure("upstream 502");
//!
//! // ... drive the engine ...
//!
//! assert_eq!(backend.requests()[0].limit, 5);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::api::{
    CampaignMember, MemberStatus, SearchBackend, SearchResponse, ShortlistPage, ShortlistQuery,
};
use crate::filter::SearchFilter;
use crate::platform::PlatformList;

pub use crate::persistence::testing::InMemoryStore;

struct Scripted {
    delay: Duration,
    outcome: Result<SearchResponse, String>,
}

/// Backend that answers searches from a queue and records every request.
///
/// When the queue runs dry, searches succeed with an empty page.
#[derive(Default)]
pub struct ScriptedBackend {
    searches: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<SearchFilter>>,
    platforms: Mutex<Option<Result<PlatformList, String>>>,
    members: Mutex<Vec<CampaignMember>>,
    member_queries: Mutex<Vec<(Uuid, ShortlistQuery)>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_platforms(self, list: PlatformList) -> Self {
        *self.platforms.lock().unwrap() = Some(Ok(list));
        self
    }

    pub fn with_platform_failure(self, message: impl Into<String>) -> Self {
        *self.platforms.lock().unwrap() = Some(Err(message.into()));
        self
    }

    pub fn with_members(self, members: Vec<CampaignMember>) -> Self {
        *self.members.lock().unwrap() = members;
        self
    }

    pub fn push_response(&self, response: SearchResponse) {
        self.push(Duration::ZERO, Ok(response));
    }

    /// Queue a response that is delivered after `delay`.
    pub fn push_response_after(&self, delay: Duration, response: SearchResponse) {
        self.push(delay, Ok(response));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.push(Duration::ZERO, Err(message.into()));
    }

    pub fn push_failure_after(&self, delay: Duration, message: impl Into<String>) {
        self.push(delay, Err(message.into()));
    }

    fn push(&self, delay: Duration, outcome: Result<SearchResponse, String>) {
        self.searches
            .lock()
            .unwrap()
            .push_back(Scripted { delay, outcome });
    }

    /// Every filter passed to `search`, in call order.
    pub fn requests(&self) -> Vec<SearchFilter> {
        self.requests.lock().unwrap().clone()
    }

    pub fn search_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn member_queries(&self) -> Vec<(Uuid, ShortlistQuery)> {
        self.member_queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn search(&self, filter: &SearchFilter) -> anyhow::Result<SearchResponse> {
        self.requests.lock().unwrap().push(filter.clone());
        let next = self.searches.lock().unwrap().pop_front();

        let Some(scripted) = next else {
            return Ok(SearchResponse {
                results: Vec::new(),
                total: 0,
                offset: filter.offset,
                limit: filter.limit,
            });
        };

        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome.map_err(|message| anyhow::anyhow!(message))
    }

    async fn platforms(&self) -> anyhow::Result<PlatformList> {
        match self.platforms.lock().unwrap().clone() {
            Some(Ok(list)) => Ok(list),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(PlatformList::default()),
        }
    }

    async fn campaign_members(
        &self,
        campaign_id: Uuid,
        query: &ShortlistQuery,
    ) -> anyhow::Result<ShortlistPage> {
        self.member_queries
            .lock()
            .unwrap()
            .push((campaign_id, query.clone()));

        let needle = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<CampaignMember> = self
            .members
            .lock()
            .unwrap()
            .iter()
            .filter(|m| query.status == MemberStatus::All || m.status == query.status)
            .filter(|m| match &needle {
                Some(needle) => m.creator.name().to_lowercase().contains(needle),
                None => true,
            })
            .cloned()
            .collect();

        let total = matching.len() as u64;
        let members = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        Ok(ShortlistPage { members, total })
    }
}
