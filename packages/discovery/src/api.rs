//! Network boundary of the orchestrator.
//!
//! The orchestrator never talks HTTP itself. It calls a [`SearchBackend`],
//! which `discovery-client` implements over REST and tests replace with a
//! scripted fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::filter::SearchFilter;
use crate::platform::PlatformList;
use crate::result::DiscoveredResult;

/// Response to a discovery search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked results for the requested window.
    pub results: Vec<DiscoveredResult>,
    /// Total matches on the server for the filter.
    pub total: u64,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
}

// ============================================================================
// Shortlist (campaign list members)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    #[default]
    All,
    Active,
    Deleted,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::All => "all",
            MemberStatus::Active => "active",
            MemberStatus::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlistQuery {
    #[serde(default)]
    pub status: MemberStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub offset: u32,
    pub limit: u32,
}

impl Default for ShortlistQuery {
    fn default() -> Self {
        Self {
            status: MemberStatus::All,
            search: None,
            offset: 0,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMember {
    pub id: String,
    pub creator: DiscoveredResult,
    pub status: MemberStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistPage {
    pub members: Vec<CampaignMember>,
    pub total: u64,
}

// ============================================================================
// Backend
// ============================================================================

/// Remote calls the discovery tab depends on.
#[async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Run a search with an already-composed filter.
    async fn search(&self, filter: &SearchFilter) -> anyhow::Result<SearchResponse>;

    /// Selectable platforms and the currently active one.
    async fn platforms(&self) -> anyhow::Result<PlatformList>;

    /// Members of a campaign's shortlist.
    async fn campaign_members(
        &self,
        campaign_id: Uuid,
        query: &ShortlistQuery,
    ) -> anyhow::Result<ShortlistPage>;
}
