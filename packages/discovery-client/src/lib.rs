//! REST client for the discovery API.
//!
//! [`HttpBackend`] implements [`discovery::SearchBackend`] so a
//! [`discovery::DiscoveryEngine`] can run against the real service.
//!
//! # Example
//!
//! ```rust,ignore
//! use discovery_client::{ClientConfig, HttpBackend};
//!
//! let backend = HttpBackend::new(ClientConfig::from_env()?);
//! let platforms = backend.fetch_platforms().await?;
//! ```

pub mod config;
pub mod error;

pub use config::ClientConfig;
pub use error::{ClientError, Result};

use async_trait::async_trait;
use discovery::{PlatformList, SearchBackend, SearchFilter, SearchResponse, ShortlistPage, ShortlistQuery};
use serde::de::DeserializeOwned;
use uuid::Uuid;

pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// `POST /discovery/search` with a composed filter.
    pub async fn post_search(&self, filter: &SearchFilter) -> Result<SearchResponse> {
        let req = self.client.post(self.url("/discovery/search")).json(filter);
        let resp = self.authorize(req).send().await?;
        let response: SearchResponse = Self::read(resp).await?;

        tracing::debug!(
            offset = filter.offset,
            limit = filter.limit,
            received = response.results.len(),
            total = response.total,
            "Discovery search returned"
        );
        Ok(response)
    }

    /// `GET /discovery/platforms`
    pub async fn fetch_platforms(&self) -> Result<PlatformList> {
        let req = self.client.get(self.url("/discovery/platforms"));
        let resp = self.authorize(req).send().await?;
        let list: PlatformList = Self::read(resp).await?;

        tracing::debug!(count = list.platforms.len(), "Fetched discovery platforms");
        Ok(list)
    }

    /// `GET /campaigns/{id}/members`
    pub async fn fetch_members(
        &self,
        campaign_id: Uuid,
        query: &ShortlistQuery,
    ) -> Result<ShortlistPage> {
        let mut params = vec![
            ("status", query.status.as_str().to_string()),
            ("offset", query.offset.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(search) = &query.search {
            params.push(("search", search.clone()));
        }

        let req = self
            .client
            .get(self.url(&format!("/campaigns/{}/members", campaign_id)))
            .query(&params);
        let resp = self.authorize(req).send().await?;
        Self::read(resp).await
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, filter: &SearchFilter) -> anyhow::Result<SearchResponse> {
        Ok(self.post_search(filter).await?)
    }

    async fn platforms(&self) -> anyhow::Result<PlatformList> {
        Ok(self.fetch_platforms().await?)
    }

    async fn campaign_members(
        &self,
        campaign_id: Uuid,
        query: &ShortlistQuery,
    ) -> anyhow::Result<ShortlistPage> {
        Ok(self.fetch_members(campaign_id, query).await?)
    }
}
