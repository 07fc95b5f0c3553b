use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::defaults::BackgroundDefaults;
use crate::schedule::LoadSchedule;

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Quiet period after the last search-box keystroke.
    pub search_debounce: Duration,
    /// Quiet period after the last session mutation before it is written.
    pub persist_debounce: Duration,
    /// Upper bound on a single search request.
    pub request_timeout: Duration,
    pub schedule: LoadSchedule,
    pub defaults: BackgroundDefaults,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(500),
            persist_debounce: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
            schedule: LoadSchedule::default(),
            defaults: BackgroundDefaults::default(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let base = Self::default();
        Ok(Self {
            search_debounce: millis_var("DISCOVERY_SEARCH_DEBOUNCE_MS")?
                .unwrap_or(base.search_debounce),
            persist_debounce: millis_var("DISCOVERY_PERSIST_DEBOUNCE_MS")?
                .unwrap_or(base.persist_debounce),
            request_timeout: match env::var("DISCOVERY_REQUEST_TIMEOUT_SECS") {
                Ok(v) => Duration::from_secs(
                    v.parse()
                        .context("DISCOVERY_REQUEST_TIMEOUT_SECS must be a whole number")?,
                ),
                Err(_) => base.request_timeout,
            },
            ..base
        })
    }
}

fn millis_var(name: &str) -> Result<Option<Duration>> {
    match env::var(name) {
        Ok(v) => {
            let ms: u64 = v
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", name))?;
            Ok(Some(Duration::from_millis(ms)))
        }
        Err(_) => Ok(None),
    }
}
