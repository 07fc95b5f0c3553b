use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::error::ClientError;

/// Connection settings for the discovery REST API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base URL must start with http:// or https://, got {:?}",
                base_url
            )));
        }
        Ok(Self {
            base_url,
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let base_url = env::var("DISCOVERY_API_URL").context("DISCOVERY_API_URL must be set")?;
        let mut config = Self::new(base_url)?;
        config.token = env::var("DISCOVERY_API_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = ClientConfig::new("https://api.example.com/v1/").unwrap();
        assert_eq!(config.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_rejects_bare_host() {
        let err = ClientConfig::new("api.example.com").unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    // Env vars are process-wide, so every env case lives in this one test.
    #[test]
    fn test_from_env() {
        env::remove_var("DISCOVERY_API_URL");
        assert!(ClientConfig::from_env()
            .unwrap_err()
            .to_string()
            .contains("DISCOVERY_API_URL"));

        env::set_var("DISCOVERY_API_URL", "http://localhost:8080/");
        env::set_var("DISCOVERY_API_TOKEN", "secret");
        let config = ClientConfig::from_env().unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.token.as_deref(), Some("secret"));

        env::set_var("DISCOVERY_API_TOKEN", "");
        assert_eq!(ClientConfig::from_env().unwrap().token, None);

        env::remove_var("DISCOVERY_API_URL");
        env::remove_var("DISCOVERY_API_TOKEN");
    }
}
