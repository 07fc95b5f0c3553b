//! Platform registry.
//!
//! Holds the selectable discovery platforms and the one the backend reports
//! as active. Platform-conditional filtering keys off capability flags on
//! [`Platform`], never off the display name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub id: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Whether searches on this platform accept the reel-view filter block.
    #[serde(default)]
    pub supports_reel_view_filter: bool,
}

fn default_true() -> bool {
    true
}

impl Platform {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_active: true,
            supports_reel_view_filter: false,
        }
    }

    pub fn with_reel_view_filter(mut self) -> Self {
        self.supports_reel_view_filter = true;
        self
    }
}

/// Platform list as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PlatformList {
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub active_platform_id: Option<String>,
}

/// Cached platform list. Loaded once per engine unless seeded up front.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: Vec<Platform>,
    active: Option<String>,
    loaded: bool,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled from an earlier load.
    pub fn seeded(list: PlatformList) -> Self {
        let mut registry = Self::new();
        registry.replace(list);
        registry
    }

    /// Replace the cached list. Inactive platforms are dropped.
    pub fn replace(&mut self, list: PlatformList) {
        self.platforms = list.platforms.into_iter().filter(|p| p.is_active).collect();
        self.active = list
            .active_platform_id
            .filter(|id| self.platforms.iter().any(|p| &p.id == id));
        self.loaded = true;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn platforms(&self) -> &[Platform] {
        &self.platforms
    }

    pub fn get(&self, id: &str) -> Option<&Platform> {
        self.platforms.iter().find(|p| p.id == id)
    }

    /// The backend's active platform, falling back to the first listed.
    pub fn default_platform(&self) -> Option<&Platform> {
        self.active
            .as_deref()
            .and_then(|id| self.get(id))
            .or_else(|| self.platforms.first())
    }
}
