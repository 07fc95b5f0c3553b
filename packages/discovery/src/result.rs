//! Discovered creator model and the views derived from it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One candidate creator returned by a discovery search.
///
/// This is the only stored shape. Table rows and cards are derived on demand
/// with [`DiscoveredResult::card`] and [`DiscoveredResult::row`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredResult {
    pub id: String,
    #[serde(default)]
    pub platform_id: Option<String>,
    pub handle: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub followers: Option<u64>,
    /// Fraction, e.g. `0.042` for 4.2%.
    #[serde(default)]
    pub engagement_rate: Option<f64>,
    #[serde(default)]
    pub avg_views: Option<u64>,
    #[serde(default)]
    pub avg_reel_views: Option<u64>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DiscoveredResult {
    pub fn new(id: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            platform_id: None,
            handle: handle.into(),
            display_name: None,
            avatar_url: None,
            profile_url: None,
            bio: None,
            followers: None,
            engagement_rate: None,
            avg_views: None,
            avg_reel_views: None,
            location: None,
            extra: Map::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.handle)
    }

    pub fn card(&self) -> CreatorCard {
        CreatorCard {
            id: self.id.clone(),
            handle: format!("@{}", self.handle.trim_start_matches('@')),
            name: self.name().to_string(),
            avatar_url: self.avatar_url.clone(),
            followers_label: self.followers.map(compact_count),
        }
    }

    pub fn row(&self) -> InfluencerRow {
        InfluencerRow {
            id: self.id.clone(),
            name: self.name().to_string(),
            profile_url: self.profile_url.clone(),
            followers: self.followers.unwrap_or(0),
            engagement_rate_pct: self.engagement_rate.map(|r| (r * 10_000.0).round() / 100.0),
            avg_views: self.avg_reel_views.or(self.avg_views),
            location: self.location.clone(),
        }
    }
}

/// Compact card shown in the discover grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatorCard {
    pub id: String,
    pub handle: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub followers_label: Option<String>,
}

/// Row shown in the analytics-style results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluencerRow {
    pub id: String,
    pub name: String,
    pub profile_url: Option<String>,
    pub followers: u64,
    pub engagement_rate_pct: Option<f64>,
    /// Reel views when the platform reports them, otherwise average views.
    pub avg_views: Option<u64>,
    pub location: Option<String>,
}

fn compact_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        // 999_950 and up would round to "1000.0K"
        1_000..=999_949 => format!("{:.1}K", n as f64 / 1_000.0),
        _ => format!("{:.1}M", n as f64 / 1_000_000.0),
    }
}
