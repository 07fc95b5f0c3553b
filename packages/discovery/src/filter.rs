//! Search filter model sent to the discovery endpoint.
//!
//! Every field is optional: `Some` means the user (or a previous merge) set
//! it, `None` means the composer is free to inject a background default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Value Types
// ============================================================================

/// Inclusive age range in years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl AgeRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

/// Inclusive count range (engagements, views).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: Option<u64>,
    pub max: Option<u64>,
}

impl CountRange {
    pub fn at_least(min: u64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Any,
    Female,
    Male,
}

/// Minimum share of a gender, as a fraction in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenderThreshold {
    pub gender: Gender,
    pub percentage_value: f64,
}

/// Audience location with the minimum share of audience located there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationWeight {
    pub location_id: String,
    pub percentage_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Filter block only understood by platforms with reel-view support.
///
/// Nested fields other than `reel_views` are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlatformOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reel_views: Option<CountRange>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// SearchFilter
// ============================================================================

/// A discovery search filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortSpec>,
    /// Free-text search, fed by the debounced search box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio_phrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_age: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_age: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_gender: Option<GenderThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_gender: Option<GenderThreshold>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience_locations: Option<Vec<LocationWeight>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub creator_locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_engagements: Option<CountRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_options: Option<PlatformOptions>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub limit: u32,
    /// Fields this model does not know about, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SearchFilter {
    /// Returns a copy positioned at the given page window.
    pub fn page(&self, offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit,
            ..self.clone()
        }
    }

    /// Free text with surrounding whitespace removed; `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Returns an empty filter that keeps only the platform and sort.
    pub fn cleared(&self) -> Self {
        Self {
            platform: self.platform.clone(),
            sort: self.sort.clone(),
            ..Self::default()
        }
    }
}
