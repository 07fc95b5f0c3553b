//! Background defaults and the filter composer.
//!
//! The composer merges what the user picked with a fixed set of background
//! defaults the user never sees. It is pure and idempotent: composing an
//! already-composed filter for the same platform yields the same filter.

use crate::filter::{
    AgeRange, CountRange, Gender, GenderThreshold, LocationWeight, PlatformOptions, SearchFilter,
};
use crate::platform::Platform;

/// Share assigned to audience locations derived from creator locations.
pub const DERIVED_AUDIENCE_SHARE: f64 = 1.0;

/// Filter fragment applied transparently to every search.
#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundDefaults {
    pub audience_age: AgeRange,
    pub audience_gender: GenderThreshold,
    pub creator_age: AgeRange,
    pub engagement_rate: f64,
    pub total_engagements: CountRange,
    pub reel_views: CountRange,
}

impl Default for BackgroundDefaults {
    fn default() -> Self {
        Self {
            audience_age: AgeRange::new(18, 65),
            audience_gender: GenderThreshold {
                gender: Gender::Any,
                percentage_value: 0.0,
            },
            creator_age: AgeRange::new(18, 65),
            engagement_rate: 0.01,
            total_engagements: CountRange::at_least(100),
            reel_views: CountRange::at_least(1_000),
        }
    }
}

/// Merges user filters with [`BackgroundDefaults`].
#[derive(Debug, Clone, Default)]
pub struct Composer {
    defaults: BackgroundDefaults,
}

impl Composer {
    pub fn new(defaults: BackgroundDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &BackgroundDefaults {
        &self.defaults
    }

    /// Produce the filter that goes over the wire.
    ///
    /// User-set fields are never overwritten. The platform sub-block is
    /// removed outright unless `platform` supports it; when it does, only
    /// missing nested fields are backfilled.
    pub fn compose(&self, filter: &SearchFilter, platform: Option<&Platform>) -> SearchFilter {
        let d = &self.defaults;
        let mut out = filter.clone();

        if let Some(platform) = platform {
            out.platform = Some(platform.id.clone());
        }

        out.audience_age.get_or_insert(d.audience_age);
        out.audience_gender.get_or_insert(d.audience_gender);
        out.creator_age.get_or_insert(d.creator_age);
        out.engagement_rate.get_or_insert(d.engagement_rate);
        out.total_engagements.get_or_insert(d.total_engagements);

        if out.audience_locations.is_none() && !out.creator_locations.is_empty() {
            out.audience_locations = Some(
                out.creator_locations
                    .iter()
                    .map(|id| LocationWeight {
                        location_id: id.clone(),
                        percentage_value: DERIVED_AUDIENCE_SHARE,
                    })
                    .collect(),
            );
        }

        let supports_reels = platform.is_some_and(|p| p.supports_reel_view_filter);
        if supports_reels {
            out.platform_options
                .get_or_insert_with(PlatformOptions::default)
                .reel_views
                .get_or_insert(d.reel_views);
        } else {
            out.platform_options = None;
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instagram() -> Platform {
        Platform::new("ig", "Instagram").with_reel_view_filter()
    }

    fn tiktok() -> Platform {
        Platform::new("tt", "TikTok")
    }

    #[test]
    fn test_injects_defaults_into_empty_filter() {
        let composer = Composer::default();
        let out = composer.compose(&SearchFilter::default(), Some(&tiktok()));

        let d = BackgroundDefaults::default();
        assert_eq!(out.platform.as_deref(), Some("tt"));
        assert_eq!(out.audience_age, Some(d.audience_age));
        assert_eq!(out.audience_gender, Some(d.audience_gender));
        assert_eq!(out.creator_age, Some(d.creator_age));
        assert_eq!(out.engagement_rate, Some(d.engagement_rate));
        assert_eq!(out.total_engagements, Some(d.total_engagements));
        assert!(out.audience_locations.is_none());
    }

    #[test]
    fn test_user_values_win_over_defaults() {
        let composer = Composer::default();
        let filter = SearchFilter {
            creator_age: Some(AgeRange::new(25, 34)),
            engagement_rate: Some(0.05),
            ..Default::default()
        };

        let out = composer.compose(&filter, Some(&tiktok()));
        assert_eq!(out.creator_age, Some(AgeRange::new(25, 34)));
        assert_eq!(out.engagement_rate, Some(0.05));
    }

    #[test]
    fn test_derives_audience_locations_from_creator_locations() {
        let composer = Composer::default();
        let filter = SearchFilter {
            creator_locations: vec!["US".into(), "CA".into()],
            ..Default::default()
        };

        let out = composer.compose(&filter, Some(&instagram()));
        let locations = out.audience_locations.unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].location_id, "US");
        assert_eq!(locations[0].percentage_value, 1.0);
        assert_eq!(locations[1].location_id, "CA");
    }

    #[test]
    fn test_explicit_audience_locations_are_kept() {
        let composer = Composer::default();
        let filter = SearchFilter {
            creator_locations: vec!["US".into()],
            audience_locations: Some(vec![LocationWeight {
                location_id: "GB".into(),
                percentage_value: 0.3,
            }]),
            ..Default::default()
        };

        let out = composer.compose(&filter, Some(&instagram()));
        let locations = out.audience_locations.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].location_id, "GB");
    }

    #[test]
    fn test_strips_sub_block_for_unsupported_platform() {
        let composer = Composer::default();
        let filter = SearchFilter {
            platform_options: Some(PlatformOptions {
                reel_views: Some(CountRange::at_least(5)),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(composer
            .compose(&filter, Some(&tiktok()))
            .platform_options
            .is_none());
        assert!(composer.compose(&filter, None).platform_options.is_none());
    }

    #[test]
    fn test_injects_sub_block_for_supported_platform() {
        let composer = Composer::default();
        let out = composer.compose(&SearchFilter::default(), Some(&instagram()));

        let options = out.platform_options.unwrap();
        assert_eq!(options.reel_views, Some(CountRange::at_least(1_000)));
        assert!(options.extra.is_empty());
    }

    #[test]
    fn test_backfills_reel_views_without_dropping_siblings() {
        let composer = Composer::default();
        let mut extra = serde_json::Map::new();
        extra.insert("story_views".into(), json!({ "min": 50 }));
        let filter = SearchFilter {
            platform_options: Some(PlatformOptions {
                reel_views: None,
                extra,
            }),
            ..Default::default()
        };

        let options = composer
            .compose(&filter, Some(&instagram()))
            .platform_options
            .unwrap();
        assert_eq!(options.reel_views, Some(CountRange::at_least(1_000)));
        assert_eq!(options.extra["story_views"], json!({ "min": 50 }));
    }

    #[test]
    fn test_user_reel_views_are_kept() {
        let composer = Composer::default();
        let filter = SearchFilter {
            platform_options: Some(PlatformOptions {
                reel_views: Some(CountRange {
                    min: Some(10),
                    max: Some(20),
                }),
                ..Default::default()
            }),
            ..Default::default()
        };

        let options = composer
            .compose(&filter, Some(&instagram()))
            .platform_options
            .unwrap();
        assert_eq!(options.reel_views.unwrap().max, Some(20));
    }

    #[test]
    fn test_compose_is_idempotent_across_platform_switch() {
        let composer = Composer::default();
        let filter = SearchFilter {
            creator_locations: vec!["US".into()],
            ..Default::default()
        };

        let on_ig = composer.compose(&filter, Some(&instagram()));
        assert_eq!(composer.compose(&on_ig, Some(&instagram())), on_ig);

        let on_tt = composer.compose(&on_ig, Some(&tiktok()));
        assert!(on_tt.platform_options.is_none());
        assert_eq!(composer.compose(&on_tt, Some(&tiktok())), on_tt);
    }
}
