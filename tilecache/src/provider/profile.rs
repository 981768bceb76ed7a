//! Provider profiles.
//!
//! A [`ProviderProfile`] is the parameter set that turns the generic engine
//! into one concrete integration: tiling, paging, marker placement and
//! whether captures are stepped through as imagery.

use crate::cache::{SpatialCache, DEFAULT_COLLISION_EPSILON};
use crate::events::DEFAULT_EVENT_CAPACITY;
use crate::stepper::StepperConfig;
use crate::tiler::Tiler;

/// Tile zoom shared by the QA and imagery presets.
pub const DEFAULT_TILE_ZOOM: f64 = 14.0;

/// Page size of the paginated imagery preset.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Names accepted by [`ProviderProfile::preset`].
pub const PRESET_NAMES: &[&str] = &[
    "keepright",
    "osmose",
    "improveosm",
    "maproulette",
    "geoscribble",
    "kartaview",
    "mapillary",
    "streetside",
];

/// Paging for providers that cap results per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    /// Results per page. A page holding exactly this many triggers the next page.
    pub page_size: usize,
}

impl PagingConfig {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// Parameters of one provider integration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub name: String,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Extra rings of tiles fetched around the viewport.
    pub margin: u32,
    pub skip_null_island: bool,
    pub paging: Option<PagingConfig>,
    /// Nudge coincident markers apart.
    pub avoid_collisions: bool,
    /// Nudge step in degrees.
    pub collision_epsilon: f64,
    /// Sequence reconstruction and stepping; `None` for plain point providers.
    pub imagery: Option<StepperConfig>,
    pub event_capacity: usize,
}

impl Default for ProviderProfile {
    fn default() -> Self {
        Self {
            name: "custom".to_string(),
            min_zoom: DEFAULT_TILE_ZOOM,
            max_zoom: DEFAULT_TILE_ZOOM,
            margin: 0,
            skip_null_island: false,
            paging: None,
            avoid_collisions: false,
            collision_epsilon: DEFAULT_COLLISION_EPSILON,
            imagery: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl ProviderProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        let profile = match name.to_ascii_lowercase().as_str() {
            "keepright" => Self::qa_tracker("keepright"),
            "osmose" => Self::qa_tracker("osmose"),
            "improveosm" => Self::qa_tracker("improveosm"),
            "maproulette" => Self::qa_tracker("maproulette"),
            "geoscribble" => Self::new("geoscribble")
                .with_zoom(16.5)
                .with_skip_null_island(true),
            "kartaview" => Self::new("kartaview")
                .with_skip_null_island(true)
                .with_paging(PagingConfig::default())
                .with_imagery(StepperConfig::default()),
            "mapillary" => Self::new("mapillary")
                .with_skip_null_island(true)
                .with_imagery(StepperConfig::default()),
            "streetside" => Self::new("streetside")
                .with_zoom(16.5)
                .with_margin(2)
                .with_skip_null_island(true)
                .with_imagery(StepperConfig::default()),
            _ => return None,
        };
        Some(profile)
    }

    /// Issue trackers: one zoom, no paging, markers kept apart.
    fn qa_tracker(name: &str) -> Self {
        Self::new(name)
            .with_skip_null_island(true)
            .with_collision_avoidance(DEFAULT_COLLISION_EPSILON)
    }

    /// Fetch at a single zoom.
    pub fn with_zoom(self, zoom: f64) -> Self {
        self.with_zoom_range(zoom, zoom)
    }

    pub fn with_zoom_range(mut self, min: f64, max: f64) -> Self {
        self.min_zoom = min.min(max);
        self.max_zoom = max.max(min);
        self
    }

    pub fn with_margin(mut self, margin: u32) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_skip_null_island(mut self, skip: bool) -> Self {
        self.skip_null_island = skip;
        self
    }

    pub fn with_paging(mut self, paging: PagingConfig) -> Self {
        self.paging = Some(paging);
        self
    }

    pub fn with_collision_avoidance(mut self, epsilon: f64) -> Self {
        self.avoid_collisions = true;
        self.collision_epsilon = epsilon;
        self
    }

    pub fn with_imagery(mut self, stepper: StepperConfig) -> Self {
        self.imagery = Some(stepper);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    pub fn is_imagery(&self) -> bool {
        self.imagery.is_some()
    }

    /// The tiler this profile fetches with.
    pub fn tiler(&self) -> Tiler {
        Tiler::new()
            .zoom_range(self.min_zoom, self.max_zoom)
            .margin(self.margin)
            .skip_null_island(self.skip_null_island)
    }

    /// An empty feature cache with this profile's marker placement.
    pub fn new_cache(&self) -> SpatialCache {
        if self.avoid_collisions {
            SpatialCache::with_collision_avoidance(self.collision_epsilon)
        } else {
            SpatialCache::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_name_resolves() {
        for name in PRESET_NAMES {
            let profile = ProviderProfile::preset(name).unwrap();
            assert_eq!(profile.name, *name);
        }
        assert!(ProviderProfile::preset("nope").is_none());
        assert!(ProviderProfile::preset("KeepRight").is_some());
    }

    #[test]
    fn test_qa_presets() {
        let profile = ProviderProfile::preset("osmose").unwrap();
        assert_eq!(profile.tiler().range(), (14.0, 14.0));
        assert!(profile.skip_null_island);
        assert!(profile.avoid_collisions);
        assert!(profile.paging.is_none());
        assert!(!profile.is_imagery());
    }

    #[test]
    fn test_imagery_presets() {
        let kartaview = ProviderProfile::preset("kartaview").unwrap();
        assert_eq!(kartaview.paging, Some(PagingConfig::new(1000)));
        assert!(kartaview.is_imagery());

        let streetside = ProviderProfile::preset("streetside").unwrap();
        assert_eq!(streetside.tiler().range(), (16.5, 16.5));
        assert_eq!(streetside.margin, 2);
        assert!(!streetside.avoid_collisions);
    }

    #[test]
    fn test_zoom_range_is_ordered() {
        let profile = ProviderProfile::new("x").with_zoom_range(16.0, 12.0);
        assert_eq!((profile.min_zoom, profile.max_zoom), (12.0, 16.0));
    }

    #[test]
    fn test_event_capacity_override() {
        let profile = ProviderProfile::new("x");
        assert_eq!(profile.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(profile.with_event_capacity(8).event_capacity, 8);
    }

    #[test]
    fn test_page_size_is_at_least_one() {
        assert_eq!(PagingConfig::new(0).page_size, 1);
    }
}
