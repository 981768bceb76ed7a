//! R-tree indexed feature store.
//!
//! The feature map and the R-tree are only mutated through [`SpatialCache::insert`],
//! [`SpatialCache::replace`] and [`SpatialCache::remove`], which keep them in
//! lock-step: every stored feature has exactly one index entry at its stored
//! location.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};

use crate::coord::{Extent, LonLat};
use crate::feature::{Feature, FeatureId};

/// Default marker nudge in degrees (roughly one metre).
pub const DEFAULT_COLLISION_EPSILON: f64 = 0.000_01;

/// Index entry: a feature id at a point.
#[derive(Debug, Clone, PartialEq)]
struct IndexedPoint {
    id: FeatureId,
    point: [f64; 2],
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

/// Point feature store with a bounding-box index.
#[derive(Debug)]
pub struct SpatialCache {
    features: HashMap<FeatureId, Feature>,
    index: RTree<IndexedPoint>,
    /// Marker nudge when collision avoidance is on.
    collision_epsilon: Option<f64>,
}

impl Default for SpatialCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialCache {
    /// A cache that stores features at their reported locations.
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
            index: RTree::new(),
            collision_epsilon: None,
        }
    }

    /// A cache that moves features off occupied locations so every marker stays clickable.
    pub fn with_collision_avoidance(epsilon: f64) -> Self {
        Self {
            collision_epsilon: Some(epsilon),
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.features.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.features.get(id)
    }

    /// Insert a feature unless its id is already cached.
    ///
    /// Returns `true` if the feature was added. With collision avoidance the
    /// stored location may differ from `feature.loc`.
    pub fn insert(&mut self, mut feature: Feature) -> bool {
        if self.features.contains_key(&feature.id) {
            return false;
        }
        if let Some(epsilon) = self.collision_epsilon {
            feature.loc = self.free_location(feature.loc, epsilon);
        }
        self.index.insert(IndexedPoint {
            id: feature.id.clone(),
            point: feature.loc.to_array(),
        });
        self.features.insert(feature.id.clone(), feature);
        true
    }

    /// Swap in a new version of a cached feature.
    ///
    /// Returns `false` (and does nothing) if the id is unknown.
    pub fn replace(&mut self, feature: Feature) -> bool {
        if self.remove(&feature.id).is_none() {
            return false;
        }
        self.index.insert(IndexedPoint {
            id: feature.id.clone(),
            point: feature.loc.to_array(),
        });
        self.features.insert(feature.id.clone(), feature);
        true
    }

    /// Remove a feature and its index entry. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> Option<Feature> {
        let feature = self.features.remove(id)?;
        let entry = IndexedPoint {
            id: feature.id.clone(),
            point: feature.loc.to_array(),
        };
        if self.index.remove(&entry).is_none() {
            tracing::warn!(feature_id = %id, "Spatial index entry missing on remove");
        }
        Some(feature)
    }

    /// Features whose location lies inside the extent.
    pub fn query(&self, extent: &Extent) -> Vec<&Feature> {
        let envelope = AABB::from_corners(
            [extent.min_lon, extent.min_lat],
            [extent.max_lon, extent.max_lat],
        );
        self.index
            .locate_in_envelope(&envelope)
            .filter_map(|entry| self.features.get(&entry.id))
            .collect()
    }

    /// All cached features, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    fn is_occupied(&self, loc: LonLat) -> bool {
        self.index
            .locate_in_envelope(&AABB::from_point(loc.to_array()))
            .next()
            .is_some()
    }

    /// First free location: unchanged if free, else one step up, then steps right.
    fn free_location(&self, loc: LonLat, epsilon: f64) -> LonLat {
        if !self.is_occupied(loc) {
            return loc;
        }
        let mut candidate = LonLat::new(loc.lon, loc.lat + epsilon);
        while self.is_occupied(candidate) {
            candidate.lon += epsilon;
        }
        candidate
    }
}
