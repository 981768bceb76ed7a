//! Provider service facade.
//!
//! [`ProviderService`] is what a map layer talks to: one instance per
//! provider, built from a [`ProviderProfile`] and a [`FeatureFetcher`]. It
//! drives the [`FetchScheduler`], feeds new imagery captures to the
//! [`SequenceReconstructor`], and answers queries from the spatial cache.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilecache::provider::{ProviderProfile, RecordSetFetcher};
//! use tilecache::service::ProviderService;
//!
//! let profile = ProviderProfile::preset("streetside").unwrap();
//! let fetcher = Arc::new(RecordSetFetcher::new("local", features));
//! let mut service = ProviderService::new(profile, fetcher);
//!
//! service.load_for_viewport(&viewport);
//! service.settle().await;
//! for feature in service.query(&viewport.extent) {
//!     println!("{}", feature.id);
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::coord::Extent;
use crate::events::ProviderEvent;
use crate::feature::{Feature, FeatureId};
use crate::provider::{FeatureFetcher, ProviderProfile};
use crate::scheduler::FetchScheduler;
use crate::sequence::{Sequence, SequenceReconstructor};
use crate::stepper::{Direction, Stepper};
use crate::tiler::Viewport;

/// One provider's cache, kept in sync with the viewport.
#[derive(Debug)]
pub struct ProviderService {
    scheduler: FetchScheduler,
    /// Present for imagery profiles only.
    imagery: Option<Imagery>,
}

#[derive(Debug)]
struct Imagery {
    sequences: SequenceReconstructor,
    stepper: Stepper,
}

impl ProviderService {
    pub fn new(profile: ProviderProfile, fetcher: Arc<dyn FeatureFetcher>) -> Self {
        let imagery = profile.imagery.map(|config| Imagery {
            sequences: SequenceReconstructor::new(),
            stepper: Stepper::new(config),
        });
        Self {
            scheduler: FetchScheduler::new(profile, fetcher),
            imagery,
        }
    }

    pub fn name(&self) -> &str {
        &self.scheduler.profile().name
    }

    pub fn profile(&self) -> &ProviderProfile {
        self.scheduler.profile()
    }

    /// Start fetching for a viewport and apply any results already in.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load_for_viewport(&mut self, viewport: &Viewport) {
        self.scheduler.load_for_viewport(viewport);
        self.process_ready();
    }

    /// Apply arrived results without waiting. Returns the number of new features.
    pub fn process_ready(&mut self) -> usize {
        let inserted = self.scheduler.process_ready();
        self.absorb(inserted)
    }

    /// Wait for one result and apply it. Returns `None` when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<usize> {
        let inserted = self.scheduler.next_completion().await?;
        Some(self.absorb(inserted))
    }

    /// Apply results until nothing is in flight. Returns the number of new features.
    pub async fn settle(&mut self) -> usize {
        let inserted = self.scheduler.settle().await;
        self.absorb(inserted)
    }

    fn absorb(&mut self, inserted: Vec<FeatureId>) -> usize {
        let count = inserted.len();
        if count == 0 {
            return 0;
        }
        if let Some(imagery) = self.imagery.as_mut() {
            let state = self.scheduler.state_mut();
            imagery
                .sequences
                .observe(inserted.iter().filter_map(|id| state.cache.get(id)));
            let built = imagery.sequences.reconcile(&mut state.cache);
            if !built.is_empty() {
                tracing::info!(
                    provider = %self.scheduler.profile().name,
                    sequences = built.len(),
                    "Sequences assembled"
                );
            }
        }
        count
    }

    /// Cached features inside an extent.
    pub fn query(&self, extent: &Extent) -> Vec<&Feature> {
        self.scheduler.state().cache.query(extent)
    }

    pub fn get_feature(&self, id: &str) -> Option<&Feature> {
        self.scheduler.state().cache.get(id)
    }

    /// Swap in an edited feature. Returns `false` for unknown ids.
    pub fn replace_feature(&mut self, feature: Feature) -> bool {
        self.scheduler.state_mut().cache.replace(feature)
    }

    /// Drop a feature from the cache.
    pub fn remove_feature(&mut self, id: &str) -> Option<Feature> {
        let removed = self.scheduler.state_mut().cache.remove(id)?;
        if let Some(imagery) = self.imagery.as_mut() {
            imagery.sequences.forget(id);
        }
        Some(removed)
    }

    /// Next capture from `reference_id` in a direction.
    ///
    /// Always `None` for providers without imagery, or when the reference is
    /// not cached.
    pub fn step(
        &self,
        reference_id: &str,
        direction: Direction,
        yaw_offset: f64,
    ) -> Option<Feature> {
        let imagery = self.imagery.as_ref()?;
        let cache = &self.scheduler.state().cache;
        let reference = cache.get(reference_id)?;
        imagery.stepper.step(cache, reference, direction, yaw_offset)
    }

    /// Cancel all fetches and drop every cached tile, feature and sequence.
    pub fn reset(&mut self) {
        self.scheduler.reset();
        if let Some(imagery) = self.imagery.as_mut() {
            imagery.sequences = SequenceReconstructor::new();
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.scheduler.subscribe()
    }

    /// Assembled sequences with at least one capture in the extent.
    pub fn sequences_in(&self, extent: &Extent) -> Vec<&Sequence> {
        match self.imagery.as_ref() {
            Some(imagery) => imagery
                .sequences
                .sequences_in(extent, &self.scheduler.state().cache),
            None => Vec::new(),
        }
    }

    pub fn sequence(&self, id: &str) -> Option<&Sequence> {
        self.imagery.as_ref()?.sequences.sequence(id)
    }

    pub fn sequence_of(&self, feature_id: &str) -> Option<&Sequence> {
        self.imagery.as_ref()?.sequences.sequence_of(feature_id)
    }

    pub fn sequence_count(&self) -> usize {
        self.imagery
            .as_ref()
            .map(|imagery| imagery.sequences.sequence_count())
            .unwrap_or(0)
    }

    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    pub fn is_tile_loaded(&self, tile_id: &str) -> bool {
        self.scheduler.state().is_loaded(tile_id)
    }

    pub fn inflight_count(&self) -> usize {
        self.scheduler.inflight_count()
    }

    pub fn feature_count(&self) -> usize {
        self.scheduler.state().cache.len()
    }

    pub fn loaded_tile_count(&self) -> usize {
        self.scheduler.state().loaded.len()
    }

    /// Tiles wanted for the last viewport.
    pub fn desired_tile_ids(&self) -> Vec<&str> {
        self.scheduler
            .desired_tiles()
            .iter()
            .map(|tile| tile.id.as_str())
            .collect()
    }
}
