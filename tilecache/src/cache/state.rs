//! Per-provider tile bookkeeping.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;

use super::spatial::SpatialCache;
use crate::tiler::TileDescriptor;

/// A tile fetch that has been dispatched and not yet completed.
#[derive(Debug, Clone)]
pub struct InflightRequest {
    pub tile: TileDescriptor,
    /// Zero-based page being fetched.
    pub page: u32,
    /// Dispatch serial; completions carrying another serial are stale.
    pub serial: u64,
    pub token: CancellationToken,
    /// Integer viewport zoom at dispatch, used for the page cap.
    pub zoom: u8,
}

/// Everything one provider instance knows about its tiles and features.
#[derive(Debug, Default)]
pub struct CacheState {
    pub cache: SpatialCache,
    /// Tiles fully retrieved, or given up on.
    pub loaded: HashSet<String>,
    /// Subset of `loaded` whose last attempt failed.
    pub failed: HashSet<String>,
    pub inflight: HashMap<String, InflightRequest>,
    /// Next page to fetch for tiles whose pagination was interrupted.
    pub next_page: HashMap<String, u32>,
}

impl CacheState {
    pub fn new(cache: SpatialCache) -> Self {
        Self {
            cache,
            loaded: HashSet::new(),
            failed: HashSet::new(),
            inflight: HashMap::new(),
            next_page: HashMap::new(),
        }
    }

    pub fn is_loaded(&self, tile_id: &str) -> bool {
        self.loaded.contains(tile_id)
    }

    pub fn is_inflight(&self, tile_id: &str) -> bool {
        self.inflight.contains_key(tile_id)
    }

    /// Whether a tile still needs a fetch.
    pub fn needs_fetch(&self, tile_id: &str) -> bool {
        !self.is_loaded(tile_id) && !self.is_inflight(tile_id)
    }

    /// Page to start from when (re)dispatching a tile.
    pub fn resume_page(&self, tile_id: &str) -> u32 {
        self.next_page.get(tile_id).copied().unwrap_or(0)
    }

    /// Record that `page` is the next one to fetch for a tile.
    pub fn record_progress(&mut self, tile_id: &str, page: u32) {
        self.next_page.insert(tile_id.to_string(), page);
    }

    /// Record a finished tile. Clears any in-flight entry and page progress.
    pub fn mark_loaded(&mut self, tile_id: &str) {
        self.inflight.remove(tile_id);
        self.next_page.remove(tile_id);
        self.failed.remove(tile_id);
        self.loaded.insert(tile_id.to_string());
    }

    /// Record a tile whose fetch failed; it counts as loaded (with no data).
    pub fn mark_failed(&mut self, tile_id: &str) {
        self.mark_loaded(tile_id);
        self.failed.insert(tile_id.to_string());
    }

    /// Cancel every outstanding fetch and return the cancelled entries.
    pub fn cancel_all(&mut self) -> Vec<InflightRequest> {
        let drained: Vec<InflightRequest> = self.inflight.drain().map(|(_, req)| req).collect();
        for request in &drained {
            request.token.cancel();
        }
        drained
    }
}
