//! Viewport-driven tile fetch scheduling.
//!
//! [`FetchScheduler`] keeps one provider's [`CacheState`] in step with the
//! viewport. On every viewport change it:
//!
//! 1. computes the desired tiles, widening to coarser zooms while the finer
//!    covering set has holes
//! 2. cancels every in-flight fetch whose tile is no longer desired
//! 3. dispatches a fetch for every desired tile that is neither loaded nor
//!    in flight
//!
//! Fetches run as tokio tasks and report back over a channel. Results are only
//! applied inside `&mut self` methods ([`FetchScheduler::process_ready`],
//! [`FetchScheduler::next_completion`], [`FetchScheduler::settle`]), so the
//! cache has a single writer. A result whose tile is no longer in flight under
//! the same dispatch serial is dropped, which keeps late results of cancelled
//! fetches out of the cache.
//!
//! # Pagination
//!
//! For paginated profiles a full page triggers the next page of the same tile
//! until [`max_pages_at_zoom`] is reached for the viewport zoom at dispatch.
//! Page progress outlives cancellation: a tile that scrolls away mid-way and
//! comes back resumes from the first page not yet applied.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::cache::{CacheState, InflightRequest};
use crate::coord::MAX_ZOOM;
use crate::events::{EventBus, ProviderEvent};
use crate::feature::FeatureId;
use crate::jobs::JobTracker;
use crate::provider::{FeatureFetcher, FeaturePage, FetchError, PageRequest, ProviderProfile};
use crate::tiler::{TileDescriptor, Tiler, Viewport};

/// Page cap for a viewport zoom.
///
/// Zoomed out, a tile covers more ground than anyone will look at closely, so
/// fewer pages are worth fetching.
pub fn max_pages_at_zoom(zoom: u8) -> u32 {
    match zoom {
        0..=14 => 2,
        15 => 5,
        16 => 10,
        17 => 20,
        18 => 40,
        _ => 80,
    }
}

/// What a fetch task reports back.
#[derive(Debug)]
struct Completion {
    tile_id: String,
    serial: u64,
    result: Result<FeaturePage, FetchError>,
}

/// Job id for one page of one tile.
fn job_id(tile_id: &str, page: u32) -> String {
    format!("{}#{}", tile_id, page)
}

/// Owns one provider's tile state and in-flight fetches.
pub struct FetchScheduler {
    profile: ProviderProfile,
    tiler: Tiler,
    fetcher: Arc<dyn FeatureFetcher>,
    state: CacheState,
    desired: Vec<TileDescriptor>,
    last_viewport: Option<Viewport>,
    jobs: JobTracker,
    events: EventBus,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    next_serial: u64,
}

impl FetchScheduler {
    pub fn new(profile: ProviderProfile, fetcher: Arc<dyn FeatureFetcher>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            tiler: profile.tiler(),
            state: CacheState::new(profile.new_cache()),
            events: EventBus::new(profile.event_capacity),
            profile,
            fetcher,
            desired: Vec::new(),
            last_viewport: None,
            jobs: JobTracker::new(),
            completions_tx,
            completions_rx,
            next_serial: 0,
        }
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    pub fn tiler(&self) -> &Tiler {
        &self.tiler
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    /// Mutable access for consumer edits to cached features.
    pub fn state_mut(&mut self) -> &mut CacheState {
        &mut self.state
    }

    /// Tiles wanted for the last viewport.
    pub fn desired_tiles(&self) -> &[TileDescriptor] {
        &self.desired
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.jobs.is_busy()
    }

    pub fn inflight_count(&self) -> usize {
        self.state.inflight.len()
    }

    /// Bring the fetch set in line with a new viewport.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load_for_viewport(&mut self, viewport: &Viewport) {
        if self.last_viewport.as_ref() == Some(viewport) {
            tracing::trace!(provider = %self.profile.name, "Viewport unchanged");
            return;
        }
        self.last_viewport = Some(*viewport);

        let desired = self.compute_desired(viewport);
        self.cancel_undesired(&desired);

        let zoom = viewport.zoom.floor().clamp(0.0, MAX_ZOOM as f64) as u8;
        for tile in &desired {
            if !self.state.needs_fetch(&tile.id) {
                continue;
            }
            let page = self.state.resume_page(&tile.id);
            if page >= max_pages_at_zoom(zoom) {
                self.state.mark_loaded(&tile.id);
                continue;
            }
            self.dispatch(tile.clone(), page, zoom);
        }
        tracing::debug!(
            provider = %self.profile.name,
            desired = desired.len(),
            inflight = self.state.inflight.len(),
            "Viewport tiles scheduled"
        );
        self.desired = desired;
    }

    /// Desired tiles for a viewport, finest zoom first.
    ///
    /// Coarser zooms are only tried while the finer set has holes: tiles the
    /// fetcher cannot serve or that failed before. Non-hole tiles from every
    /// tried zoom are kept.
    fn compute_desired(&self, viewport: &Viewport) -> Vec<TileDescriptor> {
        let finest = self.tiler.zoom_for(viewport);
        let coarsest = self.tiler.coarsest_zoom().min(finest);

        let mut desired = Vec::new();
        let mut seen = HashSet::new();
        for zoom in (coarsest..=finest).rev() {
            let mut has_holes = false;
            for tile in self.tiler.tiles_at_zoom(viewport, zoom) {
                if self.is_hole(&tile) {
                    has_holes = true;
                    continue;
                }
                if seen.insert(tile.id.clone()) {
                    desired.push(tile);
                }
            }
            if !has_holes {
                break;
            }
        }
        desired
    }

    fn is_hole(&self, tile: &TileDescriptor) -> bool {
        self.state.failed.contains(&tile.id) || !self.fetcher.supports_tile(tile)
    }

    fn cancel_undesired(&mut self, desired: &[TileDescriptor]) {
        let wanted: HashSet<&str> = desired.iter().map(|t| t.id.as_str()).collect();
        let stale: Vec<String> = self
            .state
            .inflight
            .keys()
            .filter(|id| !wanted.contains(id.as_str()))
            .cloned()
            .collect();

        for tile_id in stale {
            if let Some(request) = self.state.inflight.remove(&tile_id) {
                request.token.cancel();
                tracing::debug!(
                    provider = %self.profile.name,
                    tile = %tile_id,
                    page = request.page,
                    "Cancelled fetch"
                );
                self.end_job(&job_id(&tile_id, request.page));
            }
        }
    }

    fn dispatch(&mut self, tile: TileDescriptor, page: u32, zoom: u8) {
        let serial = self.next_serial;
        self.next_serial += 1;
        let token = CancellationToken::new();
        let tile_id = tile.id.clone();

        let request = PageRequest {
            tile: tile.clone(),
            page,
            page_size: self.profile.paging.map(|p| p.page_size),
        };
        self.state.inflight.insert(
            tile_id.clone(),
            InflightRequest {
                tile,
                page,
                serial,
                token: token.clone(),
                zoom,
            },
        );
        self.begin_job(&job_id(&tile_id, page));
        tracing::debug!(provider = %self.profile.name, tile = %tile_id, page, "Dispatching fetch");

        let fetcher = Arc::clone(&self.fetcher);
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => Err(FetchError::Cancelled),
                result = fetcher.fetch(request, token.clone()) => result,
            };
            if tx
                .send(Completion {
                    tile_id,
                    serial,
                    result,
                })
                .is_err()
            {
                tracing::trace!("Scheduler gone, dropping fetch result");
            }
        });
    }

    /// Apply one fetch result. Returns the ids of newly cached features.
    fn handle_completion(&mut self, completion: Completion) -> Vec<FeatureId> {
        let current = self
            .state
            .inflight
            .get(&completion.tile_id)
            .map(|request| request.serial);
        if current != Some(completion.serial) {
            tracing::trace!(tile = %completion.tile_id, "Dropping stale fetch result");
            return Vec::new();
        }
        let Some(request) = self.state.inflight.remove(&completion.tile_id) else {
            return Vec::new();
        };
        let tile_id = completion.tile_id;
        let job = job_id(&tile_id, request.page);

        match completion.result {
            Err(FetchError::Cancelled) => {
                tracing::trace!(tile = %tile_id, "Fetch cancelled");
                self.end_job(&job);
                Vec::new()
            }
            Err(error) => {
                tracing::warn!(
                    provider = %self.profile.name,
                    tile = %tile_id,
                    page = request.page,
                    error = %error,
                    "Tile fetch failed"
                );
                self.state.mark_failed(&tile_id);
                self.end_job(&job);
                Vec::new()
            }
            Ok(page) => {
                let full = self
                    .profile
                    .paging
                    .map(|p| page.len() >= p.page_size)
                    .unwrap_or(false);

                let mut inserted = Vec::with_capacity(page.len());
                for feature in page.features {
                    let id = feature.id.clone();
                    if self.state.cache.insert(feature) {
                        inserted.push(id);
                    }
                }

                let next_page = request.page + 1;
                if full && next_page < max_pages_at_zoom(request.zoom) {
                    self.state.record_progress(&tile_id, next_page);
                    self.dispatch(request.tile, next_page, request.zoom);
                } else {
                    self.state.mark_loaded(&tile_id);
                }
                tracing::debug!(
                    tile = %tile_id,
                    page = request.page,
                    new = inserted.len(),
                    "Tile page loaded"
                );

                self.events.emit(ProviderEvent::LoadedData {
                    tile_id: tile_id.clone(),
                });
                self.end_job(&job);
                inserted
            }
        }
    }

    /// Apply every result that has already arrived, without waiting.
    pub fn process_ready(&mut self) -> Vec<FeatureId> {
        let mut inserted = Vec::new();
        while let Ok(completion) = self.completions_rx.try_recv() {
            inserted.extend(self.handle_completion(completion));
        }
        inserted
    }

    /// Wait for the next result and apply it.
    ///
    /// Returns `None` immediately when nothing is in flight.
    pub async fn next_completion(&mut self) -> Option<Vec<FeatureId>> {
        if self.state.inflight.is_empty() {
            return None;
        }
        let completion = self.completions_rx.recv().await?;
        Some(self.handle_completion(completion))
    }

    /// Apply results until nothing is in flight, including follow-up pages.
    ///
    /// There is no timeout: a fetch that never finishes blocks this forever.
    pub async fn settle(&mut self) -> Vec<FeatureId> {
        let mut inserted = self.process_ready();
        while let Some(batch) = self.next_completion().await {
            inserted.extend(batch);
        }
        inserted
    }

    /// Cancel everything and forget all tiles and features.
    pub fn reset(&mut self) {
        let cancelled = self.state.cancel_all();
        self.events.emit_activity(self.jobs.clear());
        self.state = CacheState::new(self.profile.new_cache());
        self.desired.clear();
        self.last_viewport = None;
        tracing::info!(
            provider = %self.profile.name,
            cancelled = cancelled.len(),
            "Provider reset"
        );
    }

    fn begin_job(&mut self, job: &str) {
        let activity = self.jobs.begin(job);
        self.events.emit_activity(activity);
    }

    fn end_job(&mut self, job: &str) {
        let activity = self.jobs.end(job);
        self.events.emit_activity(activity);
    }
}

impl std::fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("provider", &self.profile.name)
            .field("fetcher", &self.fetcher.name())
            .field("features", &self.state.cache.len())
            .field("loaded", &self.state.loaded.len())
            .field("inflight", &self.state.inflight.len())
            .finish()
    }
}
