//! tilecache - viewport-driven tile fetching into a client-side spatial cache
//!
//! This library keeps a provider's remote point features (QA issues,
//! street-level imagery captures, geocoding hits) cached for the map region a
//! user is looking at. It fetches by Web Mercator tile, never fetches a tile
//! twice, cancels fetches for tiles that scroll away, follows result paging,
//! and for imagery rebuilds capture sequences and steps between captures.
//!
//! # Modules
//!
//! - [`coord`] - lon/lat, extents and Web Mercator tile math
//! - [`tiler`] - viewport to covering tile set
//! - [`cache`] - R-tree backed feature store and tile bookkeeping
//! - [`provider`] - the fetch boundary, provider profiles and presets
//! - [`scheduler`] - fetch dispatch, cancellation and pagination
//! - [`sequence`] - capture sequence reconstruction
//! - [`stepper`] - directional stepping between captures
//! - [`jobs`] / [`events`] - busy/idle tracking and notifications
//! - [`service`] - the per-provider facade consumers use
//! - [`config`] / [`logging`] - INI profiles and tracing setup

pub mod cache;
pub mod config;
pub mod coord;
pub mod events;
pub mod feature;
pub mod jobs;
pub mod logging;
pub mod provider;
pub mod scheduler;
pub mod sequence;
pub mod service;
pub mod stepper;
pub mod tiler;

pub use feature::{Capture, Feature, FeatureId, SequenceId};
pub use service::ProviderService;
