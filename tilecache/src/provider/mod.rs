//! Remote feature provider boundary.
//!
//! The engine never talks to a network itself. A [`FeatureFetcher`] turns a
//! [`PageRequest`] for one tile into a [`FeaturePage`]; a [`ProviderProfile`]
//! carries the per-integration parameters (tiling, paging, imagery).
//!
//! [`RecordSetFetcher`] is a ready-made fetcher over an in-memory record set.

mod profile;
mod records;
mod types;

pub use profile::{
    PagingConfig, ProviderProfile, DEFAULT_PAGE_SIZE, DEFAULT_TILE_ZOOM, PRESET_NAMES,
};
pub use records::{RecordError, RecordSchema, RecordSetFetcher};
pub use types::{BoxFuture, FeatureFetcher, FeaturePage, FetchError, PageRequest};
