//! Fetch boundary types and traits

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::feature::Feature;
use crate::tiler::TileDescriptor;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a fetcher can report for one page of one tile.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure (connection, HTTP status, timeout upstream).
    #[error("Network error: {0}")]
    Network(String),

    /// The response arrived but could not be turned into features.
    #[error("Invalid payload: {0}")]
    Payload(String),

    /// The request's cancellation token fired.
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// One page of one tile.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub tile: TileDescriptor,
    /// Zero-based page number.
    pub page: u32,
    /// Page size for paginated providers, `None` for single-shot providers.
    pub page_size: Option<usize>,
}

impl PageRequest {
    /// Index of the first result this page covers.
    pub fn offset(&self) -> usize {
        self.page_size
            .map(|size| size * self.page as usize)
            .unwrap_or(0)
    }
}

/// Features returned for one page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeaturePage {
    pub features: Vec<Feature>,
}

impl FeaturePage {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// The remote side of a provider: turns a page request into features.
///
/// Implementations own the wire format and authentication. The engine only
/// needs the features and whether the request failed. A fetcher must return
/// promptly with [`FetchError::Cancelled`] (or anything else) once `cancel`
/// fires; the engine discards the result either way.
///
/// # Dyn Compatibility
///
/// `fetch` returns a [`BoxFuture`] so schedulers can hold `Arc<dyn FeatureFetcher>`.
pub trait FeatureFetcher: Send + Sync + 'static {
    /// Name for logging.
    fn name(&self) -> &str;

    /// Whether this fetcher can serve the tile at all.
    ///
    /// Unsupported tiles are holes in a covering set and trigger fallback to
    /// coarser zooms.
    fn supports_tile(&self, _tile: &TileDescriptor) -> bool {
        true
    }

    /// Fetch one page of one tile.
    fn fetch(
        &self,
        request: PageRequest,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<FeaturePage, FetchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileCoord;

    #[test]
    fn test_fetch_error_display() {
        assert_eq!(
            FetchError::Network("connection reset".into()).to_string(),
            "Network error: connection reset"
        );
        assert_eq!(FetchError::Cancelled.to_string(), "Request cancelled");
        assert!(FetchError::Cancelled.is_cancelled());
        assert!(!FetchError::Payload("x".into()).is_cancelled());
    }

    #[test]
    fn test_page_request_offset() {
        let tile = TileDescriptor::new(TileCoord::new(0, 0, 1));
        let request = PageRequest {
            tile: tile.clone(),
            page: 3,
            page_size: Some(1000),
        };
        assert_eq!(request.offset(), 3000);

        let single = PageRequest {
            tile,
            page: 0,
            page_size: None,
        };
        assert_eq!(single.offset(), 0);
    }
}
