//! In-memory record-set fetcher.
//!
//! [`RecordSetFetcher`] serves features from a fixed set of JSON records as if
//! they lived behind a tiled, paginated remote API. It backs the CLI replay
//! command and the integration tests.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::types::{BoxFuture, FeatureFetcher, FeaturePage, FetchError, PageRequest};
use crate::coord::LonLat;
use crate::feature::{Capture, Feature};

/// Errors while reading a record set.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array of records")]
    NotAnArray,

    #[error("record {index}: missing field '{field}'")]
    MissingField { index: usize, field: String },

    #[error("record {index}: invalid field '{field}': {reason}")]
    InvalidField {
        index: usize,
        field: String,
        reason: String,
    },
}

/// Field names a record set uses for the attributes the engine understands.
///
/// Everything else in a record is kept as a pass-through attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub id: String,
    pub lon: String,
    pub lat: String,
    pub heading: String,
    pub captured_at: String,
    pub captured_by: String,
    pub prev: String,
    pub next: String,
}

impl Default for RecordSchema {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            lon: "lon".to_string(),
            lat: "lat".to_string(),
            heading: "heading".to_string(),
            captured_at: "captured_at".to_string(),
            captured_by: "captured_by".to_string(),
            prev: "prev".to_string(),
            next: "next".to_string(),
        }
    }
}

impl RecordSchema {
    /// Parse a JSON array of records into features.
    pub fn parse(&self, json: &str) -> Result<Vec<Feature>, RecordError> {
        let value: Value = serde_json::from_str(json)?;
        let records = value.as_array().ok_or(RecordError::NotAnArray)?;
        records
            .iter()
            .enumerate()
            .map(|(index, record)| self.to_feature(index, record))
            .collect()
    }

    /// Read and parse a record file.
    pub fn load(&self, path: &Path) -> Result<Vec<Feature>, RecordError> {
        let json = std::fs::read_to_string(path)?;
        self.parse(&json)
    }

    fn to_feature(&self, index: usize, record: &Value) -> Result<Feature, RecordError> {
        let object = record.as_object().ok_or_else(|| RecordError::InvalidField {
            index,
            field: "<record>".to_string(),
            reason: "not an object".to_string(),
        })?;

        let id = self
            .optional_id(index, object, &self.id)?
            .ok_or_else(|| RecordError::MissingField {
                index,
                field: self.id.clone(),
            })?;
        let lon = self.required_number(index, object, &self.lon)?;
        let lat = self.required_number(index, object, &self.lat)?;

        let heading = self.optional_number(index, object, &self.heading)?;
        let prev_id = self.optional_id(index, object, &self.prev)?;
        let next_id = self.optional_id(index, object, &self.next)?;
        let captured_at = self.optional_time(index, object)?;
        let captured_by = object
            .get(&self.captured_by)
            .and_then(Value::as_str)
            .map(str::to_string);

        let known = [
            &self.id,
            &self.lon,
            &self.lat,
            &self.heading,
            &self.captured_at,
            &self.captured_by,
            &self.prev,
            &self.next,
        ];
        let attributes: Map<String, Value> = object
            .iter()
            .filter(|(key, _)| !known.contains(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut feature = Feature::new(id, LonLat::new(lon, lat));
        feature.attributes = attributes;
        if heading.is_some() || prev_id.is_some() || next_id.is_some() {
            feature.capture = Some(Capture {
                heading,
                captured_at,
                captured_by,
                prev_id,
                next_id,
                sequence_id: None,
            });
        }
        Ok(feature)
    }

    fn required_number(
        &self,
        index: usize,
        object: &Map<String, Value>,
        field: &str,
    ) -> Result<f64, RecordError> {
        self.optional_number(index, object, field)?
            .ok_or_else(|| RecordError::MissingField {
                index,
                field: field.to_string(),
            })
    }

    fn optional_number(
        &self,
        index: usize,
        object: &Map<String, Value>,
        field: &str,
    ) -> Result<Option<f64>, RecordError> {
        match object.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(Value::String(s)) => {
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|e| RecordError::InvalidField {
                        index,
                        field: field.to_string(),
                        reason: e.to_string(),
                    })
            }
            Some(other) => Err(RecordError::InvalidField {
                index,
                field: field.to_string(),
                reason: format!("expected a number, got {}", other),
            }),
        }
    }

    /// Ids may be strings or integers; empty strings count as absent.
    fn optional_id(
        &self,
        index: usize,
        object: &Map<String, Value>,
        field: &str,
    ) -> Result<Option<String>, RecordError> {
        match object.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.is_empty() => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(RecordError::InvalidField {
                index,
                field: field.to_string(),
                reason: format!("expected a string or integer id, got {}", other),
            }),
        }
    }

    /// RFC 3339 strings or epoch milliseconds.
    fn optional_time(
        &self,
        index: usize,
        object: &Map<String, Value>,
    ) -> Result<Option<DateTime<Utc>>, RecordError> {
        let invalid = |reason: String| RecordError::InvalidField {
            index,
            field: self.captured_at.clone(),
            reason,
        };
        match object.get(&self.captured_at) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|e| invalid(e.to_string())),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(Some)
                .ok_or_else(|| invalid(format!("timestamp {} out of range", n))),
            Some(other) => Err(invalid(format!("expected a timestamp, got {}", other))),
        }
    }
}

/// Serves a fixed feature set tile by tile.
///
/// Features inside the requested tile are ordered by id and sliced by page.
#[derive(Debug)]
pub struct RecordSetFetcher {
    name: String,
    features: Vec<Feature>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl RecordSetFetcher {
    pub fn new(name: impl Into<String>, mut features: Vec<Feature>) -> Self {
        features.sort_by(|a, b| a.id.cmp(&b.id));
        Self {
            name: name.into(),
            features,
            latency: None,
            requests: AtomicUsize::new(0),
        }
    }

    /// Delay every response; cancellation still interrupts the wait.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of fetches started so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    fn page_of(&self, request: &PageRequest) -> Vec<Feature> {
        let in_tile = self
            .features
            .iter()
            .filter(|f| request.tile.extent.contains_point(f.loc));
        match request.page_size {
            Some(size) => in_tile.skip(request.offset()).take(size).cloned().collect(),
            None => in_tile.cloned().collect(),
        }
    }
}

impl FeatureFetcher for RecordSetFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(
        &self,
        request: PageRequest,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, Result<FeaturePage, FetchError>> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        Box::pin(async move {
            if let Some(latency) = self.latency {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                    _ = tokio::time::sleep(latency) => {}
                }
            }
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            Ok(FeaturePage::new(self.page_of(&request)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::{to_tile_coords, TileCoord};
    use crate::tiler::TileDescriptor;

    const RECORDS: &str = r#"[
        {"id": "a", "lon": 13.4001, "lat": 52.5001, "heading": 90, "next": "b", "kind": "pano"},
        {"id": "b", "lon": 13.4002, "lat": 52.5001, "heading": 91, "prev": "a",
         "captured_at": "2021-05-04T10:00:00Z", "captured_by": "alice"},
        {"id": 7, "lon": "13.4003", "lat": 52.5002}
    ]"#;

    fn tile_at(lon: f64, lat: f64, zoom: u8) -> TileDescriptor {
        TileDescriptor::new(to_tile_coords(lat, lon, zoom).unwrap())
    }

    #[test]
    fn test_parse_records() {
        let features = RecordSchema::default().parse(RECORDS).unwrap();
        assert_eq!(features.len(), 3);

        let a = &features[0];
        assert_eq!(a.heading(), Some(90.0));
        assert_eq!(a.next_id(), Some("b"));
        assert_eq!(a.attributes.get("kind"), Some(&Value::from("pano")));
        assert!(a.starts_track());

        let b = &features[1];
        assert_eq!(b.prev_id(), Some("a"));
        let capture = b.capture.as_ref().unwrap();
        assert_eq!(capture.captured_by.as_deref(), Some("alice"));
        assert!(capture.captured_at.is_some());

        let plain = &features[2];
        assert_eq!(plain.id, "7");
        assert!(plain.capture.is_none());
    }

    #[test]
    fn test_custom_schema() {
        let schema = RecordSchema {
            id: "key".into(),
            lon: "x".into(),
            lat: "y".into(),
            ..RecordSchema::default()
        };
        let features = schema.parse(r#"[{"key": "k1", "x": 1.0, "y": 2.0}]"#).unwrap();
        assert_eq!(features[0].id, "k1");
        assert_eq!(features[0].loc, LonLat::new(1.0, 2.0));
    }

    #[test]
    fn test_parse_errors() {
        let schema = RecordSchema::default();
        assert!(matches!(schema.parse("{}"), Err(RecordError::NotAnArray)));
        assert!(matches!(
            schema.parse(r#"[{"lon": 1, "lat": 2}]"#),
            Err(RecordError::MissingField { index: 0, .. })
        ));
        assert!(matches!(
            schema.parse(r#"[{"id": "a", "lon": true, "lat": 2}]"#),
            Err(RecordError::InvalidField { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_serves_tile_contents_by_page() {
        let features = (0..5)
            .map(|i| {
                let lon = 13.4001 + i as f64 * 1e-5;
                Feature::new(format!("f{}", i), LonLat::new(lon, 52.5001))
            })
            .collect();
        let fetcher = RecordSetFetcher::new("test", features);
        let tile = tile_at(13.4001, 52.5001, 16);

        let first = fetcher
            .fetch(
                PageRequest {
                    tile: tile.clone(),
                    page: 0,
                    page_size: Some(2),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        let last = fetcher
            .fetch(
                PageRequest {
                    tile,
                    page: 2,
                    page_size: Some(2),
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let ids: Vec<_> = first.features.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["f0", "f1"]);
        assert_eq!(last.len(), 1);
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_outside_data_is_empty() {
        let features = RecordSchema::default().parse(RECORDS).unwrap();
        let fetcher = RecordSetFetcher::new("test", features);
        let page = fetcher
            .fetch(
                PageRequest {
                    tile: TileDescriptor::new(TileCoord::new(0, 0, 10)),
                    page: 0,
                    page_size: None,
                },
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_interrupts_latency() {
        let fetcher =
            RecordSetFetcher::new("slow", Vec::new()).with_latency(Duration::from_secs(3600));
        let token = CancellationToken::new();
        token.cancel();
        let result = fetcher
            .fetch(
                PageRequest {
                    tile: TileDescriptor::new(TileCoord::new(0, 0, 1)),
                    page: 0,
                    page_size: None,
                },
                token,
            )
            .await;
        assert_eq!(result, Err(FetchError::Cancelled));
    }
}
