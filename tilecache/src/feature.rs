//! Point features held by the spatial cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coord::LonLat;

/// Identifier of a feature, unique within one provider.
pub type FeatureId = String;

/// Identifier of a reconstructed capture sequence.
pub type SequenceId = String;

/// A remote point feature: a QA issue, a geocoding hit, or an imagery capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    /// Location; may differ slightly from the provider's if collision avoidance moved it.
    pub loc: LonLat,
    /// Provider-specific attributes, passed through untouched.
    #[serde(default)]
    pub attributes: Map<String, Value>,
    /// Capture metadata, present for imagery providers.
    #[serde(default)]
    pub capture: Option<Capture>,
}

/// Capture metadata for street-level imagery.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    /// Camera heading in degrees clockwise from north.
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub captured_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub captured_by: Option<String>,
    /// Previous capture in the same track.
    #[serde(default)]
    pub prev_id: Option<FeatureId>,
    /// Next capture in the same track.
    #[serde(default)]
    pub next_id: Option<FeatureId>,
    /// Assigned once the track this capture belongs to has been reconstructed.
    #[serde(default)]
    pub sequence_id: Option<SequenceId>,
}

impl Feature {
    /// A plain point feature with no attributes.
    pub fn new(id: impl Into<FeatureId>, loc: LonLat) -> Self {
        Self {
            id: id.into(),
            loc,
            attributes: Map::new(),
            capture: None,
        }
    }

    /// Attach capture metadata.
    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// Set a single attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn heading(&self) -> Option<f64> {
        self.capture.as_ref().and_then(|c| c.heading)
    }

    pub fn prev_id(&self) -> Option<&str> {
        self.capture.as_ref().and_then(|c| c.prev_id.as_deref())
    }

    pub fn next_id(&self) -> Option<&str> {
        self.capture.as_ref().and_then(|c| c.next_id.as_deref())
    }

    pub fn sequence_id(&self) -> Option<&str> {
        self.capture.as_ref().and_then(|c| c.sequence_id.as_deref())
    }

    /// True for a capture with no previous link that is not yet part of a sequence.
    pub fn starts_track(&self) -> bool {
        matches!(
            &self.capture,
            Some(Capture { prev_id: None, sequence_id: None, .. })
        )
    }
}

impl Capture {
    pub fn new(heading: f64) -> Self {
        Self {
            heading: Some(heading),
            ..Self::default()
        }
    }

    pub fn with_prev(mut self, prev_id: impl Into<FeatureId>) -> Self {
        self.prev_id = Some(prev_id.into());
        self
    }

    pub fn with_next(mut self, next_id: impl Into<FeatureId>) -> Self {
        self.next_id = Some(next_id.into());
        self
    }
}
