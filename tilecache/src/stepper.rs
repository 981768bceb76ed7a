//! Directional stepping between imagery captures.
//!
//! From a reference capture, [`Stepper::step`] looks for the best next capture
//! inside a trapezoid that opens out along the viewing direction: narrow at the
//! reference, wide at the far end. Candidates are scored by ground distance,
//! with a penalty for facing a different way than the reference. When the
//! trapezoid is empty the capture's own track link is used instead.

use crate::cache::SpatialCache;
use crate::coord::{distance_meters, local_offset_meters, offset_to_lon_lat, Extent, LonLat};
use crate::feature::Feature;

/// Default length of the search trapezoid in metres.
pub const DEFAULT_SEARCH_DISTANCE_M: f64 = 35.0;

/// Default heading difference, in degrees, above which a candidate is penalized.
pub const DEFAULT_HEADING_TOLERANCE_DEG: f64 = 20.0;

/// Default penalty in metres for a heading mismatch.
pub const DEFAULT_MISMATCH_PENALTY_M: f64 = 5.0;

/// Which way to step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "next" => Ok(Direction::Forward),
            "backward" | "back" | "prev" => Ok(Direction::Backward),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Stepping parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperConfig {
    /// Trapezoid length in metres.
    pub search_distance: f64,
    /// Degrees of heading difference tolerated without penalty.
    pub heading_tolerance: f64,
    /// Metres added to a mismatched candidate's score.
    pub mismatch_penalty: f64,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            search_distance: DEFAULT_SEARCH_DISTANCE_M,
            heading_tolerance: DEFAULT_HEADING_TOLERANCE_DEG,
            mismatch_penalty: DEFAULT_MISMATCH_PENALTY_M,
        }
    }
}

/// Picks the next capture in a direction.
#[derive(Debug, Clone, Default)]
pub struct Stepper {
    config: StepperConfig,
}

impl Stepper {
    pub fn new(config: StepperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Best capture to move to from `reference`, if any.
    ///
    /// `yaw_offset` is the viewer's rotation relative to the capture heading.
    pub fn step(
        &self,
        cache: &SpatialCache,
        reference: &Feature,
        direction: Direction,
        yaw_offset: f64,
    ) -> Option<Feature> {
        let reference_heading = reference.heading().unwrap_or(0.0);
        let mut bearing = reference_heading + yaw_offset;
        if direction == Direction::Backward {
            bearing += 180.0;
        }

        let area = search_area(bearing, self.config.search_distance);
        let corners = area.map(|(east, north)| offset_to_lon_lat(reference.loc, east, north));
        let bbox = Extent::from_points(corners)?;

        let mut best: Option<(f64, &Feature)> = None;
        for candidate in cache.query(&bbox) {
            if candidate.id == reference.id {
                continue;
            }
            if !point_in_polygon(local_offset_meters(reference.loc, candidate.loc), &area) {
                continue;
            }
            let score = self.score(reference, reference_heading, candidate);
            let better = match best {
                None => true,
                Some((best_score, best_feature)) => {
                    score < best_score || (score == best_score && candidate.id < best_feature.id)
                }
            };
            if better {
                best = Some((score, candidate));
            }
        }

        if let Some((score, feature)) = best {
            tracing::trace!(from = %reference.id, to = %feature.id, score, "Stepped");
            return Some(feature.clone());
        }

        let linked = match direction {
            Direction::Forward => reference.next_id(),
            Direction::Backward => reference.prev_id(),
        }?;
        cache.get(linked).cloned()
    }

    fn score(&self, reference: &Feature, reference_heading: f64, candidate: &Feature) -> f64 {
        let mut score = distance_meters(reference.loc, candidate.loc);
        let matches = candidate
            .heading()
            .map(|h| heading_difference(reference_heading, h) <= self.config.heading_tolerance)
            .unwrap_or(false);
        if !matches {
            score += self.config.mismatch_penalty;
        }
        score
    }
}

/// Trapezoid corners as (east, north) metre offsets from the reference.
///
/// The near edge passes through the origin with half-width `distance / 5`; the
/// far edge lies `distance` ahead with half-width `distance / 2`. The shape is
/// turned clockwise to `bearing` degrees from north.
pub fn search_area(bearing: f64, distance: f64) -> [(f64, f64); 4] {
    let near = distance / 5.0;
    let far = distance / 2.0;
    let (sin, cos) = bearing.to_radians().sin_cos();
    // (across, ahead) in the viewing frame, x to the right of the bearing.
    [(near, 0.0), (far, distance), (-far, distance), (-near, 0.0)]
        .map(|(x, y)| (x * cos + y * sin, -x * sin + y * cos))
}

/// Smallest angle between two headings, in `[0, 180]`.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// Ray-casting containment test. Points on an edge may land either side.
fn point_in_polygon(point: (f64, f64), polygon: &[(f64, f64)]) -> bool {
    let (px, py) = point;
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (xi, yi) = polygon[i];
        let (xj, yj) = polygon[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}
