//! Capture sequence reconstruction.
//!
//! Imagery providers deliver captures one tile at a time, each carrying links
//! to its previous and next capture. A track usually spans several tiles, so
//! it can only be assembled once every capture in it has arrived.
//!
//! [`SequenceReconstructor`] remembers track leaders (captures with no
//! previous link) and, on every [`SequenceReconstructor::reconcile`], walks
//! each leader's next links through the cache. A chain that ends cleanly
//! becomes a [`Sequence`] and every capture in it is stamped with the new
//! sequence id. A chain that runs into a capture not yet cached stays pending
//! until a later batch fills the gap.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::cache::SpatialCache;
use crate::coord::{Extent, LonLat};
use crate::feature::{Feature, FeatureId, SequenceId};

/// An assembled capture track.
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub id: SequenceId,
    /// Captures from leader to tail.
    pub feature_ids: Vec<FeatureId>,
    /// Capture locations, parallel to `feature_ids`.
    pub coordinates: Vec<LonLat>,
    /// Capture time of the leader.
    pub captured_at: Option<DateTime<Utc>>,
    /// Capturer of the leader.
    pub captured_by: Option<String>,
}

impl Sequence {
    pub fn len(&self) -> usize {
        self.feature_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feature_ids.is_empty()
    }
}

/// Result of walking one leader's chain.
enum Walk {
    Complete(Vec<FeatureId>),
    Incomplete,
    Cycle(FeatureId),
    Gone,
}

/// Assembles sequences from leader-linked captures.
#[derive(Debug, Default)]
pub struct SequenceReconstructor {
    pending_leaders: BTreeSet<FeatureId>,
    sequences: HashMap<SequenceId, Sequence>,
    feature_sequence: HashMap<FeatureId, SequenceId>,
    next_sequence: u64,
}

impl SequenceReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note the track leaders among newly cached features.
    pub fn observe<'a>(&mut self, features: impl IntoIterator<Item = &'a Feature>) {
        for feature in features {
            if feature.starts_track() {
                self.pending_leaders.insert(feature.id.clone());
            }
        }
    }

    /// Try to complete every pending chain. Returns ids of newly built sequences.
    pub fn reconcile(&mut self, cache: &mut SpatialCache) -> Vec<SequenceId> {
        let leaders: Vec<FeatureId> = self.pending_leaders.iter().cloned().collect();
        let mut built = Vec::new();

        for leader in leaders {
            match walk_chain(cache, &leader) {
                Walk::Incomplete => {}
                Walk::Gone => {
                    self.pending_leaders.remove(&leader);
                }
                Walk::Cycle(at) => {
                    tracing::warn!(
                        leader = %leader,
                        repeated = %at,
                        "Capture chain loops back, dropping"
                    );
                    self.pending_leaders.remove(&leader);
                }
                Walk::Complete(chain) => {
                    self.pending_leaders.remove(&leader);
                    built.push(self.materialize(cache, chain));
                }
            }
        }
        built
    }

    fn materialize(&mut self, cache: &mut SpatialCache, chain: Vec<FeatureId>) -> SequenceId {
        let id = format!("s{}", self.next_sequence);
        self.next_sequence += 1;

        let mut coordinates = Vec::with_capacity(chain.len());
        let mut captured_at = None;
        let mut captured_by = None;

        for (position, feature_id) in chain.iter().enumerate() {
            let Some(mut feature) = cache.get(feature_id).cloned() else {
                continue;
            };
            coordinates.push(feature.loc);
            if let Some(capture) = feature.capture.as_mut() {
                if position == 0 {
                    captured_at = capture.captured_at;
                    captured_by = capture.captured_by.clone();
                }
                capture.sequence_id = Some(id.clone());
            }
            cache.replace(feature);
            self.feature_sequence.insert(feature_id.clone(), id.clone());
        }

        tracing::debug!(sequence = %id, captures = chain.len(), "Sequence complete");
        self.sequences.insert(
            id.clone(),
            Sequence {
                id: id.clone(),
                feature_ids: chain,
                coordinates,
                captured_at,
                captured_by,
            },
        );
        id
    }

    pub fn sequence(&self, id: &str) -> Option<&Sequence> {
        self.sequences.get(id)
    }

    /// The sequence a capture has been assembled into.
    pub fn sequence_of(&self, feature_id: &str) -> Option<&Sequence> {
        self.feature_sequence
            .get(feature_id)
            .and_then(|id| self.sequences.get(id))
    }

    /// Sequences with at least one capture inside the extent, ordered by id.
    pub fn sequences_in(&self, extent: &Extent, cache: &SpatialCache) -> Vec<&Sequence> {
        let ids: BTreeSet<&SequenceId> = cache
            .query(extent)
            .into_iter()
            .filter_map(|feature| self.feature_sequence.get(&feature.id))
            .collect();
        ids.into_iter()
            .filter_map(|id| self.sequences.get(id))
            .collect()
    }

    /// Drop a capture the consumer removed from the cache.
    pub fn forget(&mut self, feature_id: &str) {
        self.pending_leaders.remove(feature_id);
        let Some(sequence_id) = self.feature_sequence.remove(feature_id) else {
            return;
        };
        if let Some(sequence) = self.sequences.get_mut(&sequence_id) {
            if let Some(position) = sequence.feature_ids.iter().position(|id| id == feature_id) {
                sequence.feature_ids.remove(position);
                if position < sequence.coordinates.len() {
                    sequence.coordinates.remove(position);
                }
            }
            if sequence.is_empty() {
                self.sequences.remove(&sequence_id);
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_leaders.len()
    }

    pub fn is_pending(&self, leader_id: &str) -> bool {
        self.pending_leaders.contains(leader_id)
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn sequences(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }
}

fn walk_chain(cache: &SpatialCache, leader: &str) -> Walk {
    let Some(head) = cache.get(leader) else {
        return Walk::Gone;
    };
    if head.sequence_id().is_some() {
        return Walk::Gone;
    }

    let mut chain = vec![head.id.clone()];
    let mut seen: HashSet<&str> = HashSet::from([head.id.as_str()]);
    let mut current = head;

    while let Some(next_id) = current.next_id() {
        if seen.contains(next_id) {
            return Walk::Cycle(next_id.to_string());
        }
        let Some(next) = cache.get(next_id) else {
            return Walk::Incomplete;
        };
        seen.insert(next.id.as_str());
        chain.push(next.id.clone());
        current = next;
    }
    Walk::Complete(chain)
}
