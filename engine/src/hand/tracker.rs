//! Frame-to-frame hand identity.
//!
//! The pose model gives no persistent hand IDs and its output order is
//! not stable.  Hands are matched to the previous frame's hands by
//! greedy nearest-neighbour on interaction-space centres; unmatched
//! hands get fresh IDs.

use std::fmt;

use tracing::debug;

use super::gesture::ClassifiedHand;
use crate::interaction::math::{distance, Vec3};

/// Identity of a hand for as long as it stays matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandId(pub u32);

impl fmt::Display for HandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hand-{}", self.0)
    }
}

/// A classified hand with its frame-stable identity.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedHand {
    pub id: HandId,
    pub hand: ClassifiedHand,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Largest centre jump between frames still treated as the same hand.
    pub max_match_distance: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_match_distance: 1.0,
        }
    }
}

/// Assigns `HandId`s across frames.
#[derive(Debug)]
pub struct HandTracker {
    pub config: TrackerConfig,
    previous: Vec<(HandId, Vec3)>,
    next_id: u32,
}

impl HandTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            previous: Vec::new(),
            next_id: 1,
        }
    }

    /// Match this frame's hands against the last frame and tag them.
    pub fn assign(&mut self, hands: Vec<ClassifiedHand>) -> Vec<TrackedHand> {
        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
        for (cur, hand) in hands.iter().enumerate() {
            for (prev, (_, center)) in self.previous.iter().enumerate() {
                let d = distance(hand.center, *center);
                if d <= self.config.max_match_distance {
                    candidates.push((d, cur, prev));
                }
            }
        }
        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut ids: Vec<Option<HandId>> = vec![None; hands.len()];
        let mut prev_taken = vec![false; self.previous.len()];
        for (_, cur, prev) in candidates {
            if ids[cur].is_none() && !prev_taken[prev] {
                ids[cur] = Some(self.previous[prev].0);
                prev_taken[prev] = true;
            }
        }

        let tracked: Vec<TrackedHand> = hands
            .into_iter()
            .zip(ids)
            .map(|(hand, id)| {
                let id = id.unwrap_or_else(|| {
                    let fresh = HandId(self.next_id);
                    self.next_id += 1;
                    debug!("new {} ({})", fresh, hand.handedness.as_str());
                    fresh
                });
                TrackedHand { id, hand }
            })
            .collect();

        self.previous = tracked.iter().map(|t| (t.id, t.hand.center)).collect();
        tracked
    }

    /// Forget all identities.
    pub fn reset(&mut self) {
        self.previous.clear();
    }
}

impl Default for HandTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

#[cfg(test)]
fn hand_at(center: Vec3) -> ClassifiedHand {
    use super::gesture::HandPose;
    use super::landmarks::Handedness;

    ClassifiedHand {
        center,
        pose: HandPose::Open,
        pinch_distance: 0.2,
        closed_finger_count: 0,
        confidence: 0.9,
        handedness: Handedness::Right,
        reliable: true,
    }
}
