//! Synthetic hand observations.
//!
//! Builds plausible 21-landmark hands (open, fist, pinch) with the wrist
//! at a chosen interaction-space position.  Drives the scripted demo
//! session and the test suites.

use super::gesture::HandPose;
use super::landmarks::{HandObservation, Handedness, Landmark, LANDMARK_COUNT};
use super::normalize::Normalizer;
use crate::interaction::math::Vec3;

/// Image-space (dx, dy) offsets from the wrist, right hand, y down.
/// Order per finger: base (MCP or CMC) then tip.
const OPEN_THUMB: [(f32, f32); 4] = [(-0.04, -0.03), (-0.08, -0.06), (-0.16, -0.095), (-0.24, -0.13)];
const FINGER_MCPS: [(f32, f32); 4] = [(-0.05, -0.15), (0.0, -0.16), (0.04, -0.15), (0.08, -0.13)];
const OPEN_TIPS: [(f32, f32); 4] = [(-0.07, -0.37), (0.0, -0.40), (0.05, -0.37), (0.10, -0.31)];
/// Curled fingertips sit just below their knuckles.
const FIST_TIP_DROP: f32 = 0.04;
const FIST_THUMB_TIP: (f32, f32) = (-0.04, -0.10);
/// Index tip offset from the thumb tip when pinching.
const PINCH_GAP: (f32, f32) = (0.02, 0.01);

/// Builder for a single synthetic observation.
#[derive(Debug, Clone)]
pub struct SyntheticHand {
    center: Vec3,
    pose: HandPose,
    confidence: f32,
    handedness: Handedness,
    normalizer: Normalizer,
}

impl SyntheticHand {
    pub fn new(center: Vec3, pose: HandPose) -> Self {
        Self {
            center,
            pose,
            confidence: 0.95,
            handedness: Handedness::Right,
            normalizer: Normalizer::default(),
        }
    }

    pub fn open(center: Vec3) -> Self {
        Self::new(center, HandPose::Open)
    }

    pub fn fist(center: Vec3) -> Self {
        Self::new(center, HandPose::Grabbing)
    }

    pub fn pinch(center: Vec3) -> Self {
        Self::new(center, HandPose::Pinching)
    }

    pub fn confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn handedness(mut self, handedness: Handedness) -> Self {
        self.handedness = handedness;
        self
    }

    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn build(&self) -> HandObservation {
        let wrist = self.normalizer.denormalize(self.center);
        let mirror = match self.handedness {
            Handedness::Right => 1.0,
            Handedness::Left => -1.0,
        };
        let at = |(dx, dy): (f32, f32)| Landmark::new(wrist.x + dx * mirror, wrist.y + dy, wrist.z);

        let mut offsets: Vec<(f32, f32)> = Vec::with_capacity(LANDMARK_COUNT);
        offsets.push((0.0, 0.0));

        let thumb_tip = match self.pose {
            HandPose::Grabbing => FIST_THUMB_TIP,
            _ => OPEN_THUMB[3],
        };
        offsets.extend_from_slice(&OPEN_THUMB[..3]);
        offsets.push(thumb_tip);

        for (finger, mcp) in FINGER_MCPS.iter().enumerate() {
            let tip = match (self.pose, finger) {
                (HandPose::Grabbing, _) => (mcp.0, mcp.1 + FIST_TIP_DROP),
                (HandPose::Pinching, 0) => (thumb_tip.0 + PINCH_GAP.0, thumb_tip.1 + PINCH_GAP.1),
                _ => OPEN_TIPS[finger],
            };
            offsets.push(*mcp);
            offsets.push(lerp2(*mcp, tip, 1.0 / 3.0));
            offsets.push(lerp2(*mcp, tip, 2.0 / 3.0));
            offsets.push(tip);
        }

        HandObservation::new(
            offsets.into_iter().map(at).collect(),
            self.handedness,
            self.confidence,
        )
    }
}

fn lerp2(a: (f32, f32), b: (f32, f32), t: f32) -> (f32, f32) {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}
