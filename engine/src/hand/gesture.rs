//! Per-hand pose classification from pose-model landmarks.
//!
//! Computes finger-curl and pinch metrics from landmark distances and
//! classifies the hand as open, pinching or grabbing.  Pure per-hand
//! computation: no state is carried between frames or across hands.

use tracing::debug;

use super::landmarks::{HandLandmark, HandObservation, Handedness, ObservationBatch};
use super::normalize::Normalizer;
use crate::interaction::math::Vec3;

// ── Pose types ─────────────────────────────────────────────

/// Instantaneous hand pose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandPose {
    /// Neither pinching nor grabbing.
    Open,
    /// Thumb tip close to index tip, fewer than `min_closed_fingers` curled.
    Pinching,
    /// At least `min_closed_fingers` fingers curled toward the palm.
    Grabbing,
}

impl HandPose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Pinching => "pinching",
            Self::Grabbing => "grabbing",
        }
    }
}

/// A classified hand for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedHand {
    /// Wrist position in interaction space.
    pub center: Vec3,
    pub pose: HandPose,
    /// Thumb-tip to index-tip distance (raw landmark units).
    pub pinch_distance: f32,
    /// Fingers (thumb included) whose tip is within the curl threshold of its base.
    pub closed_finger_count: u8,
    pub confidence: f32,
    pub handedness: Handedness,
    /// Confidence at or above the gate; the state machine ignores unreliable hands.
    pub reliable: bool,
}

impl ClassifiedHand {
    pub fn is_grabbing(&self) -> bool {
        self.pose == HandPose::Grabbing
    }

    pub fn is_pinching(&self) -> bool {
        self.pose == HandPose::Pinching
    }
}

// ── Config ─────────────────────────────────────────────────

/// Classification thresholds, in raw normalized-image units.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// A finger is closed when tip-to-base distance falls below this.
    pub grab_threshold: f32,
    /// Thumb-tip to index-tip distance below which the hand pinches.
    pub pinch_threshold: f32,
    /// Closed fingers required for a grab.
    pub min_closed_fingers: u8,
    /// Minimum confidence for the state machine to act on a hand.
    pub min_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            grab_threshold: 0.15,
            pinch_threshold: 0.08,
            min_closed_fingers: 4,
            min_confidence: 0.8,
        }
    }
}

// ── Classifier ─────────────────────────────────────────────

/// Stateless classifier over a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    pub config: ClassifierConfig,
    pub normalizer: Normalizer,
}

impl GestureClassifier {
    pub fn new(config: ClassifierConfig, normalizer: Normalizer) -> Self {
        Self { config, normalizer }
    }

    /// Classify one hand. Returns `None` for malformed observations.
    pub fn classify(&self, obs: &HandObservation) -> Option<ClassifiedHand> {
        if !obs.is_usable() {
            return None;
        }

        let closed = self.closed_finger_count(obs);
        let pinch_distance = obs
            .landmark(HandLandmark::ThumbTip)
            .distance(obs.landmark(HandLandmark::IndexTip));

        let pose = if closed >= self.config.min_closed_fingers {
            HandPose::Grabbing
        } else if pinch_distance < self.config.pinch_threshold {
            HandPose::Pinching
        } else {
            HandPose::Open
        };

        let center = self.normalizer.normalize(obs.landmark(HandLandmark::Wrist));
        let reliable = obs.confidence >= self.config.min_confidence;
        if !reliable {
            debug!(
                "{} hand below confidence gate ({:.2} < {:.2})",
                obs.handedness.as_str(),
                obs.confidence,
                self.config.min_confidence
            );
        }

        Some(ClassifiedHand {
            center,
            pose,
            pinch_distance,
            closed_finger_count: closed,
            confidence: obs.confidence,
            handedness: obs.handedness,
            reliable,
        })
    }

    /// Classify every usable hand in a batch, preserving batch order.
    pub fn classify_batch(&self, batch: &ObservationBatch) -> Vec<ClassifiedHand> {
        batch.hands.iter().filter_map(|h| self.classify(h)).collect()
    }

    fn closed_finger_count(&self, obs: &HandObservation) -> u8 {
        HandLandmark::curl_pairs()
            .iter()
            .filter(|(tip, base)| {
                obs.landmark(*tip).distance(obs.landmark(*base)) < self.config.grab_threshold
            })
            .count() as u8
    }

    /// Generate s-expression for the classifier thresholds.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:grab-threshold {:.3} :pinch-threshold {:.3} :min-closed-fingers {} :min-confidence {:.2})",
            self.config.grab_threshold,
            self.config.pinch_threshold,
            self.config.min_closed_fingers,
            self.config.min_confidence,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::landmarks::Landmark;
    use crate::hand::synth::SyntheticHand;

    fn classifier() -> GestureClassifier {
        GestureClassifier::default()
    }

    #[test]
    fn test_open_hand() {
        let hand = SyntheticHand::open([0.0, 0.0, 0.0]).build();
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.pose, HandPose::Open);
        assert_eq!(c.closed_finger_count, 0);
        assert!(c.reliable);
    }

    #[test]
    fn test_fist_is_grabbing() {
        let hand = SyntheticHand::fist([0.0, 0.0, 0.0]).build();
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.pose, HandPose::Grabbing);
        assert_eq!(c.closed_finger_count, 5);
    }

    #[test]
    fn test_four_closed_fingers_is_grabbing() {
        let mut hand = SyntheticHand::fist([0.0, 0.0, 0.0]).build();
        // Straighten the pinky: thumb + 3 fingers remain closed.
        let mcp = hand.landmarks[HandLandmark::PinkyMcp.index()];
        hand.landmarks[HandLandmark::PinkyTip.index()] = Landmark::new(mcp.x, mcp.y - 0.25, mcp.z);
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.closed_finger_count, 4);
        assert_eq!(c.pose, HandPose::Grabbing);
    }

    #[test]
    fn test_three_closed_fingers_is_not_grabbing() {
        let mut hand = SyntheticHand::fist([0.0, 0.0, 0.0]).build();
        for (tip, base) in [
            (HandLandmark::PinkyTip, HandLandmark::PinkyMcp),
            (HandLandmark::RingTip, HandLandmark::RingMcp),
        ] {
            let mcp = hand.landmarks[base.index()];
            hand.landmarks[tip.index()] = Landmark::new(mcp.x, mcp.y - 0.25, mcp.z);
        }
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.closed_finger_count, 3);
        assert_ne!(c.pose, HandPose::Grabbing);
    }

    #[test]
    fn test_pinch() {
        let hand = SyntheticHand::pinch([0.0, 0.0, 0.0]).build();
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.pose, HandPose::Pinching);
        assert!(c.pinch_distance < classifier().config.pinch_threshold);
        assert!(c.closed_finger_count < 4);
    }

    #[test]
    fn test_grab_wins_over_pinch() {
        // A fist also has thumb and index tips close together.
        let hand = SyntheticHand::fist([0.0, 0.0, 0.0]).build();
        let c = classifier().classify(&hand).unwrap();
        assert!(c.pinch_distance < classifier().config.pinch_threshold);
        assert_eq!(c.pose, HandPose::Grabbing);
    }

    #[test]
    fn test_pinch_threshold_tunable() {
        let mut cls = classifier();
        cls.config.pinch_threshold = 0.001;
        let hand = SyntheticHand::pinch([0.0, 0.0, 0.0]).build();
        assert_eq!(cls.classify(&hand).unwrap().pose, HandPose::Open);
    }

    #[test]
    fn test_low_confidence_reported_but_unreliable() {
        let hand = SyntheticHand::fist([0.0, 0.0, 0.0]).confidence(0.5).build();
        let c = classifier().classify(&hand).unwrap();
        assert_eq!(c.pose, HandPose::Grabbing);
        assert!(!c.reliable);
    }

    #[test]
    fn test_center_is_wrist_in_interaction_space() {
        let hand = SyntheticHand::open([0.6, -0.4, 0.2]).build();
        let c = classifier().classify(&hand).unwrap();
        assert!((c.center[0] - 0.6).abs() < 1e-4);
        assert!((c.center[1] + 0.4).abs() < 1e-4);
        assert!((c.center[2] - 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_malformed_hand_dropped() {
        let mut hand = SyntheticHand::open([0.0, 0.0, 0.0]).build();
        hand.landmarks.pop();
        assert!(classifier().classify(&hand).is_none());
    }

    #[test]
    fn test_classify_batch_skips_bad_hands() {
        let good = SyntheticHand::open([0.0, 0.0, 0.0]).build();
        let mut bad = SyntheticHand::fist([0.5, 0.0, 0.0]).build();
        bad.landmarks[3].x = f32::INFINITY;
        let batch = ObservationBatch::new(vec![bad, good]);
        let hands = classifier().classify_batch(&batch);
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].pose, HandPose::Open);
    }

    #[test]
    fn test_config_sexp() {
        let sexp = classifier().config_sexp();
        assert!(sexp.contains(":grab-threshold 0.150"));
        assert!(sexp.contains(":pinch-threshold 0.080"));
        assert!(sexp.contains(":min-confidence 0.80"));
    }

    #[test]
    fn test_pose_as_str() {
        assert_eq!(HandPose::Open.as_str(), "open");
        assert_eq!(HandPose::Pinching.as_str(), "pinching");
        assert_eq!(HandPose::Grabbing.as_str(), "grabbing");
    }
}
