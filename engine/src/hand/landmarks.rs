//! Pose-model hand observations and landmark definitions.
//!
//! Models the 21 landmarks per hand emitted by the external pose
//! detector, in normalized image coordinates plus relative depth.
//! Observations are created fresh every batch and never mutated.

use serde::Deserialize;
use tracing::debug;

// ── Landmark definitions ───────────────────────────────────

/// The 21 hand landmarks in pose-model order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Total number of landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Convert landmark enum to array index (0-20).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }

    /// (tip, base) pairs used by the curl test, thumb first.
    pub fn curl_pairs() -> [(HandLandmark, HandLandmark); 5] {
        [
            (Self::ThumbTip, Self::ThumbMcp),
            (Self::IndexTip, Self::IndexMcp),
            (Self::MiddleTip, Self::MiddleMcp),
            (Self::RingTip, Self::RingMcp),
            (Self::PinkyTip, Self::PinkyMcp),
        ]
    }
}

// ── Handedness ─────────────────────────────────────────────

/// Which hand the pose model believes it saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum Handedness {
    #[serde(alias = "left")]
    Left,
    #[serde(alias = "right")]
    Right,
}

impl Handedness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

// ── Observation ────────────────────────────────────────────

/// A single landmark: x/y in normalized image space, z relative depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn as_array(&self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Euclidean distance in raw landmark units.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Accepted range for x/y; detectors report points slightly off-frame.
const COORD_MIN: f32 = -1.0;
const COORD_MAX: f32 = 2.0;

/// Why an observation was dropped for the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ObservationDefect {
    WrongLandmarkCount(usize),
    NonFinite(HandLandmark),
    OutOfRange(HandLandmark),
    BadConfidence(f32),
}

/// One hand as reported by the pose model for one batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandObservation {
    pub landmarks: Vec<Landmark>,
    pub handedness: Handedness,
    #[serde(rename = "score", alias = "confidence")]
    pub confidence: f32,
}

impl HandObservation {
    pub fn new(landmarks: Vec<Landmark>, handedness: Handedness, confidence: f32) -> Self {
        Self {
            landmarks,
            handedness,
            confidence,
        }
    }

    /// Landmark by semantic index. Only meaningful after `validate`.
    pub fn landmark(&self, which: HandLandmark) -> &Landmark {
        &self.landmarks[which.index()]
    }

    /// Check landmark count, finiteness and range.
    pub fn validate(&self) -> Result<(), ObservationDefect> {
        if self.landmarks.len() != LANDMARK_COUNT {
            return Err(ObservationDefect::WrongLandmarkCount(self.landmarks.len()));
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ObservationDefect::BadConfidence(self.confidence));
        }
        for (i, lm) in self.landmarks.iter().enumerate() {
            let which = LANDMARKS[i];
            if !(lm.x.is_finite() && lm.y.is_finite() && lm.z.is_finite()) {
                return Err(ObservationDefect::NonFinite(which));
            }
            let in_range = |v: f32| (COORD_MIN..=COORD_MAX).contains(&v);
            if !in_range(lm.x) || !in_range(lm.y) {
                return Err(ObservationDefect::OutOfRange(which));
            }
        }
        Ok(())
    }

    /// `validate`, logging and discarding the reason.
    pub fn is_usable(&self) -> bool {
        match self.validate() {
            Ok(()) => true,
            Err(defect) => {
                debug!(
                    "dropping {} hand observation: {:?}",
                    self.handedness.as_str(),
                    defect
                );
                false
            }
        }
    }
}

/// Everything the pose model emitted for one video frame.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ObservationBatch {
    #[serde(default)]
    pub hands: Vec<HandObservation>,
}

impl ObservationBatch {
    pub fn new(hands: Vec<HandObservation>) -> Self {
        Self { hands }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

/// All landmarks in order, matching `HandLandmark` indices.
pub const LANDMARKS: [HandLandmark; LANDMARK_COUNT] = [
    HandLandmark::Wrist,
    HandLandmark::ThumbCmc,
    HandLandmark::ThumbMcp,
    HandLandmark::ThumbIp,
    HandLandmark::ThumbTip,
    HandLandmark::IndexMcp,
    HandLandmark::IndexPip,
    HandLandmark::IndexDip,
    HandLandmark::IndexTip,
    HandLandmark::MiddleMcp,
    HandLandmark::MiddlePip,
    HandLandmark::MiddleDip,
    HandLandmark::MiddleTip,
    HandLandmark::RingMcp,
    HandLandmark::RingPip,
    HandLandmark::RingDip,
    HandLandmark::RingTip,
    HandLandmark::PinkyMcp,
    HandLandmark::PinkyPip,
    HandLandmark::PinkyDip,
    HandLandmark::PinkyTip,
];

#[cfg(test)]
fn flat_hand(confidence: f32) -> HandObservation {
    let landmarks = (0..LANDMARK_COUNT)
        .map(|i| Landmark::new(0.5 + i as f32 * 0.01, 0.5, 0.0))
        .collect();
    HandObservation::new(landmarks, Handedness::Right, confidence)
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::MiddleTip.index(), 12);
        assert_eq!(HandLandmark::RingTip.index(), 16);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        for (i, lm) in LANDMARKS.iter().enumerate() {
            assert_eq!(lm.index(), i);
        }
    }

    #[test]
    fn test_distance() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(0.3, 0.4, 0.0);
        assert!((a.distance(&b) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_validate_ok() {
        assert_eq!(flat_hand(0.9).validate(), Ok(()));
    }

    #[test]
    fn test_validate_wrong_count() {
        let mut hand = flat_hand(0.9);
        hand.landmarks.truncate(10);
        assert_eq!(
            hand.validate(),
            Err(ObservationDefect::WrongLandmarkCount(10))
        );
    }

    #[test]
    fn test_validate_nan() {
        let mut hand = flat_hand(0.9);
        hand.landmarks[HandLandmark::IndexTip.index()].y = f32::NAN;
        assert_eq!(
            hand.validate(),
            Err(ObservationDefect::NonFinite(HandLandmark::IndexTip))
        );
        assert!(!hand.is_usable());
    }

    #[test]
    fn test_validate_out_of_range() {
        let mut hand = flat_hand(0.9);
        hand.landmarks[HandLandmark::Wrist.index()].x = 7.0;
        assert_eq!(
            hand.validate(),
            Err(ObservationDefect::OutOfRange(HandLandmark::Wrist))
        );
    }

    #[test]
    fn test_validate_bad_confidence() {
        assert!(matches!(
            flat_hand(f32::NAN).validate(),
            Err(ObservationDefect::BadConfidence(_))
        ));
        assert!(flat_hand(1.5).validate().is_err());
    }

    #[test]
    fn test_deserialize_pose_model_record() {
        let mut points = Vec::new();
        for i in 0..LANDMARK_COUNT {
            points.push(format!("{{\"x\":{},\"y\":0.5,\"z\":-0.01}}", 0.4 + i as f32 * 0.01));
        }
        let json = format!(
            "{{\"hands\":[{{\"handedness\":\"Left\",\"score\":0.93,\"landmarks\":[{}]}}]}}",
            points.join(",")
        );
        let batch: ObservationBatch = serde_json::from_str(&json).unwrap();
        assert_eq!(batch.hands.len(), 1);
        assert_eq!(batch.hands[0].handedness, Handedness::Left);
        assert!((batch.hands[0].confidence - 0.93).abs() < 1e-6);
        assert!(batch.hands[0].is_usable());
    }

    #[test]
    fn test_handedness_as_str() {
        assert_eq!(Handedness::Left.as_str(), "left");
        assert_eq!(Handedness::Right.as_str(), "right");
    }

    #[test]
    fn test_landmark_as_str() {
        assert_eq!(HandLandmark::Wrist.as_str(), "wrist");
        assert_eq!(HandLandmark::ThumbTip.as_str(), "thumb-tip");
        assert_eq!(HandLandmark::PinkyTip.as_str(), "pinky-tip");
    }
}
