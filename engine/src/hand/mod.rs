//! Hand input side of the engine.
//!
//! Provides:
//! - `landmarks`: pose-model observation contract and validation
//! - `normalize`: image-space to interaction-space mapping
//! - `gesture`: per-hand open / pinching / grabbing classification
//! - `tracker`: hand identity across frames
//! - `synth`: synthetic hands for the demo session and tests

pub mod gesture;
pub mod landmarks;
pub mod normalize;
pub mod synth;
pub mod tracker;

pub use gesture::{ClassifiedHand, ClassifierConfig, GestureClassifier, HandPose};
pub use landmarks::{HandLandmark, HandObservation, Handedness, Landmark, ObservationBatch};
pub use normalize::{Normalizer, NormalizerConfig};
pub use tracker::{HandId, HandTracker, TrackedHand, TrackerConfig};
