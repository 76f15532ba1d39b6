//! Object side of the engine.
//!
//! Provides:
//! - `machine`: Idle / Hover / Grabbing / TwoHandTransform state machine
//! - `transform`: object transform, appearance and physics overlay
//! - `proximity`: distance zones and indicator feedback
//! - `watchdog`: tracking-stall detection
//! - `math`: `[f32; 3]` helpers

pub mod machine;
pub mod math;
pub mod proximity;
pub mod transform;
pub mod watchdog;

pub use machine::{
    InteractionConfig, InteractionEngine, InteractionEvent, InteractionMode, ModeKind,
    RenderSnapshot,
};
pub use proximity::{Indicator, Proximity, ProximityZone};
pub use transform::{Appearance, Bounds, ObjectTransform, PhysicsConfig};
pub use watchdog::{TrackingStatus, TrackingWatchdog, WatchdogConfig, WatchdogSignal};
