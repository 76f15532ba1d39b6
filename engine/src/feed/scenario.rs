//! Scripted demo session.
//!
//! Stands in for a live pose model: a fixed sequence of segments, each
//! placing synthetic hands as a function of progress through the
//! segment.  Rendered into replay records at the pose-model rate.

use super::replay::ReplayRecord;
use crate::hand::landmarks::Handedness;
use crate::hand::synth::SyntheticHand;
use crate::hand::ObservationBatch;
use crate::interaction::math::{lerp3, Vec3};

/// Hands for a segment at progress `u` in `[0, 1]`.
type HandScript = fn(f32) -> Vec<SyntheticHand>;

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: &'static str,
    pub duration_ms: f64,
    hands: HandScript,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    segments: Vec<Segment>,
}

fn path(from: Vec3, to: Vec3, u: f32) -> Vec3 {
    lerp3(from, to, u)
}

const GRAB_START: Vec3 = [0.5, 0.1, 0.0];
const GRAB_END: Vec3 = [1.3, 0.6, 0.3];
const TWO_HAND_LEFT: Vec3 = [0.9, 0.5, 0.1];
const TWO_HAND_RIGHT: Vec3 = [1.9, 0.8, 0.1];

impl Scenario {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Approach, grab and drag, release, two-hand scale, then a tracking
    /// dropout long enough to trip the stall watchdog.
    pub fn demo() -> Self {
        let seg = |name, duration_ms, hands: HandScript| Segment {
            name,
            duration_ms,
            hands,
        };
        Self::new(vec![
            seg("empty", 1000.0, |_| Vec::new()),
            seg("approach", 1500.0, |u| {
                vec![SyntheticHand::open(path([2.4, 0.3, 0.0], GRAB_START, u))]
            }),
            seg("grab", 2000.0, |u| {
                vec![SyntheticHand::fist(path(GRAB_START, GRAB_END, u))]
            }),
            seg("release", 800.0, |_| vec![SyntheticHand::open(GRAB_END)]),
            seg("withdraw", 700.0, |u| {
                vec![SyntheticHand::open(path(GRAB_END, [2.8, 1.5, 0.0], u))]
            }),
            // The withdrawing hand drags the cube to roughly (1.6, 0.75, 0.25);
            // both hands close in around it from there.
            seg("two-hand", 2500.0, |u| {
                vec![
                    SyntheticHand::pinch(path(TWO_HAND_LEFT, [0.4, 0.4, 0.0], u))
                        .handedness(Handedness::Left),
                    SyntheticHand::pinch(path(TWO_HAND_RIGHT, [2.4, 0.9, 0.0], u)),
                ]
            }),
            seg("let-go", 500.0, |_| {
                vec![
                    SyntheticHand::open([0.4, 0.4, 0.0]).handedness(Handedness::Left),
                    SyntheticHand::pinch([2.4, 0.9, 0.0]),
                ]
            }),
            seg("dropout", 5000.0, |_| Vec::new()),
            seg("return", 1000.0, |_| vec![SyntheticHand::open([2.0, 0.0, 0.0])]),
        ])
    }

    pub fn duration_ms(&self) -> f64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Segment active at `t_ms` and progress through it.
    fn locate(&self, t_ms: f64) -> Option<(&Segment, f32)> {
        let mut start = 0.0;
        for segment in &self.segments {
            let end = start + segment.duration_ms;
            if t_ms < end {
                let u = if segment.duration_ms > 0.0 {
                    ((t_ms - start) / segment.duration_ms).clamp(0.0, 1.0)
                } else {
                    1.0
                };
                return Some((segment, u as f32));
            }
            start = end;
        }
        None
    }

    pub fn segment_at(&self, t_ms: f64) -> Option<&'static str> {
        self.locate(t_ms).map(|(s, _)| s.name)
    }

    /// Pose-model output at `t_ms`; empty past the end.
    pub fn batch_at(&self, t_ms: f64) -> ObservationBatch {
        match self.locate(t_ms) {
            Some((segment, u)) => {
                ObservationBatch::new((segment.hands)(u).iter().map(|h| h.build()).collect())
            }
            None => ObservationBatch::empty(),
        }
    }

    /// Sample the script at `feed_hz` into replay records.
    pub fn record(&self, feed_hz: f64) -> Vec<ReplayRecord> {
        let hz = feed_hz.max(1.0);
        let count = (self.duration_ms() * hz / 1000.0).ceil() as usize;
        (0..count)
            .map(|i| {
                let t = i as f64 * 1000.0 / hz;
                ReplayRecord::new(t, self.batch_at(t))
            })
            .collect()
    }
}
