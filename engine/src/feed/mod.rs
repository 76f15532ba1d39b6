//! Pose feed: the hand-off between the pose model and the frame loop.
//!
//! Batches arrive on their own cadence (a producer thread pushing into a
//! calloop channel).  The loop drains them into a `PoseFeed`, which keeps
//! only the newest batch; each frame then takes that batch together with
//! a flag telling whether it is new since the previous frame.
//!
//! Provides:
//! - `timing`: batch cadence statistics
//! - `replay`: JSON-lines recordings and the producer thread
//! - `scenario`: scripted demo session

pub mod replay;
pub mod scenario;
pub mod timing;

use crate::hand::ObservationBatch;

/// A batch as seen by one frame.
#[derive(Debug, Clone, Copy)]
pub struct FeedFrame<'a> {
    pub batch: &'a ObservationBatch,
    /// First frame to see this batch.
    pub fresh: bool,
}

/// Latest-batch cache between producer and frame loop.
#[derive(Debug, Default)]
pub struct PoseFeed {
    latest: ObservationBatch,
    fresh: bool,
    received: u64,
    /// Batches replaced before any frame saw them.
    overwritten: u64,
}

impl PoseFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new batch, replacing any unconsumed one.
    pub fn push(&mut self, batch: ObservationBatch) {
        if self.fresh {
            self.overwritten += 1;
        }
        self.latest = batch;
        self.fresh = true;
        self.received += 1;
    }

    /// The batch for this frame.  Marks it consumed.
    pub fn take_frame(&mut self) -> FeedFrame<'_> {
        let fresh = self.fresh;
        self.fresh = false;
        FeedFrame {
            batch: &self.latest,
            fresh,
        }
    }

    /// Forget the cached batch, e.g. after a stall or when tracking stops.
    pub fn clear(&mut self) {
        self.latest = ObservationBatch::empty();
        self.fresh = false;
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn overwritten(&self) -> u64 {
        self.overwritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::synth::SyntheticHand;

    fn one_hand() -> ObservationBatch {
        ObservationBatch::new(vec![SyntheticHand::open([0.0, 0.0, 0.0]).build()])
    }

    #[test]
    fn test_fresh_once() {
        let mut feed = PoseFeed::new();
        feed.push(one_hand());
        let first = feed.take_frame();
        assert!(first.fresh);
        assert_eq!(first.batch.hands.len(), 1);

        // Render ticks faster than the pose model: same batch, not fresh.
        let second = feed.take_frame();
        assert!(!second.fresh);
        assert_eq!(second.batch.hands.len(), 1);
    }

    #[test]
    fn test_newest_wins() {
        let mut feed = PoseFeed::new();
        feed.push(one_hand());
        feed.push(ObservationBatch::empty());
        let frame = feed.take_frame();
        assert!(frame.fresh);
        assert!(frame.batch.is_empty());
        assert_eq!(feed.received(), 2);
        assert_eq!(feed.overwritten(), 1);
    }

    #[test]
    fn test_clear() {
        let mut feed = PoseFeed::new();
        feed.push(one_hand());
        feed.clear();
        let frame = feed.take_frame();
        assert!(!frame.fresh);
        assert!(frame.batch.is_empty());
    }

    #[test]
    fn test_starts_empty() {
        let mut feed = PoseFeed::new();
        let frame = feed.take_frame();
        assert!(!frame.fresh);
        assert!(frame.batch.is_empty());
    }
}
