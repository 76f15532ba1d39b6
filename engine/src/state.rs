//! Engine state: the explicit context object every frame runs against.
//!
//! A single `EngineState` owns the classifier, hand tracker, interaction
//! engine, watchdog and pose feed.  The event loop hands it batches as
//! they arrive and calls `tick_frame` once per rendered frame:
//! classify, update interaction state, apply physics, then check the
//! watchdog.

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::feed::timing::FeedTiming;
use crate::feed::PoseFeed;
use crate::hand::{GestureClassifier, HandTracker, Normalizer, ObservationBatch};
use crate::interaction::proximity::ProximityZone;
use crate::interaction::{
    Indicator, InteractionEngine, InteractionEvent, ModeKind, RenderSnapshot, TrackingWatchdog,
    WatchdogSignal,
};

/// Everything one frame produced, for the renderer and the UI.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: u64,
    /// Whether this frame consumed a new batch.
    pub fresh: bool,
    /// Hands in the batch, before validation.
    pub detected: usize,
    /// Hands that passed validation.
    pub valid: usize,
    /// Valid hands above the confidence gate.
    pub reliable: usize,
    pub mode: ModeKind,
    pub zone: ProximityZone,
    pub watchdog: WatchdogSignal,
    pub events: Vec<InteractionEvent>,
    pub render: RenderSnapshot,
    pub indicator: Indicator,
}

/// Central engine state.
pub struct EngineState {
    pub config: EngineConfig,
    pub classifier: GestureClassifier,
    pub tracker: HandTracker,
    pub interaction: InteractionEngine,
    pub watchdog: TrackingWatchdog,
    pub feed: PoseFeed,
    pub timing: FeedTiming,
    /// Hand tracking enabled.  While off, batches are ignored.
    pub tracking: bool,
    /// Set when the pose pipeline should be restarted; cleared by the owner.
    pub recovery_requested: bool,
    pub running: bool,
    frame: u64,
}

impl EngineState {
    pub fn new(config: EngineConfig) -> Self {
        let classifier = GestureClassifier::new(
            config.classifier.clone(),
            Normalizer::new(config.normalizer.clone()),
        );
        let tracker = HandTracker::new(config.tracker.clone());
        let interaction =
            InteractionEngine::new(config.interaction.clone(), config.physics.clone());
        let watchdog = TrackingWatchdog::new(config.watchdog.clone());

        info!("EngineState initialized");

        Self {
            config,
            classifier,
            tracker,
            interaction,
            watchdog,
            feed: PoseFeed::new(),
            timing: FeedTiming::default(),
            tracking: true,
            recovery_requested: false,
            running: true,
            frame: 0,
        }
    }

    /// A batch arrived from the pose model.
    pub fn on_batch(&mut self, batch: ObservationBatch, now_ms: f64) {
        if !self.tracking {
            debug!("tracking off, dropping batch of {} hand(s)", batch.hands.len());
            return;
        }
        self.timing.record_batch(now_ms);
        self.feed.push(batch);
    }

    /// Run one frame.  `now_ms` must be monotonic.
    pub fn tick_frame(&mut self, now_ms: f64) -> FrameReport {
        self.frame += 1;

        let frame = self.feed.take_frame();
        let fresh = frame.fresh;
        let detected = frame.batch.hands.len();
        let classified = self.classifier.classify_batch(frame.batch);
        let valid = classified.len();
        let reliable = classified.iter().filter(|h| h.reliable).count();
        self.timing.record_frame(fresh);

        let tracked = self.tracker.assign(classified);
        let mut events = self.interaction.update_frame(&tracked, fresh);
        self.interaction.step_physics();

        let watchdog = if self.tracking {
            self.watchdog.tick(fresh && valid > 0, now_ms)
        } else {
            WatchdogSignal::Ok
        };
        if watchdog == WatchdogSignal::Stalled {
            // Whatever is cached came from the frozen pipeline.
            self.feed.clear();
            self.tracker.reset();
            events.extend(self.interaction.force_idle());
            self.recovery_requested = true;
        }

        for event in &events {
            debug!("frame {}: {:?}", self.frame, event);
        }

        FrameReport {
            frame: self.frame,
            fresh,
            detected,
            valid,
            reliable,
            mode: self.interaction.mode().kind(),
            zone: self.interaction.proximity().zone,
            watchdog,
            events,
            render: self.interaction.render(),
            indicator: self.interaction.indicator(),
        }
    }

    /// Stop hand tracking: release any grab and go idle immediately.
    pub fn stop_tracking(&mut self) -> Vec<InteractionEvent> {
        if !self.tracking {
            return Vec::new();
        }
        self.tracking = false;
        self.feed.clear();
        self.tracker.reset();
        self.watchdog.reset();
        let events = self.interaction.force_idle();
        info!("hand tracking stopped");
        events
    }

    pub fn start_tracking(&mut self) {
        if self.tracking {
            return;
        }
        self.tracking = true;
        self.watchdog.reset();
        self.timing.reset();
        info!("hand tracking started");
    }

    /// Take the pending recovery request, if any.
    pub fn take_recovery_request(&mut self) -> bool {
        if self.recovery_requested {
            warn!("pose pipeline restart requested");
        }
        std::mem::take(&mut self.recovery_requested)
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Generate s-expression for the status display.
    pub fn status_sexp(&self) -> String {
        let last = self
            .watchdog
            .last_success_ms()
            .map(|t| format!("{:.0}", t))
            .unwrap_or_else(|| "nil".to_string());
        format!(
            "(:tracking {} :frame {} :watchdog {} :stalls {} :last-hands-ms {} :interaction {} :feed {})",
            if self.tracking { "t" } else { "nil" },
            self.frame,
            self.watchdog.status().as_str(),
            self.watchdog.stall_count(),
            last,
            self.interaction.status_sexp(),
            self.timing.stats_sexp(),
        )
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
const FRAME_MS: f64 = 1000.0 / 60.0;

/// Drive `state` at 60 fps from `from_ms` to `until_ms`, delivering each
/// record once its timestamp has passed.
#[cfg(test)]
fn run_records(
    state: &mut EngineState,
    records: &[crate::feed::replay::ReplayRecord],
    from_ms: f64,
    until_ms: f64,
) -> Vec<FrameReport> {
    let mut reports = Vec::new();
    let mut next = records.iter().position(|r| r.t_ms >= from_ms).unwrap_or(records.len());
    let mut now = from_ms;
    while now < until_ms {
        while next < records.len() && records[next].t_ms <= now {
            state.on_batch(records[next].to_batch(), records[next].t_ms);
            next += 1;
        }
        reports.push(state.tick_frame(now));
        now += FRAME_MS;
    }
    reports
}

#[cfg(test)]
fn batch_of(hands: Vec<crate::hand::synth::SyntheticHand>) -> ObservationBatch {
    ObservationBatch::new(hands.iter().map(|h| h.build()).collect())
}

// ── Tests ──────────────────────────────────────────────────
