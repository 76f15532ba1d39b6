//! Tracking-loss watchdog.
//!
//! Tells a frozen pose pipeline apart from a user who simply has no
//! hands in view.  After hands have been seen, going longer than the
//! stall threshold without any emits a single `Stalled` so the owner can
//! restart the external pipeline; the watchdog then stays quiet until
//! hands are observed again.

use tracing::{info, warn};

/// Per-tick watchdog verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogSignal {
    Ok,
    Stalled,
}

/// Longer-lived state for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    /// No hands seen since start or reset.
    Waiting,
    Tracking,
    /// Hands gone, still under the stall threshold.
    NoHands,
    /// Stall reported, waiting for hands to return.
    Stalled,
}

impl TrackingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Tracking => "tracking",
            Self::NoHands => "no-hands",
            Self::Stalled => "stalled",
        }
    }
}

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Milliseconds without hands before a stall is reported.
    pub stall_threshold_ms: f64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            stall_threshold_ms: 3000.0,
        }
    }
}

#[derive(Debug)]
pub struct TrackingWatchdog {
    pub config: WatchdogConfig,
    last_success_ms: Option<f64>,
    /// Set once hands are seen; cleared when a stall is reported.
    armed: bool,
    status: TrackingStatus,
    stall_count: u64,
}

impl TrackingWatchdog {
    pub fn new(config: WatchdogConfig) -> Self {
        Self {
            config,
            last_success_ms: None,
            armed: false,
            status: TrackingStatus::Waiting,
            stall_count: 0,
        }
    }

    /// Feed one frame's outcome. `now_ms` must be monotonic.
    pub fn tick(&mut self, has_hands: bool, now_ms: f64) -> WatchdogSignal {
        if has_hands {
            if self.status == TrackingStatus::Stalled {
                info!("hand tracking recovered");
            }
            self.last_success_ms = Some(now_ms);
            self.armed = true;
            self.status = TrackingStatus::Tracking;
            return WatchdogSignal::Ok;
        }

        if !self.armed {
            return WatchdogSignal::Ok;
        }

        let elapsed = self
            .last_success_ms
            .map(|t| now_ms - t)
            .unwrap_or(0.0);
        if elapsed > self.config.stall_threshold_ms {
            self.armed = false;
            self.status = TrackingStatus::Stalled;
            self.stall_count += 1;
            warn!(
                "no hands for {:.0}ms after active tracking, pose pipeline presumed stalled",
                elapsed
            );
            return WatchdogSignal::Stalled;
        }

        self.status = TrackingStatus::NoHands;
        WatchdogSignal::Ok
    }

    pub fn status(&self) -> TrackingStatus {
        self.status
    }

    pub fn last_success_ms(&self) -> Option<f64> {
        self.last_success_ms
    }

    pub fn stall_count(&self) -> u64 {
        self.stall_count
    }

    pub fn reset(&mut self) {
        self.last_success_ms = None;
        self.armed = false;
        self.status = TrackingStatus::Waiting;
    }
}

impl Default for TrackingWatchdog {
    fn default() -> Self {
        Self::new(WatchdogConfig::default())
    }
}
