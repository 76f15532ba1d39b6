//! Headless frame loop.
//!
//! A calloop event loop with two sources: a repeating frame timer that
//! runs the per-frame pipeline, and a channel fed by the pose producer
//! thread.  Graceful signal handling, an optional exit timer, periodic
//! status logging, and pipeline restarts when the watchdog trips.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Context;
use calloop::channel::{self, Channel};
use calloop::timer::{TimeoutAction, Timer};
use calloop::EventLoop;
use tracing::{debug, info, warn};

use crate::feed::replay::{ReplayOptions, ReplayProducer, ReplayRecord};
use crate::hand::ObservationBatch;
use crate::interaction::{InteractionEvent, WatchdogSignal};
use crate::state::{EngineState, FrameReport};

/// Global flag set by SIGTERM/SIGINT handlers.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Frame loop configuration.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Render rate driving `tick_frame`.
    pub fps: u32,
    /// Stop after this many seconds.
    pub exit_after: Option<u64>,
    pub status_interval_ms: u64,
    /// Write status s-expressions to stdout.
    pub print_status: bool,
    /// Pipeline restarts allowed before stalls are only logged.  A restart
    /// resumes the recording at the next unsent record.
    pub max_restarts: u32,
    /// Poll interval in milliseconds (upper bound on one dispatch).
    pub poll_interval_ms: u64,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            fps: 60,
            exit_after: None,
            status_interval_ms: 1000,
            print_status: false,
            max_restarts: 3,
            poll_interval_ms: 100,
        }
    }
}

impl HeadlessConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.fps.max(1)))
    }
}

/// Install signal handlers for graceful shutdown (SIGTERM, SIGINT).
fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

fn millis_since(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

fn log_report(report: &FrameReport) {
    if report.watchdog == WatchdogSignal::Stalled {
        warn!("frame {}: hand tracking stalled", report.frame);
    }
    for event in &report.events {
        match event {
            InteractionEvent::ModeChanged { from, to } => {
                info!("frame {}: {} -> {}", report.frame, from.as_str(), to.as_str());
            }
            InteractionEvent::GrabReleased { hand, velocity } => {
                info!(
                    "frame {}: {} released, velocity ({:.3} {:.3} {:.3})",
                    report.frame, hand, velocity[0], velocity[1], velocity[2]
                );
            }
            other => debug!("frame {}: {:?}", report.frame, other),
        }
    }
}

/// Wire the frame timer and pose channel into `event_loop`.
fn insert_sources<'l>(
    event_loop: &EventLoop<'l, EngineState>,
    pose_channel: Channel<ObservationBatch>,
    frame_interval: Duration,
    start: Instant,
) -> anyhow::Result<()> {
    let handle = event_loop.handle();

    handle
        .insert_source(pose_channel, move |event, _, state: &mut EngineState| {
            if let channel::Event::Msg(batch) = event {
                state.on_batch(batch, millis_since(start));
            }
        })
        .map_err(|e| e.error)
        .context("failed to insert pose channel")?;

    handle
        .insert_source(
            Timer::from_duration(frame_interval),
            move |_, _, state: &mut EngineState| {
                let report = state.tick_frame(millis_since(start));
                log_report(&report);
                TimeoutAction::ToDuration(frame_interval)
            },
        )
        .map_err(|e| e.error)
        .context("failed to insert frame timer")?;

    Ok(())
}

/// Run the engine against `records` until the replay ends, the exit
/// timer fires, or a shutdown signal arrives.
pub fn run(
    mut state: EngineState,
    records: Vec<ReplayRecord>,
    replay: ReplayOptions,
    config: HeadlessConfig,
) -> anyhow::Result<()> {
    let mut event_loop: EventLoop<EngineState> =
        EventLoop::try_new().context("failed to create event loop")?;

    let start = Instant::now();
    let frame_interval = config.frame_interval();
    let (sender, pose_channel) = channel::channel::<ObservationBatch>();
    insert_sources(&event_loop, pose_channel, frame_interval, start)?;

    let looping = replay.looping;
    let mut producer = ReplayProducer::start(records, sender, replay)?;

    install_signal_handlers();

    let exit_duration = config.exit_after.map(Duration::from_secs);
    let status_interval = Duration::from_millis(config.status_interval_ms.max(1));
    let mut last_status_log = Instant::now();
    let poll_interval = Duration::from_millis(config.poll_interval_ms).min(frame_interval);

    info!(
        "Headless frame loop initialized ({} fps, poll interval {}ms), entering event loop",
        config.fps,
        poll_interval.as_millis()
    );

    while state.running {
        // Check global shutdown flag (set by signal handler)
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            info!("Shutdown signal received, exiting");
            state.running = false;
            break;
        }

        if let Some(dur) = exit_duration {
            if start.elapsed() >= dur {
                info!("Exit timer fired after {}s", dur.as_secs());
                state.running = false;
                break;
            }
        }

        if state.take_recovery_request() {
            if producer.restarts() < config.max_restarts {
                producer.restart()?;
            } else {
                warn!(
                    "pose pipeline restart limit ({}) reached, waiting for hands",
                    config.max_restarts
                );
            }
        }

        if !looping && !producer.is_running() {
            // Deliver whatever the producer sent last before leaving.
            event_loop.dispatch(Some(Duration::ZERO), &mut state)?;
            info!("Replay finished, exiting");
            state.running = false;
            break;
        }

        if last_status_log.elapsed() >= status_interval {
            if config.print_status {
                println!("{}", state.status_sexp());
            }
            info!(
                "Status: frame {}, mode {}, watchdog {}, {} batch(es) received",
                state.frame_count(),
                state.interaction.mode().kind().as_str(),
                state.watchdog.status().as_str(),
                state.feed.received()
            );
            last_status_log = Instant::now();
        }

        event_loop.dispatch(Some(poll_interval), &mut state)?;
    }

    producer.stop();
    if config.print_status {
        println!("{}", state.status_sexp());
    }
    info!(
        "Headless frame loop shutting down ({} frame(s), {} stall(s), {} restart(s))",
        state.frame_count(),
        state.watchdog.stall_count(),
        producer.restarts()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::scenario::Scenario;

    #[test]
    fn test_frame_interval() {
        let config = HeadlessConfig::default();
        assert!((config.frame_interval().as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);

        let zero = HeadlessConfig {
            fps: 0,
            ..HeadlessConfig::default()
        };
        assert_eq!(zero.frame_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_short_replay_runs_to_completion() {
        // 300ms of the demo's empty lead-in, played at 4x.
        let records: Vec<_> = Scenario::demo()
            .record(30.0)
            .into_iter()
            .filter(|r| r.t_ms < 300.0)
            .collect();
        let replay = ReplayOptions {
            speed: 4.0,
            looping: false,
        };
        let config = HeadlessConfig {
            exit_after: Some(10),
            ..HeadlessConfig::default()
        };
        let state = EngineState::default();
        assert!(run(state, records, replay, config).is_ok());
    }
}
