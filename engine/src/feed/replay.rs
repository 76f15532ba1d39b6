//! Recorded pose sessions.
//!
//! A recording is JSON lines, one pose-model invocation per line:
//!
//! ```text
//! {"t_ms": 33.3, "hands": [{"handedness": "Right", "score": 0.97, "landmarks": [{"x": 0.51, "y": 0.62, "z": -0.01}, ...]}]}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.  A line carrying
//! an `error` field stands for a detector failure and replays as an
//! empty batch.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use calloop::channel::Sender;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::hand::{HandObservation, ObservationBatch};

/// One timestamped pose-model output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplayRecord {
    /// Milliseconds since the start of the session.
    pub t_ms: f64,
    #[serde(default)]
    pub hands: Vec<HandObservation>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ReplayRecord {
    pub fn new(t_ms: f64, batch: ObservationBatch) -> Self {
        Self {
            t_ms,
            hands: batch.hands,
            error: None,
        }
    }

    pub fn to_batch(&self) -> ObservationBatch {
        if let Some(ref err) = self.error {
            debug!("replayed detector error at {:.0}ms: {}", self.t_ms, err);
            return ObservationBatch::empty();
        }
        ObservationBatch::new(self.hands.clone())
    }
}

/// Parse one line.  `Ok(None)` for blank and comment lines.
pub fn parse_line(line: &str) -> anyhow::Result<Option<ReplayRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let record: ReplayRecord =
        serde_json::from_str(line).context("malformed replay record")?;
    if !record.t_ms.is_finite() || record.t_ms < 0.0 {
        bail!("bad timestamp {}", record.t_ms);
    }
    Ok(Some(record))
}

/// Parse a whole recording.  Bad lines are logged and skipped.
pub fn parse_replay(text: &str) -> anyhow::Result<Vec<ReplayRecord>> {
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (i, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => {
                warn!("replay line {}: {:#}", i + 1, e);
                skipped += 1;
            }
        }
    }
    if records.is_empty() {
        bail!("no replay records ({} malformed line(s))", skipped);
    }
    records.sort_by(|a, b| a.t_ms.partial_cmp(&b.t_ms).unwrap_or(std::cmp::Ordering::Equal));
    Ok(records)
}

pub fn load_replay(path: &Path) -> anyhow::Result<Vec<ReplayRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read replay {}", path.display()))?;
    let records = parse_replay(&text).with_context(|| format!("in {}", path.display()))?;
    info!(
        "loaded {} replay record(s) spanning {:.1}s from {}",
        records.len(),
        records.last().map(|r| r.t_ms).unwrap_or(0.0) / 1000.0,
        path.display()
    );
    Ok(records)
}

/// Playback options for the producer thread.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Playback speed multiplier.
    pub speed: f64,
    /// Start over after the last record.
    pub looping: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            looping: false,
        }
    }
}

/// Replays records into a calloop channel from a background thread,
/// honouring their timestamps.  Restarting reconnects the feed at the
/// next unsent record, which is how a stalled feed is recovered.
pub struct ReplayProducer {
    records: Arc<Vec<ReplayRecord>>,
    sender: Sender<ObservationBatch>,
    options: ReplayOptions,
    stop: Arc<AtomicBool>,
    /// Index of the next record to send.
    position: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
    restarts: u32,
}

impl ReplayProducer {
    pub fn start(
        records: Vec<ReplayRecord>,
        sender: Sender<ObservationBatch>,
        options: ReplayOptions,
    ) -> anyhow::Result<Self> {
        if records.is_empty() {
            bail!("nothing to replay");
        }
        if !(options.speed.is_finite() && options.speed > 0.0) {
            bail!("replay speed must be positive, got {}", options.speed);
        }
        let mut producer = Self {
            records: Arc::new(records),
            sender,
            options,
            stop: Arc::new(AtomicBool::new(false)),
            position: Arc::new(AtomicUsize::new(0)),
            handle: None,
            restarts: 0,
        };
        producer.spawn()?;
        Ok(producer)
    }

    fn spawn(&mut self) -> anyhow::Result<()> {
        let records = Arc::clone(&self.records);
        let sender = self.sender.clone();
        let options = self.options.clone();
        let stop = Arc::clone(&self.stop);
        let position = Arc::clone(&self.position);

        let handle = std::thread::Builder::new()
            .name("pose-replay".into())
            .spawn(move || play(&records, &sender, &options, &stop, &position))
            .context("failed to spawn replay thread")?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop the current pass and resume at the next unsent record, with
    /// that record due immediately.  A finished replay starts over.
    pub fn restart(&mut self) -> anyhow::Result<()> {
        self.stop();
        self.stop = Arc::new(AtomicBool::new(false));
        if self.position() >= self.records.len() {
            self.position.store(0, Ordering::SeqCst);
        }
        self.restarts += 1;
        info!(
            "restarting replay at record {}/{} (restart #{})",
            self.position(),
            self.records.len(),
            self.restarts
        );
        self.spawn()
    }

    /// Index of the next record to send.
    pub fn position(&self) -> usize {
        self.position.load(Ordering::SeqCst)
    }

    /// Ask the thread to stop and wait for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join();
    }

    /// Wait for the thread to run out of records.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("replay thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }
}

impl Drop for ReplayProducer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Longest single sleep, so a stop request is noticed promptly.
const STOP_POLL: Duration = Duration::from_millis(50);

fn play(
    records: &[ReplayRecord],
    sender: &Sender<ObservationBatch>,
    options: &ReplayOptions,
    stop: &AtomicBool,
    position: &AtomicUsize,
) {
    let span = records.last().map(|r| r.t_ms).unwrap_or(0.0);
    let mut from = position.load(Ordering::SeqCst).min(records.len());
    let mut pass = 0u64;
    loop {
        let start = Instant::now();
        let base_ms = records.get(from).map(|r| r.t_ms).unwrap_or(0.0);
        for (i, record) in records.iter().enumerate().skip(from) {
            let offset_ms = (record.t_ms - base_ms).max(0.0);
            let due = Duration::from_secs_f64(offset_ms / options.speed / 1000.0);
            while let Some(wait) = due.checked_sub(start.elapsed()) {
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                std::thread::sleep(wait.min(STOP_POLL));
            }
            if stop.load(Ordering::SeqCst) {
                return;
            }
            if sender.send(record.to_batch()).is_err() {
                debug!("pose channel closed, replay stopping");
                return;
            }
            position.store(i + 1, Ordering::SeqCst);
        }
        pass += 1;
        if !options.looping {
            info!("replay finished ({:.1}s)", span / 1000.0);
            return;
        }
        from = 0;
        position.store(0, Ordering::SeqCst);
        debug!("replay pass {} done, looping", pass);
    }
}

#[cfg(test)]
fn record_line(t_ms: f64, hands: usize) -> String {
    let landmark = r#"{"x": 0.5, "y": 0.5, "z": 0.0}"#;
    let landmarks = vec![landmark; 21].join(", ");
    let hand = format!(
        r#"{{"handedness": "Right", "score": 0.9, "landmarks": [{}]}}"#,
        landmarks
    );
    format!(
        r#"{{"t_ms": {}, "hands": [{}]}}"#,
        t_ms,
        vec![hand; hands].join(", ")
    )
}
