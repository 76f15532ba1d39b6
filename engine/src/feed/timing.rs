//! Pose feed cadence instrumentation.
//!
//! The pose model and the frame loop run at unrelated rates.  This keeps
//! rolling statistics on batch arrival intervals and on how many frames
//! ran without a fresh batch, for status reporting.

/// Rolling feed statistics over a window of samples.
#[derive(Debug)]
pub struct FeedTiming {
    /// Milliseconds between consecutive batch arrivals.
    pub batch_intervals: Vec<f64>,
    /// Maximum number of samples to keep.
    pub window_size: usize,
    pub total_batches: u64,
    pub total_frames: u64,
    /// Frames that ran on a cached batch.
    pub stale_frames: u64,
    last_batch_ms: Option<f64>,
}

impl Default for FeedTiming {
    fn default() -> Self {
        Self::new(600)
    }
}

impl FeedTiming {
    pub fn new(window_size: usize) -> Self {
        Self {
            batch_intervals: Vec::with_capacity(window_size),
            window_size,
            total_batches: 0,
            total_frames: 0,
            stale_frames: 0,
            last_batch_ms: None,
        }
    }

    /// Record a batch arriving at `now_ms`.
    pub fn record_batch(&mut self, now_ms: f64) {
        if let Some(last) = self.last_batch_ms {
            self.batch_intervals.push(now_ms - last);
            if self.batch_intervals.len() > self.window_size {
                self.batch_intervals.remove(0);
            }
        }
        self.last_batch_ms = Some(now_ms);
        self.total_batches += 1;
    }

    /// Record one frame; `fresh` is whether it consumed a new batch.
    pub fn record_frame(&mut self, fresh: bool) {
        self.total_frames += 1;
        if !fresh {
            self.stale_frames += 1;
        }
    }

    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn stats(&self) -> FeedTimingStats {
        let mut intervals = self.batch_intervals.clone();
        intervals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let p50 = Self::percentile(&intervals, 50.0);

        FeedTimingStats {
            interval_p50: p50,
            interval_p99: Self::percentile(&intervals, 99.0),
            batch_hz: if p50 > 0.0 { 1000.0 / p50 } else { 0.0 },
            stale_pct: if self.total_frames > 0 {
                (self.stale_frames as f64 / self.total_frames as f64) * 100.0
            } else {
                0.0
            },
            total_batches: self.total_batches,
            total_frames: self.total_frames,
        }
    }

    pub fn stats_sexp(&self) -> String {
        let s = self.stats();
        format!(
            "(:interval-p50 {:.1} :interval-p99 {:.1} :batch-hz {:.1} :stale-pct {:.1} :batches {} :frames {})",
            s.interval_p50, s.interval_p99, s.batch_hz, s.stale_pct, s.total_batches, s.total_frames,
        )
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_size);
    }
}

#[derive(Debug, Clone)]
pub struct FeedTimingStats {
    pub interval_p50: f64,
    pub interval_p99: f64,
    pub batch_hz: f64,
    pub stale_pct: f64,
    pub total_batches: u64,
    pub total_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = FeedTiming::default().stats();
        assert_eq!(stats.total_batches, 0);
        assert_eq!(stats.batch_hz, 0.0);
        assert_eq!(stats.stale_pct, 0.0);
    }

    #[test]
    fn test_batch_rate() {
        let mut ft = FeedTiming::new(100);
        for i in 0..31 {
            ft.record_batch(i as f64 * 33.0);
        }
        let stats = ft.stats();
        assert_eq!(stats.total_batches, 31);
        assert!((stats.interval_p50 - 33.0).abs() < 1e-9);
        assert!((stats.batch_hz - 30.3).abs() < 0.1);
    }

    #[test]
    fn test_stale_frames() {
        let mut ft = FeedTiming::new(100);
        // 60 fps render on a 30 fps feed: every other frame is stale.
        for i in 0..10 {
            ft.record_frame(i % 2 == 0);
        }
        let stats = ft.stats();
        assert_eq!(ft.stale_frames, 5);
        assert!((stats.stale_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_trim() {
        let mut ft = FeedTiming::new(5);
        for i in 0..20 {
            ft.record_batch(i as f64 * 10.0);
        }
        assert_eq!(ft.batch_intervals.len(), 5);
        assert_eq!(ft.total_batches, 20);
    }

    #[test]
    fn test_stats_sexp() {
        let mut ft = FeedTiming::new(100);
        ft.record_batch(0.0);
        ft.record_batch(20.0);
        ft.record_frame(true);
        let sexp = ft.stats_sexp();
        assert!(sexp.starts_with("(:interval-p50 20.0"));
        assert!(sexp.contains(":batches 2"));
    }

    #[test]
    fn test_reset() {
        let mut ft = FeedTiming::new(8);
        ft.record_batch(0.0);
        ft.record_frame(false);
        ft.reset();
        assert_eq!(ft.total_batches, 0);
        assert_eq!(ft.window_size, 8);
    }
}
