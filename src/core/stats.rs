//! Frame statistics

use std::collections::VecDeque;

/// Rolling frame-time statistics over the most recent iterations.
#[derive(Debug)]
pub struct FrameStats {
    /// Frame durations in seconds, oldest first
    samples: VecDeque<f64>,
    max_samples: usize,
    total_frames: u64,
    /// Seconds since the last periodic report
    since_report: f64,
}

impl FrameStats {
    const DEFAULT_SAMPLES: usize = 120;
    const REPORT_INTERVAL: f64 = 1.0;

    /// Create a new tracker
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(Self::DEFAULT_SAMPLES),
            max_samples: Self::DEFAULT_SAMPLES,
            total_frames: 0,
            since_report: 0.0,
        }
    }

    /// Record one outer iteration of `frame` seconds.
    ///
    /// Returns `true` once per report interval so the caller can log a
    /// summary without flooding the output.
    pub fn record(&mut self, frame: f64) -> bool {
        self.total_frames += 1;
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(frame);

        self.since_report += frame;
        if self.since_report >= Self::REPORT_INTERVAL {
            self.since_report = 0.0;
            return true;
        }
        false
    }

    /// Average frames per second over the sample window
    pub fn fps(&self) -> f64 {
        let total: f64 = self.samples.iter().sum();
        if total > 0.0 {
            self.samples.len() as f64 / total
        } else {
            0.0
        }
    }

    /// Average frame time in milliseconds
    pub fn avg_frame_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64 * 1000.0
    }

    /// Smallest and largest frame time in milliseconds
    pub fn min_max_frame_ms(&self) -> (f64, f64) {
        let min = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.samples.iter().copied().fold(0.0, f64::max);
        if min.is_finite() {
            (min * 1000.0, max * 1000.0)
        } else {
            (0.0, 0.0)
        }
    }

    /// Total iterations recorded
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// One-line summary for logging
    pub fn summary(&self) -> String {
        let (min, max) = self.min_max_frame_ms();
        format!(
            "FPS: {:.1} | Frame: {:.2}ms (min: {:.2}, max: {:.2})",
            self.fps(),
            self.avg_frame_ms(),
            min,
            max
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats() {
        let stats = FrameStats::new();
        assert_eq!(stats.fps(), 0.0);
        assert_eq!(stats.min_max_frame_ms(), (0.0, 0.0));
    }

    #[test]
    fn test_fps_from_samples() {
        let mut stats = FrameStats::new();
        for _ in 0..10 {
            stats.record(0.02);
        }

        assert!((stats.fps() - 50.0).abs() < 1e-6);
        assert!((stats.avg_frame_ms() - 20.0).abs() < 1e-6);
        assert_eq!(stats.total_frames(), 10);
    }

    #[test]
    fn test_report_once_per_second() {
        let mut stats = FrameStats::new();
        let reports = (0..150).filter(|_| stats.record(0.01)).count();

        assert_eq!(reports, 1);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut stats = FrameStats::new();
        stats.record(1.0);
        for _ in 0..FrameStats::DEFAULT_SAMPLES {
            stats.record(0.01);
        }

        let (_, max) = stats.min_max_frame_ms();
        assert!((max - 10.0).abs() < 1e-9);
    }
}
