//! Time management utilities

use std::time::{Duration, Instant};

/// Longest step handed to simulation after a stall, in seconds
pub const DEFAULT_MAX_DELTA: f32 = 0.25;

/// Frame timer turning wall-clock ticks into delta-time
///
/// Deltas are clamped to `max_delta` so a hitch (window drag, breakpoint)
/// does not age every particle pool past its lifetime in one update.
pub struct FrameTimer {
    last_frame: Instant,
    delta_time: f32,
    max_delta: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Timer clamping at [`DEFAULT_MAX_DELTA`]
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_DELTA)
    }

    /// Timer clamping each delta to `max_delta` seconds
    pub fn with_max_delta(max_delta: f32) -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            max_delta,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance one frame and return the clamped delta
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let raw = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if raw > self.max_delta {
            log::debug!("Frame delta {:.3}s clamped to {:.3}s", raw, self.max_delta);
        }
        self.delta_time = raw.min(self.max_delta);
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }

    /// Clamped delta of the last tick, in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Simulated time: the sum of clamped deltas
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of ticks so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create and immediately start a stopwatch
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start (or resume) timing
    pub fn start(&mut self) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
    }

    /// Stop timing, accumulating the running interval
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Total elapsed time, including the running interval
    pub fn elapsed(&self) -> Duration {
        match self.start_time {
            Some(start) => self.elapsed + start.elapsed(),
            None => self.elapsed,
        }
    }

    /// Elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }
}
