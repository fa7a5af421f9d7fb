use std::collections::VecDeque;
use std::time::Instant;

/// Number of recent arrivals used for the rate estimate.
const DEFAULT_WINDOW: usize = 30;

/// Tracks the arrival cadence of one sample stream.
///
/// The estimate is the mean rate across the most recent `window` arrivals,
/// so it settles on `1 / interval` once the window is filled with evenly
/// spaced ticks.
#[derive(Debug, Clone)]
pub struct RateMonitor {
    ticks: VecDeque<Instant>,
    window: usize,
}

impl Default for RateMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl RateMonitor {
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW)
    }

    pub fn with_window(window: usize) -> Self {
        let window = window.max(2);
        Self {
            ticks: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, at: Instant) {
        self.ticks.push_back(at);
        while self.ticks.len() > self.window {
            self.ticks.pop_front();
        }
    }

    /// Samples per second over the current window; 0.0 until two ticks are seen.
    pub fn rate(&self) -> f64 {
        let (Some(first), Some(last)) = (self.ticks.front(), self.ticks.back()) else {
            return 0.0;
        };
        let span = last.saturating_duration_since(*first).as_secs_f64();
        if self.ticks.len() < 2 || span <= 0.0 {
            return 0.0;
        }
        (self.ticks.len() - 1) as f64 / span
    }

    pub fn reset(&mut self) {
        self.ticks.clear();
    }
}
