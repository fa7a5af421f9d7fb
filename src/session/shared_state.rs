//! Synchronized state shared by the control loop, the capture callbacks and
//! the configuration surface.
//!
//! Every mutation goes through [`SharedSessionState::update`], which wakes all
//! waiters before the lock is released. Waiters always re-check their
//! predicate because the wake-up is a broadcast used for every change.
//!
//! The recording writer sits behind its own lock so slow disk I/O on the
//! sample path never delays lifecycle observers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use super::config::{AppConfig, StreamingConfig};
use super::errors::EndReason;
use super::samples::{SampleAggregator, SampleSet};
use crate::capture::CaptureSample;
use crate::recording::{RecordingError, RecordingSummary, SampleWriter};

/// Point-in-time view of the flags the control loop waits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Observation {
    /// Live configuration is not equivalent to the running one.
    pub config_changed: bool,
    pub streams_enabled: bool,
    pub ready: bool,
    pub end_of_stream: Option<EndReason>,
    pub stream_error: bool,
    pub exit_requested: bool,
    pub exit_on_end: bool,
}

#[derive(Debug)]
pub struct SessionContext {
    /// Latest desired configuration, replaced by the configuration surface.
    pub config: AppConfig,
    pub exit_requested: bool,

    // Lifecycle flags, set by the capture event handler
    pub ready_to_stream: bool,
    pub end_of_stream: Option<EndReason>,
    pub stream_error: bool,

    // Duration accounting, maintained by the sample handler
    accumulated_duration: Duration,
    /// `Some` once the first sample of the attempt has been seen.
    last_sample_time: Option<Instant>,

    aggregator: SampleAggregator,
}

impl SessionContext {
    fn new(config: AppConfig) -> Self {
        Self {
            config,
            exit_requested: false,
            ready_to_stream: false,
            end_of_stream: None,
            stream_error: false,
            accumulated_duration: Duration::ZERO,
            last_sample_time: None,
            aggregator: SampleAggregator::new(),
        }
    }

    /// Clears per-attempt state. Never touches the configuration.
    pub fn reset(&mut self) {
        self.ready_to_stream = false;
        self.end_of_stream = None;
        self.stream_error = false;
        self.accumulated_duration = Duration::ZERO;
        self.last_sample_time = None;
        self.aggregator.reset_rates();
    }

    pub fn have_first_sample(&self) -> bool {
        self.last_sample_time.is_some()
    }

    pub fn accumulated_duration(&self) -> Duration {
        self.accumulated_duration
    }

    /// Records the arrival of a sample and adds the gap since the previous one
    /// to the streaming time.
    ///
    /// The gap only counts when a duration limit is configured. Returns true
    /// if this call flagged the end of the stream.
    pub fn account_sample_time(&mut self, now: Instant) -> bool {
        let previous = self.last_sample_time.replace(now);
        let (Some(limit), Some(last)) = (self.config.stream_duration(), previous) else {
            return false;
        };

        self.accumulated_duration += now.saturating_duration_since(last);
        if self.accumulated_duration.as_millis() >= limit.as_millis()
            && self.end_of_stream.is_none()
        {
            self.end_of_stream = Some(EndReason::DurationElapsed);
            return true;
        }
        false
    }

    /// Folds a sample into the aggregate and returns the updated snapshot.
    pub fn ingest_sample(&mut self, sample: CaptureSample, now: Instant) -> SampleSet {
        self.aggregator.ingest(sample, now);
        self.aggregator.snapshot()
    }

    /// Reads every flag under the current lock, comparing against `running`.
    pub fn observe(&self, running: &StreamingConfig) -> Observation {
        Observation {
            config_changed: !self.config.streaming.equiv(running),
            streams_enabled: self.config.streaming.any_streams_enabled(),
            ready: self.ready_to_stream,
            end_of_stream: self.end_of_stream,
            stream_error: self.stream_error,
            exit_requested: self.exit_requested,
            exit_on_end: self.config.exit_on_end,
        }
    }
}

struct ActiveWriter {
    writer: Box<dyn SampleWriter>,
    failed_writes: u64,
}

/// Owns at most one recording sink.
#[derive(Default)]
pub struct WriterHandle {
    slot: Mutex<Option<ActiveWriter>>,
}

impl WriterHandle {
    fn lock(&self) -> MutexGuard<'_, Option<ActiveWriter>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs `writer`, finalizing any writer left over from a previous attempt.
    pub fn install(&self, writer: Box<dyn SampleWriter>) {
        let previous = self.lock().replace(ActiveWriter {
            writer,
            failed_writes: 0,
        });
        if let Some(previous) = previous {
            tracing::warn!(target: "session", "[WRITER] Replacing a writer that was never finalized");
            if let Err(e) = previous.writer.finalize() {
                tracing::error!(target: "session", "[WRITER] Failed to finalize replaced writer: {}", e);
            }
        }
    }

    /// Writes `sample` if a writer is installed. Failures are logged and counted.
    pub fn write(&self, sample: &CaptureSample) {
        let mut slot = self.lock();
        let Some(active) = slot.as_mut() else {
            return;
        };
        if let Err(e) = active.writer.write(sample) {
            active.failed_writes += 1;
            if active.failed_writes == 1 {
                tracing::warn!(target: "session", "[WRITER] Failed to write sample: {}", e);
            }
        }
    }

    /// Finalizes and releases the installed writer, if any.
    pub fn finalize(&self) -> Option<Result<RecordingSummary, RecordingError>> {
        let active = self.lock().take()?;
        if active.failed_writes > 0 {
            tracing::warn!(target: "session",
                "[WRITER] {} samples could not be written", active.failed_writes);
        }
        Some(active.writer.finalize())
    }
}

/// The single point of synchronized truth for a running control loop.
pub struct SharedSessionState {
    context: Mutex<SessionContext>,
    changed: Condvar,
    writer: WriterHandle,
}

impl SharedSessionState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            context: Mutex::new(SessionContext::new(config)),
            changed: Condvar::new(),
            writer: WriterHandle::default(),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, SessionContext> {
        self.context.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutates the context and wakes every waiter.
    pub fn update<R>(&self, f: impl FnOnce(&mut SessionContext) -> R) -> R {
        let mut context = self.lock();
        let result = f(&mut context);
        self.changed.notify_all();
        result
    }

    /// Blocks until `check` returns `Some`, re-checking after every wake-up.
    pub fn wait_for<T>(&self, mut check: impl FnMut(&SessionContext) -> Option<T>) -> T {
        let mut context = self.lock();
        loop {
            if let Some(value) = check(&context) {
                return value;
            }
            context = self
                .changed
                .wait(context)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn writer(&self) -> &WriterHandle {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn with_duration(ms: i64) -> SessionContext {
        let mut config = AppConfig::default();
        config.streaming.sensor.depth = true;
        config.stream_duration_ms = ms;
        SessionContext::new(config)
    }

    #[test]
    fn test_duration_limit_reached_on_third_sample() {
        let mut context = with_duration(200);
        let t0 = Instant::now();

        assert!(!context.account_sample_time(t0));
        assert!(!context.account_sample_time(t0 + Duration::from_millis(100)));
        assert_eq!(context.end_of_stream, None);

        assert!(context.account_sample_time(t0 + Duration::from_millis(250)));
        assert_eq!(context.end_of_stream, Some(EndReason::DurationElapsed));
        assert_eq!(context.accumulated_duration(), Duration::from_millis(250));
    }

    #[test]
    fn test_negative_duration_never_ends_stream() {
        let mut context = with_duration(-1);
        let t0 = Instant::now();

        for i in 0..10_000u64 {
            assert!(!context.account_sample_time(t0 + Duration::from_secs(i)));
        }
        assert_eq!(context.end_of_stream, None);
        assert!(context.have_first_sample());
        assert_eq!(context.accumulated_duration(), Duration::ZERO);
    }

    #[test]
    fn test_duration_end_is_flagged_once() {
        let mut context = with_duration(0);
        let t0 = Instant::now();

        assert!(!context.account_sample_time(t0));
        assert!(context.account_sample_time(t0));
        assert!(!context.account_sample_time(t0 + Duration::from_millis(1)));
    }

    #[test]
    fn test_existing_end_reason_is_kept() {
        let mut context = with_duration(10);
        context.end_of_stream = Some(EndReason::Disconnected);
        let t0 = Instant::now();

        context.account_sample_time(t0);
        assert!(!context.account_sample_time(t0 + Duration::from_millis(50)));
        assert_eq!(context.end_of_stream, Some(EndReason::Disconnected));
    }

    #[test]
    fn test_reset_keeps_config() {
        let mut context = with_duration(100);
        context.ready_to_stream = true;
        context.stream_error = true;
        context.end_of_stream = Some(EndReason::EndOfFile);
        context.account_sample_time(Instant::now());

        context.reset();

        assert!(!context.ready_to_stream);
        assert!(!context.stream_error);
        assert_eq!(context.end_of_stream, None);
        assert!(!context.have_first_sample());
        assert_eq!(context.accumulated_duration(), Duration::ZERO);
        assert_eq!(context.config.stream_duration_ms, 100);
        assert!(context.config.streaming.sensor.depth);
    }

    #[test]
    fn test_observe_compares_against_running_config() {
        let context = with_duration(-1);
        let running = context.config.streaming.clone();
        assert!(!context.observe(&running).config_changed);

        let mut other = running.clone();
        other.sensor.visible = true;
        assert!(context.observe(&other).config_changed);
    }

    #[test]
    fn test_wait_for_wakes_on_update() {
        let state = Arc::new(SharedSessionState::new(AppConfig::default()));
        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || state.wait_for(|ctx| ctx.ready_to_stream.then_some(42)))
        };

        thread::sleep(Duration::from_millis(20));
        state.update(|ctx| ctx.ready_to_stream = true);

        assert_eq!(waiter.join().unwrap(), 42);
    }
}
