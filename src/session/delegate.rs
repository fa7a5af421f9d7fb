use std::sync::Arc;
use std::time::Instant;

use tokio::sync::watch;

use super::correction::apply_depth_correction;
use super::errors::EndReason;
use super::handle::Presenter;
use super::samples::SampleSet;
use super::shared_state::SharedSessionState;
use crate::capture::{CaptureListener, CaptureMessage, CaptureSample, SessionEvent};

/// Translates capture callbacks into shared-state updates.
///
/// Runs on the capture source's thread. The shared lock is held only for
/// flag updates and aggregation; correction, recording and presentation
/// happen outside it.
pub struct SessionDelegate {
    state: Arc<SharedSessionState>,
    feed: watch::Sender<Arc<SampleSet>>,
    presenter: Option<Arc<dyn Presenter>>,
}

impl SessionDelegate {
    pub fn new(
        state: Arc<SharedSessionState>,
        feed: watch::Sender<Arc<SampleSet>>,
        presenter: Option<Arc<dyn Presenter>>,
    ) -> Self {
        Self {
            state,
            feed,
            presenter,
        }
    }

    fn on_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Ready => {
                tracing::info!(target: "session", "[DELEGATE] Capture source ready");
                self.state.update(|ctx| ctx.ready_to_stream = true);
            }
            SessionEvent::Disconnected => {
                tracing::info!(target: "session", "[DELEGATE] Device disconnected");
                self.state
                    .update(|ctx| ctx.end_of_stream = Some(EndReason::Disconnected));
            }
            SessionEvent::EndOfFile => {
                tracing::info!(target: "session", "[DELEGATE] End of recorded file");
                self.state
                    .update(|ctx| ctx.end_of_stream = Some(EndReason::EndOfFile));
            }
            SessionEvent::Error => {
                tracing::warn!(target: "session", "[DELEGATE] Capture source reported an error");
                self.state.update(|ctx| ctx.stream_error = true);
            }
            SessionEvent::Connected | SessionEvent::Booting | SessionEvent::PowerSaving => {
                tracing::debug!(target: "session", "[DELEGATE] Ignoring event {}", event);
            }
        }
    }

    fn on_sample(&self, mut sample: CaptureSample) {
        let received = Instant::now();
        let correct_depth = self.state.lock().config.depth_correction;

        if correct_depth {
            let removed = match &mut sample {
                CaptureSample::Depth(frame) => apply_depth_correction(frame),
                CaptureSample::Synchronized(frames) => {
                    frames.depth.as_mut().map_or(0, apply_depth_correction)
                }
                _ => 0,
            };
            if removed > 0 {
                tracing::trace!(target: "session", "[DELEGATE] Depth correction removed {} pixels", removed);
            }
        }

        self.state.writer().write(&sample);

        let kind = sample.kind();
        tracing::debug!(target: "session", "[DELEGATE] {} sample", kind);
        let snapshot = self.state.update(|ctx| {
            if !ctx.have_first_sample() {
                tracing::info!(target: "session", "[DELEGATE] First sample of the attempt ({})", kind);
            }
            let snapshot = ctx.ingest_sample(sample, received);
            if ctx.account_sample_time(received) {
                tracing::info!(target: "session",
                    "[DELEGATE] Stream duration reached after {:.3}s",
                    ctx.accumulated_duration().as_secs_f64());
            }
            snapshot
        });

        let snapshot = Arc::new(snapshot);
        self.feed.send_replace(Arc::clone(&snapshot));
        if let Some(presenter) = &self.presenter {
            presenter.update_samples(&snapshot);
        }
    }
}

impl CaptureListener for SessionDelegate {
    fn on_message(&self, message: CaptureMessage) {
        match message {
            CaptureMessage::Event(event) => self.on_event(event),
            CaptureMessage::Sample(sample) => self.on_sample(sample),
        }
    }
}
