//! SessionController - owner of the capture session lifecycle.
//!
//! The controller runs the blocking control loop on a dedicated thread. Each
//! phase performs its side effects (open adapter, start streaming, open and
//! finalize the writer), then blocks on the shared state until
//! [`pending_trigger`] reports a trigger, and asks [`transition`] for the
//! next phase.
//!
//! Architecture:
//! - Capture sources report through a [`SessionDelegate`] on their own thread
//! - Configuration surfaces and signal handlers use a [`SessionHandle`]
//! - Display consumers subscribe to the snapshot feed or install a [`Presenter`]

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use super::config::{AppConfig, StreamingConfig};
use super::delegate::SessionDelegate;
use super::errors::SessionInterrupt;
use super::handle::{Presenter, SessionHandle};
use super::samples::SampleSet;
use super::shared_state::SharedSessionState;
use super::state::{pending_trigger, transition, ExitStatus, SessionPhase, Trigger};
use crate::capture::{CaptureAdapter, CaptureDriver, CaptureListener, CaptureSettings};
use crate::recording::WriterFactory;

/// What the loop observed when a wait completed.
struct Wakeup {
    trigger: Trigger,
    exit_on_end: bool,
    config: AppConfig,
}

pub struct SessionController {
    state: Arc<SharedSessionState>,
    driver: Arc<dyn CaptureDriver>,
    writers: Arc<dyn WriterFactory>,
    presenter: Option<Arc<dyn Presenter>>,
    feed: watch::Sender<Arc<SampleSet>>,
    snapshots: watch::Receiver<Arc<SampleSet>>,
}

impl SessionController {
    pub fn new(
        config: AppConfig,
        driver: Arc<dyn CaptureDriver>,
        writers: Arc<dyn WriterFactory>,
    ) -> Self {
        let (feed, snapshots) = watch::channel(Arc::new(SampleSet::default()));
        Self {
            state: Arc::new(SharedSessionState::new(config)),
            driver,
            writers,
            presenter: None,
            feed,
            snapshots,
        }
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn Presenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.state), self.snapshots.clone())
    }

    /// Runs the control loop until an exit state is reached. Blocks the calling thread.
    pub fn run(self) -> ExitStatus {
        let SessionController {
            state,
            driver,
            writers,
            presenter,
            feed,
            snapshots: _,
        } = self;

        let listener: Arc<dyn CaptureListener> = Arc::new(SessionDelegate::new(
            Arc::clone(&state),
            feed,
            presenter.clone(),
        ));

        let mut attempt_config = state.lock().config.clone();
        let mut running = attempt_config.streaming.clone();
        let mut adapter: Option<Box<dyn CaptureAdapter>> = None;
        let mut attempt_id = String::new();
        let mut phase = SessionPhase::WaitingForEnabledStreams;

        tracing::info!(target: "session", "[CONTROL] Starting control loop");

        loop {
            tracing::debug!(target: "session", "[CONTROL] Phase {:?}", phase);

            phase = match phase {
                SessionPhase::WaitingForEnabledStreams => {
                    state.update(|ctx| ctx.reset());
                    if !state.lock().config.streaming.any_streams_enabled() {
                        tracing::info!(target: "session", "[CONTROL] No streams enabled, waiting for configuration");
                    }

                    let wakeup = await_trigger(&state, phase, &running);
                    if wakeup.trigger == Trigger::StreamsEnabled {
                        running = wakeup.config.streaming.clone();
                        attempt_config = wakeup.config;
                        attempt_id = short_id();
                    }
                    transition(phase, wakeup.trigger, wakeup.exit_on_end)
                }

                SessionPhase::Starting => {
                    let settings = CaptureSettings::for_config(&attempt_config);
                    tracing::info!(target: "session",
                        "[CONTROL] Starting capture session {} ({})",
                        attempt_id,
                        if settings.is_recorded_file() { "recorded file" } else { "sensor" });

                    let mut session = driver.open_session(&settings);
                    let accepted = session.start_monitoring(&settings, Arc::clone(&listener));
                    adapter = Some(session);

                    if !accepted {
                        tracing::warn!(target: "session", "[CONTROL] Capture session {} failed to start", attempt_id);
                        state.update(|ctx| ctx.stream_error = true);
                    }

                    if accepted && settings.is_recorded_file() {
                        // Recordings have no boot phase
                        SessionPhase::Streaming
                    } else {
                        let wakeup = await_trigger(&state, phase, &running);
                        let next = transition(phase, wakeup.trigger, wakeup.exit_on_end);
                        log_outcome(phase, wakeup.trigger, next);
                        next
                    }
                }

                SessionPhase::Streaming => {
                    // Path edits made after the attempt started wait for the next attempt
                    let writer_ready = match attempt_config.output_path.clone() {
                        Some(path) => match writers.open(&path) {
                            Ok(writer) => {
                                state.writer().install(writer);
                                true
                            }
                            Err(e) => {
                                tracing::error!(target: "session", "[WRITER] Failed to open {:?}: {}", path, e);
                                false
                            }
                        },
                        None => true,
                    };

                    if !writer_ready {
                        let trigger = Trigger::Interrupted(SessionInterrupt::SessionSetupFailed);
                        let exit_on_end = state.lock().config.exit_on_end;
                        let next = transition(phase, trigger, exit_on_end);
                        log_outcome(phase, trigger, next);
                        next
                    } else {
                        if let Some(session) = adapter.as_mut() {
                            tracing::info!(target: "session", "[CONTROL] Streaming session {}", attempt_id);
                            session.start_streaming();
                        }

                        let wakeup = await_trigger(&state, phase, &running);

                        if let Some(session) = adapter.as_mut() {
                            session.stop_streaming();
                        }
                        finalize_writer(&state);

                        let next = transition(phase, wakeup.trigger, wakeup.exit_on_end);
                        log_outcome(phase, wakeup.trigger, next);
                        next
                    }
                }

                SessionPhase::Restarting => {
                    tracing::info!(target: "session", "[CONTROL] Restarting capture session");
                    adapter = None;
                    SessionPhase::WaitingForEnabledStreams
                }

                SessionPhase::WaitingForUserAction => {
                    adapter = None;
                    tracing::info!(target: "session", "[CONTROL] Waiting for a configuration change");

                    let wakeup = await_trigger(&state, phase, &running);
                    transition(phase, wakeup.trigger, wakeup.exit_on_end)
                }

                SessionPhase::Exiting { status } => {
                    drop(adapter.take());
                    finalize_writer(&state);
                    if let Some(presenter) = &presenter {
                        presenter.exit();
                    }
                    tracing::info!(target: "session", "[CONTROL] Control loop finished with {:?}", status);
                    return status;
                }
            };
        }
    }
}

fn await_trigger(
    state: &SharedSessionState,
    phase: SessionPhase,
    running: &StreamingConfig,
) -> Wakeup {
    state.wait_for(|ctx| {
        let observed = ctx.observe(running);
        pending_trigger(&phase, &observed).map(|trigger| Wakeup {
            trigger,
            exit_on_end: observed.exit_on_end,
            config: ctx.config.clone(),
        })
    })
}

fn finalize_writer(state: &SharedSessionState) {
    match state.writer().finalize() {
        Some(Ok(summary)) => {
            tracing::info!(target: "session",
                "[WRITER] Recorded {} samples to {:?}", summary.samples_written, summary.path);
        }
        Some(Err(e)) => {
            tracing::error!(target: "session", "[WRITER] Failed to finalize recording: {}", e);
        }
        None => {}
    }
}

fn log_outcome(from: SessionPhase, trigger: Trigger, to: SessionPhase) {
    let Trigger::Interrupted(interrupt) = trigger else {
        return;
    };

    match (interrupt, to) {
        (SessionInterrupt::ConfigurationInterrupted, _) => {
            if from == SessionPhase::Starting {
                tracing::info!(target: "session", "[CONTROL] Config changed during session setup");
            } else {
                tracing::info!(target: "session", "[CONTROL] Config changed while streaming");
            }
        }
        (SessionInterrupt::UserExitRequested, _) => {
            tracing::info!(target: "session", "[CONTROL] Exiting at user request");
        }
        (i, SessionPhase::Exiting { .. }) if i.is_failure() => {
            tracing::error!(target: "session",
                "[CONTROL] Exiting after session error because exit-on-end is set: {}", i);
        }
        (i, SessionPhase::Exiting { .. }) => {
            tracing::info!(target: "session", "[CONTROL] Exiting because exit-on-end is set: {}", i);
        }
        (i, _) if i.is_failure() => {
            tracing::warn!(target: "session", "[CONTROL] {}", i);
        }
        (i, _) => {
            tracing::info!(target: "session", "[CONTROL] {}", i);
        }
    }
}

fn short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
