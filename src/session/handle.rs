use std::sync::Arc;
use tokio::sync::watch;

use super::config::AppConfig;
use super::samples::SampleSet;
use super::shared_state::SharedSessionState;

/// Display collaborator notified from the capture thread and at shutdown.
pub trait Presenter: Send + Sync {
    /// Called after every accepted sample with the updated aggregate.
    fn update_samples(&self, samples: &SampleSet);

    /// Called once when the control loop terminates.
    fn exit(&self);
}

/// Cloneable entry point for configuration surfaces and signal handlers.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<SharedSessionState>,
    snapshots: watch::Receiver<Arc<SampleSet>>,
}

impl SessionHandle {
    pub(crate) fn new(
        state: Arc<SharedSessionState>,
        snapshots: watch::Receiver<Arc<SampleSet>>,
    ) -> Self {
        Self { state, snapshots }
    }

    /// Replaces the whole configuration and wakes the control loop.
    pub fn update_config(&self, config: AppConfig) {
        self.state.update(|ctx| ctx.config = config);
    }

    /// Edits the configuration in place and returns the result.
    pub fn modify_config(&self, edit: impl FnOnce(&mut AppConfig)) -> AppConfig {
        self.state.update(|ctx| {
            edit(&mut ctx.config);
            ctx.config.clone()
        })
    }

    pub fn config(&self) -> AppConfig {
        self.state.lock().config.clone()
    }

    pub fn request_exit(&self) {
        tracing::info!(target: "session", "[CONTROL] Exit requested");
        self.state.update(|ctx| ctx.exit_requested = true);
    }

    /// Stream of aggregate snapshots, updated after every accepted sample.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SampleSet>> {
        self.snapshots.clone()
    }
}
