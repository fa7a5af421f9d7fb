//! Capture sources.
//!
//! A [`CaptureAdapter`] is created for every session attempt. It is configured
//! once with [`CaptureSettings`] and then reports lifecycle events and samples
//! to a [`CaptureListener`] from its own thread until it is stopped or dropped.

pub mod playback;
mod settings;
pub mod synthetic;
mod types;
mod worker;

use std::sync::Arc;

pub use playback::PlaybackError;
pub use settings::{
    CaptureSettings, CaptureSource, InfraredMode, PlaybackMode, PlaybackSettings, SensorSettings,
};
pub use types::{
    CaptureMessage, CaptureSample, DepthFrame, Frame, InfraredFrame, Modality, MotionEvent,
    SessionEvent, SynchronizedFrames, VisibleFrame,
};

use playback::PlaybackSource;
use synthetic::{SyntheticDevice, SyntheticDeviceConfig};

/// Receives everything a capture source produces.
///
/// Called on the source's own thread; implementations must not block for long.
pub trait CaptureListener: Send + Sync {
    fn on_message(&self, message: CaptureMessage);
}

/// One capture session against a device or recorded file.
pub trait CaptureAdapter: Send {
    /// Begins connecting to the source. Returns false if the source could not be opened.
    fn start_monitoring(
        &mut self,
        settings: &CaptureSettings,
        listener: Arc<dyn CaptureListener>,
    ) -> bool;

    /// Begins delivering samples to the listener.
    fn start_streaming(&mut self);

    /// Stops sample delivery. Safe to call when not streaming.
    fn stop_streaming(&mut self);
}

/// Creates a fresh adapter for each session attempt.
pub trait CaptureDriver: Send + Sync {
    fn open_session(&self, settings: &CaptureSettings) -> Box<dyn CaptureAdapter>;
}

/// Routes sensor settings to the synthetic device and recorded files to playback.
#[derive(Debug, Clone, Default)]
pub struct SourceDriver {
    device: SyntheticDeviceConfig,
}

impl SourceDriver {
    pub fn new(device: SyntheticDeviceConfig) -> Self {
        Self { device }
    }
}

impl CaptureDriver for SourceDriver {
    fn open_session(&self, settings: &CaptureSettings) -> Box<dyn CaptureAdapter> {
        match settings.source {
            CaptureSource::Sensor(_) => Box::new(SyntheticDevice::new(self.device.clone())),
            CaptureSource::RecordedFile(_) => Box::new(PlaybackSource::new()),
        }
    }
}
