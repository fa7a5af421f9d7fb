//! Simulated depth sensor.
//!
//! Boots after a configurable delay, then produces samples for the enabled
//! modalities at fixed rates until stopped, optionally simulating a
//! disconnect. Useful for running the recorder without hardware.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, tick, Receiver};
use rand::Rng;

use super::worker::Worker;
use super::{
    CaptureAdapter, CaptureListener, CaptureMessage, CaptureSample, CaptureSettings,
    CaptureSource, DepthFrame, Frame, InfraredFrame, InfraredMode, MotionEvent, SensorSettings,
    SessionEvent, SynchronizedFrames, VisibleFrame,
};
use crate::session::config::DepthResolution;

#[derive(Debug, Clone)]
pub struct SyntheticDeviceConfig {
    pub boot_delay: Duration,
    /// Report `Error` instead of `Ready` after booting.
    pub fail_setup: bool,
    /// Report `Disconnected` after streaming for this long.
    pub disconnect_after: Option<Duration>,
    pub frame_rate: u32,
    pub imu_rate: u32,
    pub width: u32,
    pub height: u32,
}

impl Default for SyntheticDeviceConfig {
    fn default() -> Self {
        Self {
            boot_delay: Duration::from_millis(500),
            fail_setup: false,
            disconnect_after: None,
            frame_rate: 30,
            imu_rate: 200,
            width: 64,
            height: 48,
        }
    }
}

fn period(rate: u32) -> Duration {
    Duration::from_secs_f64(1.0 / f64::from(rate.max(1)))
}

pub struct SyntheticDevice {
    config: SyntheticDeviceConfig,
    sensor: Option<SensorSettings>,
    frame_sync: bool,
    listener: Option<Arc<dyn CaptureListener>>,
    boot: Option<Worker>,
    stream: Option<Worker>,
}

impl SyntheticDevice {
    pub fn new(config: SyntheticDeviceConfig) -> Self {
        Self {
            config,
            sensor: None,
            frame_sync: true,
            listener: None,
            boot: None,
            stream: None,
        }
    }
}

impl CaptureAdapter for SyntheticDevice {
    fn start_monitoring(
        &mut self,
        settings: &CaptureSettings,
        listener: Arc<dyn CaptureListener>,
    ) -> bool {
        let CaptureSource::Sensor(sensor) = &settings.source else {
            tracing::warn!(target: "session", "[DEVICE] Synthetic device cannot play back recordings");
            return false;
        };

        let boot_delay = self.config.boot_delay;
        let fail_setup = self.config.fail_setup;
        let boot_listener = Arc::clone(&listener);
        let worker = Worker::spawn("device-boot", move |stop| {
            let booted = after(boot_delay);
            boot_listener.on_message(CaptureMessage::Event(SessionEvent::Connected));
            boot_listener.on_message(CaptureMessage::Event(SessionEvent::Booting));
            select! {
                recv(stop) -> _ => {}
                recv(booted) -> _ => {
                    let event = if fail_setup { SessionEvent::Error } else { SessionEvent::Ready };
                    boot_listener.on_message(CaptureMessage::Event(event));
                }
            }
        });

        match worker {
            Ok(worker) => {
                tracing::info!(target: "session", "[DEVICE] Booting synthetic device ({:?} delay)", boot_delay);
                self.boot = Some(worker);
                self.sensor = Some(sensor.clone());
                self.frame_sync = settings.frame_sync;
                self.listener = Some(listener);
                true
            }
            Err(e) => {
                tracing::error!(target: "session", "[DEVICE] Failed to spawn boot thread: {}", e);
                false
            }
        }
    }

    fn start_streaming(&mut self) {
        if self.stream.is_some() {
            return;
        }
        let (Some(sensor), Some(listener)) = (self.sensor.clone(), self.listener.clone()) else {
            tracing::warn!(target: "session", "[DEVICE] start_streaming called before start_monitoring");
            return;
        };

        let generator = SampleGenerator::new(&self.config, sensor, self.frame_sync);
        let config = self.config.clone();
        match Worker::spawn("device-stream", move |stop| {
            stream_loop(&config, generator, listener.as_ref(), stop)
        }) {
            Ok(worker) => self.stream = Some(worker),
            Err(e) => {
                tracing::error!(target: "session", "[DEVICE] Failed to spawn stream thread: {}", e);
                if let Some(listener) = &self.listener {
                    listener.on_message(CaptureMessage::Event(SessionEvent::Error));
                }
            }
        }
    }

    fn stop_streaming(&mut self) {
        if let Some(mut worker) = self.stream.take() {
            worker.stop();
            tracing::info!(target: "session", "[DEVICE] Streaming stopped");
        }
    }
}

impl Drop for SyntheticDevice {
    fn drop(&mut self) {
        self.stop_streaming();
        if let Some(mut boot) = self.boot.take() {
            if !boot.is_finished() {
                tracing::debug!(target: "session", "[DEVICE] Cancelling boot");
            }
            boot.stop();
        }
    }
}

fn stream_loop(
    config: &SyntheticDeviceConfig,
    mut generator: SampleGenerator,
    listener: &dyn CaptureListener,
    stop: Receiver<()>,
) {
    let frames = if generator.sensor.any_image_enabled() {
        tick(period(config.frame_rate))
    } else {
        never()
    };
    let motion = if generator.sensor.any_motion_enabled() {
        tick(period(config.imu_rate))
    } else {
        never()
    };
    let disconnect = config.disconnect_after.map(after).unwrap_or_else(never);

    loop {
        select! {
            recv(stop) -> _ => break,
            recv(frames) -> _ => {
                for sample in generator.images() {
                    listener.on_message(CaptureMessage::Sample(sample));
                }
            }
            recv(motion) -> _ => {
                for sample in generator.motion() {
                    listener.on_message(CaptureMessage::Sample(sample));
                }
            }
            recv(disconnect) -> _ => {
                tracing::info!(target: "session", "[DEVICE] Simulating disconnect");
                listener.on_message(CaptureMessage::Event(SessionEvent::Disconnected));
                break;
            }
        }
    }
}

/// Produces plausible-looking samples for the enabled modalities.
struct SampleGenerator {
    sensor: SensorSettings,
    frame_sync: bool,
    width: u32,
    height: u32,
    started: Instant,
    frame_index: u64,
}

impl SampleGenerator {
    fn new(config: &SyntheticDeviceConfig, sensor: SensorSettings, frame_sync: bool) -> Self {
        // Default uses the configured size; Vga and Full scale it up
        let scale = match sensor.depth_resolution {
            DepthResolution::Default => 1,
            DepthResolution::Vga => 2,
            DepthResolution::Full => 4,
        };
        Self {
            sensor,
            frame_sync,
            width: config.width.max(1) * scale,
            height: config.height.max(1) * scale,
            started: Instant::now(),
            frame_index: 0,
        }
    }

    fn timestamp(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    fn images(&mut self) -> Vec<CaptureSample> {
        let timestamp = self.timestamp();
        self.frame_index += 1;

        let depth = self.sensor.depth_enabled.then(|| self.depth(timestamp));
        let visible = self.sensor.visible_enabled.then(|| self.visible(timestamp));
        let infrared = self.sensor.infrared.map(|mode| self.infrared(timestamp, mode));

        if self.frame_sync {
            return vec![CaptureSample::Synchronized(SynchronizedFrames {
                depth,
                visible,
                infrared,
            })];
        }

        let mut samples = Vec::with_capacity(3);
        samples.extend(depth.map(CaptureSample::Depth));
        samples.extend(visible.map(CaptureSample::Visible));
        samples.extend(infrared.map(CaptureSample::Infrared));
        samples
    }

    fn depth(&self, timestamp: f64) -> DepthFrame {
        let mut rng = rand::thread_rng();
        let base = 1500.0 + 250.0 * (timestamp * 0.5).sin() as f32;
        let pixels = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| (x, y)))
            .map(|(x, y)| {
                // Sparse dropouts and speckle
                if rng.gen_ratio(1, 200) {
                    return 0.0;
                }
                if rng.gen_ratio(1, 500) {
                    return base * rng.gen_range(0.3..3.0);
                }
                base + (x + y) as f32 * 2.0 + rng.gen_range(-4.0..4.0)
            })
            .collect();
        Frame::new(timestamp, self.width, self.height, pixels)
    }

    fn visible(&self, timestamp: f64) -> VisibleFrame {
        let shift = self.frame_index as u32;
        let pixels = (0..self.height)
            .flat_map(|y| (0..self.width).map(move |x| ((x + y + shift) % 256) as u8))
            .collect();
        Frame::new(timestamp, self.width, self.height, pixels)
    }

    fn infrared(&self, timestamp: f64, mode: InfraredMode) -> InfraredFrame {
        let width = match mode {
            InfraredMode::BothCameras => self.width * 2,
            InfraredMode::LeftCameraOnly | InfraredMode::RightCameraOnly => self.width,
        };
        let mut rng = rand::thread_rng();
        let pixels = (0..width * self.height)
            .map(|_| rng.gen_range(200u16..1200))
            .collect();
        Frame::new(timestamp, width, self.height, pixels)
    }

    fn motion(&mut self) -> Vec<CaptureSample> {
        let timestamp = self.timestamp();
        let mut rng = rand::thread_rng();
        let mut jitter = || rng.gen_range(-0.01f64..0.01);
        let mut samples = Vec::with_capacity(2);

        if self.sensor.accelerometer_enabled {
            samples.push(CaptureSample::Accelerometer(MotionEvent {
                timestamp,
                x: jitter(),
                y: jitter(),
                z: 1.0 + jitter(),
            }));
        }
        if self.sensor.gyroscope_enabled {
            samples.push(CaptureSample::Gyroscope(MotionEvent {
                timestamp,
                x: jitter(),
                y: jitter(),
                z: jitter(),
            }));
        }
        samples
    }
}
