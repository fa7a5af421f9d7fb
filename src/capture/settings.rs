use std::path::PathBuf;

use crate::session::config::{AppConfig, DepthResolution, StreamingSource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InfraredMode {
    BothCameras,
    LeftCameraOnly,
    RightCameraOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensorSettings {
    pub depth_enabled: bool,
    pub visible_enabled: bool,
    /// `None` disables the infrared cameras.
    pub infrared: Option<InfraredMode>,
    pub accelerometer_enabled: bool,
    pub gyroscope_enabled: bool,
    pub depth_resolution: DepthResolution,
}

impl SensorSettings {
    pub fn any_image_enabled(&self) -> bool {
        self.depth_enabled || self.visible_enabled || self.infrared.is_some()
    }

    pub fn any_motion_enabled(&self) -> bool {
        self.accelerometer_enabled || self.gyroscope_enabled
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Replay with the recorded inter-sample timing.
    RealTime,
    /// Replay as fast as the consumer accepts samples, never skipping any.
    NonDropping,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaybackSettings {
    pub path: PathBuf,
    pub auto_replay: bool,
    pub mode: PlaybackMode,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureSource {
    Sensor(SensorSettings),
    RecordedFile(PlaybackSettings),
}

/// Settings handed to a capture adapter when a session attempt starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureSettings {
    pub frame_sync: bool,
    pub source: CaptureSource,
}

impl CaptureSettings {
    pub fn for_config(config: &AppConfig) -> Self {
        let streaming = &config.streaming;
        let source = match streaming.source {
            StreamingSource::Sensor => {
                let sensor = &streaming.sensor;
                let infrared = match (sensor.left_infrared, sensor.right_infrared) {
                    (true, true) => Some(InfraredMode::BothCameras),
                    (true, false) => Some(InfraredMode::LeftCameraOnly),
                    (false, true) => Some(InfraredMode::RightCameraOnly),
                    (false, false) => None,
                };
                CaptureSource::Sensor(SensorSettings {
                    depth_enabled: sensor.depth,
                    visible_enabled: sensor.visible,
                    infrared,
                    accelerometer_enabled: sensor.accelerometer,
                    gyroscope_enabled: sensor.gyroscope,
                    depth_resolution: sensor.depth_resolution,
                })
            }
            StreamingSource::RecordedFile => CaptureSource::RecordedFile(PlaybackSettings {
                path: config.input_path.clone().unwrap_or_default(),
                auto_replay: false,
                mode: if streaming.occ.fast_playback {
                    PlaybackMode::NonDropping
                } else {
                    PlaybackMode::RealTime
                },
            }),
        };

        Self {
            frame_sync: streaming.frame_sync,
            source,
        }
    }

    pub fn is_recorded_file(&self) -> bool {
        matches!(self.source, CaptureSource::RecordedFile(_))
    }
}
