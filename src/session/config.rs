//! User-facing configuration.
//!
//! [`StreamingConfig`] describes what a capture session streams and is the
//! only part of the configuration that can force a running session to be torn
//! down. [`AppConfig`] adds policy that is read live or applied on the next
//! attempt (recording path, duration limit, exit behaviour).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StreamingSource {
    #[default]
    Sensor,
    RecordedFile,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepthResolution {
    #[default]
    Default,
    Vga,
    Full,
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SensorConfig {
    pub depth: bool,
    pub visible: bool,
    pub left_infrared: bool,
    pub right_infrared: bool,
    pub accelerometer: bool,
    pub gyroscope: bool,
    pub depth_resolution: DepthResolution,
}

impl SensorConfig {
    pub fn any_enabled(&self) -> bool {
        self.depth
            || self.visible
            || self.left_infrared
            || self.right_infrared
            || self.accelerometer
            || self.gyroscope
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OccConfig {
    pub enabled: bool,
    pub fast_playback: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingConfig {
    pub source: StreamingSource,
    pub frame_sync: bool,
    pub sensor: SensorConfig,
    pub occ: OccConfig,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            source: StreamingSource::Sensor,
            frame_sync: true,
            sensor: SensorConfig::default(),
            occ: OccConfig::default(),
        }
    }
}

impl StreamingConfig {
    /// Returns true if the active source has at least one stream to produce.
    pub fn any_streams_enabled(&self) -> bool {
        match self.source {
            StreamingSource::Sensor => self.sensor.any_enabled(),
            StreamingSource::RecordedFile => self.occ.enabled,
        }
    }

    /// Returns true if a session started with `other` can keep running under `self`.
    ///
    /// Only the settings of the active source are compared, so toggling a
    /// sensor modality while playing back a recording is not a material change.
    pub fn equiv(&self, other: &StreamingConfig) -> bool {
        if self.source != other.source || self.frame_sync != other.frame_sync {
            return false;
        }
        match self.source {
            StreamingSource::Sensor => self.sensor == other.sensor,
            StreamingSource::RecordedFile => self.occ == other.occ,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub streaming: StreamingConfig,
    pub depth_correction: bool,
    /// Streaming time limit in milliseconds; negative means unbounded.
    pub stream_duration_ms: i64,
    pub exit_on_end: bool,
    pub output_path: Option<PathBuf>,
    pub input_path: Option<PathBuf>,
    pub headless: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            streaming: StreamingConfig::default(),
            depth_correction: false,
            stream_duration_ms: -1,
            exit_on_end: false,
            output_path: None,
            input_path: None,
            headless: false,
        }
    }
}

impl AppConfig {
    /// The streaming time limit, if one is configured.
    pub fn stream_duration(&self) -> Option<Duration> {
        u64::try_from(self.stream_duration_ms)
            .ok()
            .map(Duration::from_millis)
    }
}
