use std::path::PathBuf;

use clap::Parser;

use crate::core::logging::{LoggingConfig, Verbosity};
use crate::core::settings::{load_settings, SettingsError};
use crate::session::config::{AppConfig, StreamingSource};
use crate::shared::paths::get_settings_path;

/// Stream, inspect and record depth sensor sessions
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Cli {
    /// Log per-sample details
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable console logging
    #[arg(short, long)]
    pub quiet: bool,

    /// Run without the interactive console
    #[arg(short = 'H', long)]
    pub headless: bool,

    /// Stream depth at startup
    #[arg(short = 'D', long)]
    pub depth: bool,

    /// Stream the visible camera at startup
    #[arg(short = 'V', long)]
    pub visible: bool,

    /// Stream both infrared cameras at startup
    #[arg(short = 'I', long)]
    pub infrared_both: bool,

    /// Stream the left infrared camera at startup
    #[arg(short = 'L', long)]
    pub infrared_left: bool,

    /// Stream the right infrared camera at startup
    #[arg(short = 'R', long)]
    pub infrared_right: bool,

    /// Stream the accelerometer at startup
    #[arg(short = 'A', long)]
    pub accelerometer: bool,

    /// Stream the gyroscope at startup
    #[arg(short = 'G', long)]
    pub gyroscope: bool,

    /// Stream the recording at startup (if --input-occ given)
    #[arg(short = 'O', long)]
    pub occ: bool,

    /// Remove speckle from depth frames
    #[arg(short = 'd', long)]
    pub depth_correction: bool,

    /// Play back recordings as fast as possible
    #[arg(short = 'f', long)]
    pub fast_playback: bool,

    /// Play back a recording instead of streaming from the sensor
    #[arg(short = 'i', long, value_name = "FILE")]
    pub input_occ: Option<PathBuf>,

    /// Record samples to FILE
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output_occ: Option<PathBuf>,

    /// Stop streaming after this many milliseconds; negative means unbounded
    #[arg(short = 't', long, value_name = "MS", allow_negative_numbers = true)]
    pub time: Option<i64>,

    /// Exit when the stream ends instead of waiting for a configuration change
    #[arg(short = 'x', long)]
    pub exit_on_end: bool,

    /// Deliver image modalities as separate samples
    #[arg(long)]
    pub no_frame_sync: bool,

    /// Settings file to start from
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for rolling log files
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
}

impl Cli {
    /// Loads the settings file, or the default one, and applies the flags on top.
    pub fn load_config(&self) -> Result<AppConfig, SettingsError> {
        let path = self.config.clone().unwrap_or_else(get_settings_path);
        let mut config = load_settings(&path)?;
        self.apply(&mut config);
        Ok(config)
    }

    /// Flags only ever enable behaviour; anything not given keeps its loaded value.
    pub fn apply(&self, config: &mut AppConfig) {
        let streaming = &mut config.streaming;
        let sensor = &mut streaming.sensor;

        sensor.depth |= self.depth;
        sensor.visible |= self.visible;
        sensor.left_infrared |= self.infrared_both || self.infrared_left;
        sensor.right_infrared |= self.infrared_both || self.infrared_right;
        sensor.accelerometer |= self.accelerometer;
        sensor.gyroscope |= self.gyroscope;

        streaming.occ.enabled |= self.occ;
        streaming.occ.fast_playback |= self.fast_playback;
        if self.no_frame_sync {
            streaming.frame_sync = false;
        }

        if let Some(input) = &self.input_occ {
            streaming.source = StreamingSource::RecordedFile;
            config.input_path = Some(input.clone());
        }
        if let Some(output) = &self.output_occ {
            config.output_path = Some(output.clone());
        }
        if let Some(time) = self.time {
            config.stream_duration_ms = time;
        }

        config.depth_correction |= self.depth_correction;
        config.exit_on_end |= self.exit_on_end;
        config.headless |= self.headless;
    }

    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            verbosity: Verbosity::from_flags(self.verbose, self.quiet),
            log_dir: self.log_dir.clone(),
        }
    }
}
