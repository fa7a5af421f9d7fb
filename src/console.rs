//! Line-oriented configuration surface on stdin.
//!
//! Each command edits the live configuration through the [`SessionHandle`]
//! in one step; the control loop decides whether the edit is material.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use crate::capture::Modality;
use crate::core::settings::save_settings;
use crate::session::config::{AppConfig, StreamingSource};
use crate::session::{Presenter, SampleSet, SessionHandle};

const HELP: &str = "\
Commands:
  enable|disable <stream>   depth, visible, infrared, left-infrared,
                            right-infrared, accelerometer, gyroscope, occ
  output <file>|none        record to <file> when streaming next starts
  input <file>              play back <file> instead of the sensor
  time <ms>                 stream duration limit, negative for unbounded
  correction on|off         depth speckle correction
  sync on|off               frame synchronization
  fast on|off               fast playback of recordings
  status                    show the current configuration
  save [file]               store the configuration as the startup settings
  exit                      stop and quit";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command '{0}', type 'help' for a list")]
    UnknownCommand(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("Unknown stream '{0}'")]
    UnknownStream(String),
    #[error("Expected on or off, got '{0}'")]
    InvalidSwitch(String),
    #[error("Expected milliseconds, got '{0}'")]
    InvalidDuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Depth,
    Visible,
    Infrared,
    LeftInfrared,
    RightInfrared,
    Accelerometer,
    Gyroscope,
    Occ,
}

impl FromStr for Stream {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "depth" => Ok(Stream::Depth),
            "visible" => Ok(Stream::Visible),
            "infrared" | "ir" => Ok(Stream::Infrared),
            "left-infrared" => Ok(Stream::LeftInfrared),
            "right-infrared" => Ok(Stream::RightInfrared),
            "accelerometer" | "accel" => Ok(Stream::Accelerometer),
            "gyroscope" | "gyro" => Ok(Stream::Gyroscope),
            "occ" | "playback" => Ok(Stream::Occ),
            _ => Err(ConsoleError::UnknownStream(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Enable(Stream),
    Disable(Stream),
    Output(Option<PathBuf>),
    Input(PathBuf),
    Time(i64),
    Correction(bool),
    Sync(bool),
    FastPlayback(bool),
    Status,
    Save(Option<PathBuf>),
    Help,
    Exit,
}

fn switch(value: Option<&str>, command: &'static str) -> Result<bool, ConsoleError> {
    match value.ok_or(ConsoleError::MissingArgument(command))? {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(ConsoleError::InvalidSwitch(other.to_string())),
    }
}

impl ConsoleCommand {
    /// Parses one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ConsoleError> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();

        let parsed = match command {
            "enable" => ConsoleCommand::Enable(
                argument.ok_or(ConsoleError::MissingArgument("enable"))?.parse()?,
            ),
            "disable" => ConsoleCommand::Disable(
                argument.ok_or(ConsoleError::MissingArgument("disable"))?.parse()?,
            ),
            "output" => match argument.ok_or(ConsoleError::MissingArgument("output"))? {
                "none" => ConsoleCommand::Output(None),
                path => ConsoleCommand::Output(Some(PathBuf::from(path))),
            },
            "input" => ConsoleCommand::Input(PathBuf::from(
                argument.ok_or(ConsoleError::MissingArgument("input"))?,
            )),
            "time" => {
                let value = argument.ok_or(ConsoleError::MissingArgument("time"))?;
                ConsoleCommand::Time(
                    value
                        .parse()
                        .map_err(|_| ConsoleError::InvalidDuration(value.to_string()))?,
                )
            }
            "correction" => ConsoleCommand::Correction(switch(argument, "correction")?),
            "sync" => ConsoleCommand::Sync(switch(argument, "sync")?),
            "fast" => ConsoleCommand::FastPlayback(switch(argument, "fast")?),
            "status" => ConsoleCommand::Status,
            "save" => ConsoleCommand::Save(argument.map(PathBuf::from)),
            "help" | "?" => ConsoleCommand::Help,
            "exit" | "quit" => ConsoleCommand::Exit,
            other => return Err(ConsoleError::UnknownCommand(other.to_string())),
        };
        Ok(Some(parsed))
    }

    /// Applies a configuration edit. Returns false for commands that edit nothing.
    pub fn apply(&self, config: &mut AppConfig) -> bool {
        let sensor = &mut config.streaming.sensor;
        match self {
            ConsoleCommand::Enable(stream) | ConsoleCommand::Disable(stream) => {
                let on = matches!(self, ConsoleCommand::Enable(_));
                match stream {
                    Stream::Depth => sensor.depth = on,
                    Stream::Visible => sensor.visible = on,
                    Stream::Infrared => {
                        sensor.left_infrared = on;
                        sensor.right_infrared = on;
                    }
                    Stream::LeftInfrared => sensor.left_infrared = on,
                    Stream::RightInfrared => sensor.right_infrared = on,
                    Stream::Accelerometer => sensor.accelerometer = on,
                    Stream::Gyroscope => sensor.gyroscope = on,
                    Stream::Occ => config.streaming.occ.enabled = on,
                }
            }
            ConsoleCommand::Output(path) => config.output_path = path.clone(),
            ConsoleCommand::Input(path) => {
                config.streaming.source = StreamingSource::RecordedFile;
                config.input_path = Some(path.clone());
            }
            ConsoleCommand::Time(ms) => config.stream_duration_ms = *ms,
            ConsoleCommand::Correction(on) => config.depth_correction = *on,
            ConsoleCommand::Sync(on) => config.streaming.frame_sync = *on,
            ConsoleCommand::FastPlayback(on) => config.streaming.occ.fast_playback = *on,
            ConsoleCommand::Status
            | ConsoleCommand::Save(_)
            | ConsoleCommand::Help
            | ConsoleCommand::Exit => return false,
        }
        true
    }
}

/// Reads commands from stdin until `exit` or end of input.
///
/// `save` without a file writes to `settings_path`.
pub async fn run_console(handle: SessionHandle, settings_path: PathBuf) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for a list of commands.");

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::debug!(target: "session", "[CONSOLE] Input closed");
                return;
            }
            Err(e) => {
                tracing::warn!(target: "session", "[CONSOLE] Failed to read input: {}", e);
                return;
            }
        };

        match ConsoleCommand::parse(&line) {
            Ok(Some(command)) => {
                if !execute(&handle, command, &settings_path) {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => println!("{}", e),
        }
    }
}

/// Runs one command against the session. Returns false once the console should stop.
fn execute(handle: &SessionHandle, command: ConsoleCommand, settings_path: &Path) -> bool {
    match command {
        ConsoleCommand::Exit => {
            handle.request_exit();
            return false;
        }
        ConsoleCommand::Help => println!("{}", HELP),
        ConsoleCommand::Status => match serde_json::to_string_pretty(&handle.config()) {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::warn!(target: "session", "[CONSOLE] Failed to render config: {}", e),
        },
        ConsoleCommand::Save(path) => {
            let path = path.as_deref().unwrap_or(settings_path);
            match save_settings(path, &handle.config()) {
                Ok(()) => tracing::info!(target: "session", "[CONSOLE] Saved settings to {:?}", path),
                Err(e) => {
                    tracing::warn!(target: "session", "[CONSOLE] Failed to save settings to {:?}: {}", path, e);
                    println!("Could not save settings: {}", e);
                }
            }
        }
        edit => {
            tracing::info!(target: "session", "[CONSOLE] Applying {:?}", edit);
            handle.modify_config(|config| {
                edit.apply(config);
            });
        }
    }
    true
}

/// Counts delivered samples and signals when the control loop is done.
pub struct ConsolePresenter {
    samples_seen: AtomicU64,
    finished: watch::Sender<bool>,
}

impl ConsolePresenter {
    /// Returns the presenter and a receiver that turns true on exit.
    pub fn create() -> (Arc<Self>, watch::Receiver<bool>) {
        let (finished, done) = watch::channel(false);
        (
            Arc::new(Self {
                samples_seen: AtomicU64::new(0),
                finished,
            }),
            done,
        )
    }

    pub fn samples_seen(&self) -> u64 {
        self.samples_seen.load(Ordering::Relaxed)
    }
}

impl Presenter for ConsolePresenter {
    fn update_samples(&self, _samples: &SampleSet) {
        self.samples_seen.fetch_add(1, Ordering::Relaxed);
    }

    fn exit(&self) {
        self.finished.send_replace(true);
    }
}

fn rate_summary(samples: &SampleSet) -> Option<String> {
    let parts: Vec<String> = Modality::ALL
        .iter()
        .filter(|m| samples.has_sample(**m))
        .map(|m| format!("{} {:.1}Hz", m, samples.rate(*m)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Logs a rate summary once per second until the presenter is told to exit.
pub async fn report_rates(
    presenter: Arc<ConsolePresenter>,
    mut snapshots: watch::Receiver<Arc<SampleSet>>,
    mut done: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let mut last_seen = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let seen = presenter.samples_seen();
                if seen == last_seen {
                    continue;
                }
                last_seen = seen;
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(summary) = rate_summary(&snapshot) {
                    tracing::info!(target: "session", "[CONSOLE] {} ({} samples)", summary, seen);
                }
            }
            changed = done.changed() => {
                if changed.is_err() || *done.borrow() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSample, MotionEvent, SourceDriver};
    use crate::core::settings::load_settings;
    use crate::recording::JsonlWriterFactory;
    use crate::session::{SampleAggregator, SessionController};
    use std::thread;
    use std::time::Instant;

    fn session_handle() -> SessionHandle {
        SessionController::new(
            AppConfig::default(),
            Arc::new(SourceDriver::default()),
            Arc::new(JsonlWriterFactory),
        )
        .handle()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("enable gyro").unwrap(),
            Some(ConsoleCommand::Enable(Stream::Gyroscope))
        );
        assert_eq!(
            ConsoleCommand::parse("  output none ").unwrap(),
            Some(ConsoleCommand::Output(None))
        );
        assert_eq!(
            ConsoleCommand::parse("time -1").unwrap(),
            Some(ConsoleCommand::Time(-1))
        );
        assert_eq!(ConsoleCommand::parse("   ").unwrap(), None);
        assert_eq!(ConsoleCommand::parse("quit").unwrap(), Some(ConsoleCommand::Exit));
        assert_eq!(ConsoleCommand::parse("save").unwrap(), Some(ConsoleCommand::Save(None)));
        assert_eq!(
            ConsoleCommand::parse("save mine.json").unwrap(),
            Some(ConsoleCommand::Save(Some(PathBuf::from("mine.json"))))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            ConsoleCommand::parse("enable"),
            Err(ConsoleError::MissingArgument("enable"))
        );
        assert_eq!(
            ConsoleCommand::parse("enable lidar"),
            Err(ConsoleError::UnknownStream("lidar".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("sync maybe"),
            Err(ConsoleError::InvalidSwitch("maybe".to_string()))
        );
        assert_eq!(
            ConsoleCommand::parse("time soon"),
            Err(ConsoleError::InvalidDuration("soon".to_string()))
        );
        assert!(matches!(
            ConsoleCommand::parse("dance"),
            Err(ConsoleError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_apply_edits_config() {
        let mut config = AppConfig::default();

        assert!(ConsoleCommand::Enable(Stream::Infrared).apply(&mut config));
        assert!(config.streaming.sensor.left_infrared && config.streaming.sensor.right_infrared);

        assert!(ConsoleCommand::Disable(Stream::LeftInfrared).apply(&mut config));
        assert!(!config.streaming.sensor.left_infrared);

        assert!(ConsoleCommand::Input(PathBuf::from("a.jsonl")).apply(&mut config));
        assert_eq!(config.streaming.source, StreamingSource::RecordedFile);

        assert!(ConsoleCommand::Sync(false).apply(&mut config));
        assert!(!config.streaming.frame_sync);

        let before = config.clone();
        assert!(!ConsoleCommand::Status.apply(&mut config));
        assert_eq!(config, before);
    }

    #[test]
    fn test_concurrent_edits_are_not_lost() {
        let handle = session_handle();

        let toggler = {
            let handle = handle.clone();
            thread::spawn(move || {
                for i in 0..200 {
                    execute(&handle, ConsoleCommand::Correction(i % 2 == 1), Path::new("unused"));
                }
            })
        };
        let timer = {
            let handle = handle.clone();
            thread::spawn(move || {
                for ms in 0..200 {
                    execute(&handle, ConsoleCommand::Time(ms), Path::new("unused"));
                }
            })
        };
        toggler.join().unwrap();
        timer.join().unwrap();

        let config = handle.config();
        assert!(config.depth_correction);
        assert_eq!(config.stream_duration_ms, 199);
    }

    #[test]
    fn test_save_writes_live_config() {
        let dir = tempfile::tempdir().unwrap();
        let default_path = dir.path().join("settings.json");
        let handle = session_handle();

        assert!(execute(&handle, ConsoleCommand::Enable(Stream::Depth), &default_path));
        assert!(execute(&handle, ConsoleCommand::Save(None), &default_path));
        assert_eq!(load_settings(&default_path).unwrap(), handle.config());

        let other = dir.path().join("other").join("session.json");
        assert!(execute(&handle, ConsoleCommand::Time(750), &default_path));
        assert!(execute(&handle, ConsoleCommand::Save(Some(other.clone())), &default_path));
        assert_eq!(load_settings(&other).unwrap().stream_duration_ms, 750);
        assert_eq!(load_settings(&default_path).unwrap().stream_duration_ms, -1);
    }

    #[test]
    fn test_exit_stops_console() {
        let handle = session_handle();
        assert!(!execute(&handle, ConsoleCommand::Exit, Path::new("unused")));
    }

    #[test]
    fn test_rate_summary_lists_active_modalities() {
        let mut aggregator = SampleAggregator::new();
        assert_eq!(rate_summary(&aggregator.snapshot()), None);

        let event = MotionEvent {
            timestamp: 0.0,
            x: 0.0,
            y: 0.0,
            z: 1.0,
        };
        aggregator.ingest(CaptureSample::Gyroscope(event), Instant::now());

        let summary = rate_summary(&aggregator.snapshot()).unwrap();
        assert!(summary.starts_with("gyroscope"));
        assert!(!summary.contains("depth"));
    }

    #[test]
    fn test_presenter_signals_exit() {
        let (presenter, done) = ConsolePresenter::create();
        presenter.update_samples(&SampleSet::default());
        assert_eq!(presenter.samples_seen(), 1);

        presenter.exit();
        assert!(*done.borrow());
    }
}
