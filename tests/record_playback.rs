//! Records a synthetic session to disk and plays the recording back.

use std::sync::Arc;
use std::time::Duration;

use session_recorder_lib::capture::synthetic::SyntheticDeviceConfig;
use session_recorder_lib::capture::{Modality, SourceDriver};
use session_recorder_lib::recording::{JsonlWriterFactory, RecordingReader};
use session_recorder_lib::session::{AppConfig, ExitStatus, SessionController, StreamingSource};

fn fast_device() -> SourceDriver {
    SourceDriver::new(SyntheticDeviceConfig {
        boot_delay: Duration::from_millis(20),
        frame_rate: 60,
        imu_rate: 200,
        width: 8,
        height: 6,
        ..Default::default()
    })
}

#[test]
fn test_record_then_play_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.jsonl");

    let mut config = AppConfig::default();
    config.streaming.sensor.depth = true;
    config.streaming.sensor.accelerometer = true;
    config.depth_correction = true;
    config.stream_duration_ms = 200;
    config.exit_on_end = true;
    config.headless = true;
    config.output_path = Some(path.clone());

    let controller = SessionController::new(
        config,
        Arc::new(fast_device()),
        Arc::new(JsonlWriterFactory),
    );
    let recorded = controller.handle().subscribe();
    assert_eq!(controller.run(), ExitStatus::Success);
    assert!(recorded.borrow().has_sample(Modality::Depth));

    let records: Vec<_> = RecordingReader::open(&path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(!records.is_empty());
    let kinds: Vec<_> = records.iter().map(|r| r.sample.kind()).collect();
    assert!(kinds.contains(&"synchronized"));
    assert!(kinds.contains(&"accelerometer"));
    assert!(records.windows(2).all(|w| w[0].offset_us <= w[1].offset_us));

    let mut playback = AppConfig::default();
    playback.streaming.source = StreamingSource::RecordedFile;
    playback.streaming.occ.enabled = true;
    playback.streaming.occ.fast_playback = true;
    playback.exit_on_end = true;
    playback.input_path = Some(path);

    let controller = SessionController::new(
        playback,
        Arc::new(fast_device()),
        Arc::new(JsonlWriterFactory),
    );
    let replayed = controller.handle().subscribe();
    assert_eq!(controller.run(), ExitStatus::Success);

    let snapshot = replayed.borrow().clone();
    assert!(snapshot.has_sample(Modality::Depth));
    assert!(snapshot.has_sample(Modality::Accelerometer));
}

#[test]
fn test_missing_recording_fails_when_exit_on_end() {
    let dir = tempfile::tempdir().unwrap();

    let mut config = AppConfig::default();
    config.streaming.source = StreamingSource::RecordedFile;
    config.streaming.occ.enabled = true;
    config.exit_on_end = true;
    config.input_path = Some(dir.path().join("missing.jsonl"));

    let controller = SessionController::new(
        config,
        Arc::new(fast_device()),
        Arc::new(JsonlWriterFactory),
    );
    assert_eq!(controller.run(), ExitStatus::Failure);
}
