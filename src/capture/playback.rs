//! Replays a JSONL recording as a capture source.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use thiserror::Error;

use super::worker::Worker;
use super::{
    CaptureAdapter, CaptureListener, CaptureMessage, CaptureSettings, CaptureSource, PlaybackMode,
    PlaybackSettings, SessionEvent,
};
use crate::recording::{RecordingError, RecordingReader};

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Capture settings do not describe a recorded file")]
    NotARecording,
    #[error("No input recording was configured")]
    MissingPath,
    #[error("Failed to open recording {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: RecordingError,
    },
}

enum Played {
    Finished(u64),
    Stopped,
    Failed(RecordingError),
}

#[derive(Default)]
pub struct PlaybackSource {
    pending: Option<(PlaybackSettings, RecordingReader)>,
    listener: Option<Arc<dyn CaptureListener>>,
    worker: Option<Worker>,
}

impl PlaybackSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(settings: &CaptureSettings) -> Result<(PlaybackSettings, RecordingReader), PlaybackError> {
        let CaptureSource::RecordedFile(playback) = &settings.source else {
            return Err(PlaybackError::NotARecording);
        };
        if playback.path.as_os_str().is_empty() {
            return Err(PlaybackError::MissingPath);
        }

        let reader = RecordingReader::open(&playback.path).map_err(|source| PlaybackError::Open {
            path: playback.path.clone(),
            source,
        })?;
        Ok((playback.clone(), reader))
    }
}

impl CaptureAdapter for PlaybackSource {
    fn start_monitoring(
        &mut self,
        settings: &CaptureSettings,
        listener: Arc<dyn CaptureListener>,
    ) -> bool {
        match Self::open(settings) {
            Ok((playback, reader)) => {
                tracing::info!(target: "session",
                    "[PLAYBACK] Opened {:?} recorded at {} ({:?})",
                    playback.path, reader.header().created_at, playback.mode);
                self.pending = Some((playback, reader));
                self.listener = Some(listener);
                true
            }
            Err(e) => {
                tracing::error!(target: "session", "[PLAYBACK] {}", e);
                false
            }
        }
    }

    fn start_streaming(&mut self) {
        if self.worker.is_some() {
            return;
        }
        let (Some((settings, reader)), Some(listener)) = (self.pending.take(), self.listener.clone())
        else {
            tracing::warn!(target: "session", "[PLAYBACK] Nothing to play back");
            return;
        };

        match Worker::spawn("playback", move |stop| replay(settings, reader, listener.as_ref(), stop)) {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                tracing::error!(target: "session", "[PLAYBACK] Failed to spawn playback thread: {}", e);
                if let Some(listener) = &self.listener {
                    listener.on_message(CaptureMessage::Event(SessionEvent::Error));
                }
            }
        }
    }

    fn stop_streaming(&mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
            tracing::info!(target: "session", "[PLAYBACK] Playback stopped");
        }
    }
}

fn replay(
    settings: PlaybackSettings,
    mut reader: RecordingReader,
    listener: &dyn CaptureListener,
    stop: Receiver<()>,
) {
    loop {
        match play_once(settings.mode, reader, listener, &stop) {
            Played::Stopped => return,
            Played::Failed(e) => {
                tracing::error!(target: "session", "[PLAYBACK] Failed to read recording: {}", e);
                listener.on_message(CaptureMessage::Event(SessionEvent::Error));
                return;
            }
            Played::Finished(count) => {
                tracing::info!(target: "session", "[PLAYBACK] Replayed {} samples", count);
                if settings.auto_replay && count > 0 {
                    match RecordingReader::open(&settings.path) {
                        Ok(next) => {
                            reader = next;
                            continue;
                        }
                        Err(e) => {
                            tracing::error!(target: "session", "[PLAYBACK] Failed to reopen recording: {}", e);
                            listener.on_message(CaptureMessage::Event(SessionEvent::Error));
                            return;
                        }
                    }
                }
                listener.on_message(CaptureMessage::Event(SessionEvent::EndOfFile));
                return;
            }
        }
    }
}

fn play_once(
    mode: PlaybackMode,
    reader: RecordingReader,
    listener: &dyn CaptureListener,
    stop: &Receiver<()>,
) -> Played {
    let started = Instant::now();
    let mut count = 0;

    for record in reader {
        let record = match record {
            Ok(record) => record,
            Err(e) => return Played::Failed(e),
        };

        let keep_going = match mode {
            PlaybackMode::RealTime => {
                let due = started + Duration::from_micros(record.offset_us);
                matches!(stop.recv_deadline(due), Err(RecvTimeoutError::Timeout))
            }
            PlaybackMode::NonDropping => matches!(stop.try_recv(), Err(TryRecvError::Empty)),
        };
        if !keep_going {
            return Played::Stopped;
        }

        listener.on_message(CaptureMessage::Sample(record.sample));
        count += 1;
    }

    Played::Finished(count)
}

impl Drop for PlaybackSource {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}
