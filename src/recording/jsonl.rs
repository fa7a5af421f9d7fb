use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use super::format::{RecordedSample, RecordingHeader};
use super::{RecordingError, RecordingSummary, SampleWriter, WriterFactory};
use crate::capture::CaptureSample;

/// RAII guard that flushes a recording left unfinalized.
///
/// On drop, if not marked as completed, buffered records are flushed so the
/// file stays readable up to the last complete line.
struct WriterGuard {
    writer: BufWriter<File>,
    path: PathBuf,
    completed: bool,
}

impl WriterGuard {
    fn new(writer: BufWriter<File>, path: PathBuf) -> Self {
        Self {
            writer,
            path,
            completed: false,
        }
    }

    fn mark_completed(&mut self) {
        self.completed = true;
    }
}

impl Drop for WriterGuard {
    fn drop(&mut self) {
        if self.completed {
            return;
        }

        tracing::warn!(target: "session", "[WRITER] Recording dropped without finalize, flushing {:?}", self.path);
        if let Err(e) = self.writer.flush() {
            tracing::warn!(target: "session", "[WRITER] Failed to flush partial recording: {}", e);
        }
    }
}

/// Writes one JSON document per line: a header, then one record per sample.
pub struct JsonlWriter {
    guard: WriterGuard,
    first_sample: Option<Instant>,
    last_offset: Duration,
    samples_written: u64,
}

impl JsonlWriter {
    pub fn create(path: &Path) -> Result<Self, RecordingError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &RecordingHeader::new())?;
        writer.write_all(b"\n")?;

        tracing::info!(target: "session", "[WRITER] Recording to {:?}", path);

        Ok(Self {
            guard: WriterGuard::new(writer, path.to_path_buf()),
            first_sample: None,
            last_offset: Duration::ZERO,
            samples_written: 0,
        })
    }

    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }
}

impl SampleWriter for JsonlWriter {
    fn write(&mut self, sample: &CaptureSample) -> Result<(), RecordingError> {
        let now = Instant::now();
        let first = *self.first_sample.get_or_insert(now);
        let offset = now.saturating_duration_since(first);

        let record = RecordedSample {
            offset_us: u64::try_from(offset.as_micros()).unwrap_or(u64::MAX),
            sample: sample.clone(),
        };
        serde_json::to_writer(&mut self.guard.writer, &record)?;
        self.guard.writer.write_all(b"\n")?;

        self.last_offset = offset;
        self.samples_written += 1;
        Ok(())
    }

    fn finalize(mut self: Box<Self>) -> Result<RecordingSummary, RecordingError> {
        self.guard.writer.flush()?;
        self.guard.writer.get_ref().sync_all()?;
        self.guard.mark_completed();

        let summary = RecordingSummary {
            path: self.guard.path.clone(),
            samples_written: self.samples_written,
            duration: self.last_offset,
        };
        tracing::info!(target: "session",
            "[WRITER] Finalized {:?}: {} samples over {:.2}s",
            summary.path, summary.samples_written, summary.duration.as_secs_f64());
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlWriterFactory;

impl WriterFactory for JsonlWriterFactory {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleWriter>, RecordingError> {
        Ok(Box::new(JsonlWriter::create(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{Frame, MotionEvent};
    use crate::recording::RecordingReader;

    fn gyro(timestamp: f64) -> CaptureSample {
        CaptureSample::Gyroscope(MotionEvent {
            timestamp,
            x: 0.1,
            y: 0.2,
            z: 0.3,
        })
    }

    #[test]
    fn test_finalize_reports_written_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jsonl");

        let mut writer = JsonlWriterFactory.open(&path).unwrap();
        writer.write(&gyro(0.0)).unwrap();
        writer
            .write(&CaptureSample::Depth(Frame::new(0.1, 1, 1, vec![850.0])))
            .unwrap();
        let summary = writer.finalize().unwrap();

        assert_eq!(summary.path, path);
        assert_eq!(summary.samples_written, 2);

        let reader = RecordingReader::open(&path).unwrap();
        assert_eq!(reader.header().version, crate::recording::FORMAT_VERSION);
        let records: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].offset_us, 0);
        assert_eq!(records[0].sample, gyro(0.0));
        assert!(records[1].offset_us >= records[0].offset_us);
    }

    #[test]
    fn test_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("capture.jsonl");

        let writer = JsonlWriterFactory.open(&path).unwrap();
        writer.finalize().unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_dropped_writer_still_flushes_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.jsonl");

        {
            let mut writer = JsonlWriter::create(&path).unwrap();
            writer.write(&gyro(1.0)).unwrap();
            assert_eq!(writer.samples_written(), 1);
        }

        let records: Vec<_> = RecordingReader::open(&path)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_open_fails_for_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonlWriterFactory.open(dir.path());
        assert!(matches!(result, Err(RecordingError::Io(_))));
    }
}
