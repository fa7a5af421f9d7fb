//! Recording sinks for captured samples.

mod format;
mod jsonl;

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::capture::CaptureSample;

pub use format::{RecordedSample, RecordingHeader, RecordingReader, FORMAT_NAME, FORMAT_VERSION};
pub use jsonl::{JsonlWriter, JsonlWriterFactory};

#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Recording I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode or decode a record: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Recording is missing its header")]
    MissingHeader,
    #[error("Unsupported recording format {format} v{version}")]
    UnsupportedFormat { format: String, version: u32 },
}

/// Result of a finalized recording.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSummary {
    pub path: PathBuf,
    pub samples_written: u64,
    /// Time between the first and the last written sample.
    pub duration: Duration,
}

/// Persists samples for one streaming period.
pub trait SampleWriter: Send {
    fn write(&mut self, sample: &CaptureSample) -> Result<(), RecordingError>;

    /// Flushes and closes the recording.
    fn finalize(self: Box<Self>) -> Result<RecordingSummary, RecordingError>;
}

/// Opens a fresh writer each time the session starts streaming.
pub trait WriterFactory: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn SampleWriter>, RecordingError>;
}
