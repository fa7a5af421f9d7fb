use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecordingError;
use crate::capture::CaptureSample;

pub const FORMAT_NAME: &str = "session-recording";
pub const FORMAT_VERSION: u32 = 1;

/// First line of every recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingHeader {
    pub format: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl RecordingHeader {
    pub fn new() -> Self {
        Self {
            format: FORMAT_NAME.to_string(),
            version: FORMAT_VERSION,
            created_at: Utc::now(),
        }
    }

    fn validate(self) -> Result<Self, RecordingError> {
        if self.format != FORMAT_NAME || self.version != FORMAT_VERSION {
            return Err(RecordingError::UnsupportedFormat {
                format: self.format,
                version: self.version,
            });
        }
        Ok(self)
    }
}

impl Default for RecordingHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// One sample line, timed relative to the first sample of the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedSample {
    pub offset_us: u64,
    pub sample: CaptureSample,
}

/// Sequential reader over a JSONL recording.
pub struct RecordingReader {
    header: RecordingHeader,
    lines: Lines<BufReader<File>>,
}

impl RecordingReader {
    pub fn open(path: &Path) -> Result<Self, RecordingError> {
        let file = File::open(path)?;
        let mut lines = BufReader::new(file).lines();

        let first = lines.next().ok_or(RecordingError::MissingHeader)??;
        let header: RecordingHeader = serde_json::from_str(&first)?;

        Ok(Self {
            header: header.validate()?,
            lines,
        })
    }

    pub fn header(&self) -> &RecordingHeader {
        &self.header
    }
}

impl Iterator for RecordingReader {
    type Item = Result<RecordedSample, RecordingError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(RecordingError::from));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reader_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = RecordingReader::open(file.path());
        assert!(matches!(result, Err(RecordingError::MissingHeader)));
    }

    #[test]
    fn test_reader_rejects_foreign_format() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"format":"other","version":1,"createdAt":"2024-01-01T00:00:00Z"}}"#
        )
        .unwrap();

        let result = RecordingReader::open(file.path());
        assert!(matches!(
            result,
            Err(RecordingError::UnsupportedFormat { version: 1, .. })
        ));
    }

    #[test]
    fn test_reader_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", serde_json::to_string(&RecordingHeader::new()).unwrap()).unwrap();
        writeln!(file).unwrap();
        writeln!(
            file,
            r#"{{"offsetUs":42,"sample":{{"type":"accelerometer","data":{{"timestamp":0.5,"x":0.0,"y":0.0,"z":1.0}}}}}}"#
        )
        .unwrap();

        let records: Vec<_> = RecordingReader::open(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].offset_us, 42);
        assert_eq!(records[0].sample.kind(), "accelerometer");
    }

    #[test]
    fn test_reader_reports_malformed_record() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", serde_json::to_string(&RecordingHeader::new()).unwrap()).unwrap();
        writeln!(file, "not json").unwrap();

        let mut reader = RecordingReader::open(file.path()).unwrap();
        assert!(matches!(reader.next(), Some(Err(RecordingError::Json(_)))));
    }
}
