use std::path::Path;

use thiserror::Error;

use crate::session::config::AppConfig;
use crate::shared::paths::ensure_dir;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Loads the configuration stored at `path`, or defaults if the file does not exist.
pub fn load_settings(path: &Path) -> Result<AppConfig, SettingsError> {
    if !path.exists() {
        tracing::debug!(target: "session", "No settings at {:?}, using defaults", path);
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let config = serde_json::from_str(&contents)?;
    Ok(config)
}

pub fn save_settings(path: &Path, config: &AppConfig) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    let contents = serde_json::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_settings(&dir.path().join("settings.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut config = AppConfig::default();
        config.streaming.sensor.visible = true;
        config.output_path = Some(PathBuf::from("/tmp/out.jsonl"));
        config.stream_duration_ms = 1500;

        save_settings(&path, &config).unwrap();
        assert_eq!(load_settings(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_settings(&path), Err(SettingsError::Json(_))));
    }
}
