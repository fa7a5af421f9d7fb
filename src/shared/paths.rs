use std::path::{Path, PathBuf};

const APP_DIR: &str = "session-recorder";

/// Get the base storage directory.
/// Returns `{data_local_dir}/session-recorder`, or the working directory if
/// the platform reports none.
pub fn get_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Get the logs directory path.
/// Returns `{storage_dir}/logs`.
pub fn get_log_dir() -> PathBuf {
    get_storage_dir().join("logs")
}

/// Get the default settings file path.
/// Returns `{storage_dir}/settings.json`.
pub fn get_settings_path() -> PathBuf {
    get_storage_dir().join("settings.json")
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_dir_structure() {
        let storage = get_storage_dir();
        assert!(storage.ends_with(APP_DIR));

        let logs = get_log_dir();
        assert!(logs.ends_with("logs"));
        assert!(logs.starts_with(&storage));

        assert!(get_settings_path().ends_with("settings.json"));
    }

    #[test]
    fn test_ensure_dir_creates_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();

        assert!(nested.is_dir());
    }
}
