//! Loading and saving `AppConfig` as JSON inside the data directory.

use std::fs;
use std::path::{Path, PathBuf};

use outreach_types::{AppConfig, ConfigError};

const CONFIG_FILE: &str = "outreach_config.json";

pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CONFIG_FILE)
}

/// Load the configuration from `data_dir`, falling back to defaults when the
/// file does not exist. The loaded config is validated.
pub fn load_config(data_dir: &Path) -> Result<AppConfig, ConfigError> {
    let path = config_path(data_dir);

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(AppConfig::new());
    }

    let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let config: AppConfig = serde_json::from_str(&content)
        .map_err(|e| ConfigError::Parse { message: e.to_string() })?;
    config.validate()?;

    Ok(config)
}

/// Save the configuration atomically (temp file + rename).
pub fn save_config(data_dir: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    config.validate()?;

    let path = config_path(data_dir);
    let temp_path = data_dir.join(format!("{}.tmp", CONFIG_FILE));
    let io_err = |e: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| ConfigError::Parse { message: e.to_string() })?;

    fs::write(&temp_path, content).map_err(io_err)?;
    fs::rename(&temp_path, &path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(dir.path()).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_save_then_load_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.rate_limit.hourly_limit = 4;
        save_config(dir.path(), &config).unwrap();

        let reloaded = load_config(dir.path()).unwrap();
        assert_eq!(reloaded.rate_limit.hourly_limit, 4);
        assert!(!dir.path().join("outreach_config.json.tmp").exists());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(config_path(dir.path()), r#"{"queue":{"max_attempts":0,"backoff_base_secs":1,"backoff_max_secs":2}}"#)
            .unwrap();
        assert!(matches!(load_config(dir.path()), Err(ConfigError::InvalidValue { .. })));

        fs::write(config_path(dir.path()), "not json").unwrap();
        assert!(matches!(load_config(dir.path()), Err(ConfigError::Parse { .. })));
    }
}
