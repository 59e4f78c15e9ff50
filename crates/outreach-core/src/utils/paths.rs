use std::fs;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

const DATA_DIR: &str = ".outreach";

/// SQLite file name inside the data directory.
pub const DB_FILE: &str = "outreach.db";

/// Get data directory path.
///
/// Priority:
/// 1. `OUTREACH_DATA_DIR` environment variable (for container deployments)
/// 2. `~/.outreach` (default)
pub fn get_data_dir() -> AppResult<PathBuf> {
    let data_dir = if let Ok(custom_dir) = std::env::var("OUTREACH_DATA_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Unknown("Cannot determine home directory".to_string()))?;
        home.join(DATA_DIR)
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}
