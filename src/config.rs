use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOG_LEVEL: &str = "info";
const DB_FILE: &str = "tasks.db";
const LOG_DIR: &str = "logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn resolve(db: Option<PathBuf>, log_level: Option<String>) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "taskdeck").context("locating data directory")?;
        Ok(Self::with_data_dir(dirs.data_dir(), db, log_level))
    }

    pub fn with_data_dir(data_dir: &Path, db: Option<PathBuf>, log_level: Option<String>) -> Self {
        Settings {
            db_path: db.unwrap_or_else(|| data_dir.join(DB_FILE)),
            log_dir: data_dir.join(LOG_DIR),
            log_level: log_level
                .filter(|level| !level.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}
