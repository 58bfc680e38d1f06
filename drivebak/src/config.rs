use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config_bail, config_error, io_error,
    path::{FsPath, FsPathBuf},
    Result,
};

/// What to back up, where to, and how often.
///
/// Built once by the frontend, then passed by value into the scheduler;
/// it never changes for the life of one backup run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local directories to mirror, in backup order.
    pub directories: Vec<FsPathBuf>,
    /// Identifier of the destination Google Drive folder.
    pub folder_id: String,
    /// Minutes to sleep between two sync passes.
    pub interval_minutes: u32,
}

impl Config {
    pub async fn load_from_file(path: &FsPath) -> Result<Self> {
        let json = tokio::fs::read(path)
            .await
            .map_err(|err| io_error!("failed to read config from {path}: {err}"))?;
        serde_json::from_slice(&json).map_err(|err| config_error!("invalid config file {path}: {err}"))
    }

    pub async fn save_to_file(&self, path: &FsPath) -> Result<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| config_error!("could not serialize config: {err}"))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|err| io_error!("failed to write config to {path}: {err}"))?;
        Ok(())
    }

    /// Checks the inputs the frontend is required to reject.
    pub fn validate(&self) -> Result<()> {
        if self.directories.is_empty() {
            config_bail!("at least one directory to back up is required");
        }
        if self.folder_id.trim().is_empty() {
            config_bail!("the destination Drive folder id must not be blank");
        }
        if self.interval_minutes == 0 {
            config_bail!("the backup interval must be at least one minute");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.interval_minutes) * 60)
    }
}
