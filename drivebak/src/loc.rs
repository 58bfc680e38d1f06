//! Locations module

use crate::{other_error, path::FsPathBuf, Result};

pub fn config_dir() -> Result<FsPathBuf> {
    let dir = dirs::config_dir().ok_or_else(|| other_error!("can't get the user config directory"))?;
    let dir = FsPathBuf::try_from(dir)?;
    Ok(dir.join("drivebak"))
}

pub fn cache_dir() -> Result<FsPathBuf> {
    let dir = dirs::cache_dir().ok_or_else(|| other_error!("can't get the user cache directory"))?;
    let dir = FsPathBuf::try_from(dir)?;
    Ok(dir.join("drivebak"))
}

pub fn config_file() -> Result<FsPathBuf> {
    Ok(config_dir()?.join("config.json"))
}

pub fn oauth_secret_file() -> Result<FsPathBuf> {
    Ok(config_dir()?.join("client_secret.json"))
}

pub fn token_cache_file() -> Result<FsPathBuf> {
    Ok(cache_dir()?.join("token_cache.json"))
}
