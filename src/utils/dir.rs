use std::{env, path::PathBuf};

use anyhow::{Context, Result};

/// Resolves the directory holding the document, mood file, and logs, creating
/// it on first use. Every command takes `--dir` to override this.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = state_root()?;
    path.push("touchgrass");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

#[cfg(windows)]
fn state_root() -> Result<PathBuf> {
    Ok(PathBuf::from(
        env::var("APPDATA").context("APPDATA should be present on Windows")?,
    ))
}

#[cfg(not(windows))]
fn state_root() -> Result<PathBuf> {
    if let Ok(state) = env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(state));
    }
    let home = env::var("HOME").context("Neither XDG_STATE_HOME nor HOME is set")?;
    Ok(PathBuf::from(home).join(".local").join("state"))
}
