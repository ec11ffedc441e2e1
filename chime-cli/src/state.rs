use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

pub fn chime_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".chime"))
}

pub fn ensure_chime_home() -> Result<PathBuf> {
    let dir = chime_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn alarms_path() -> Result<PathBuf> {
    Ok(ensure_chime_home()?.join("alarms.json"))
}

pub fn wakeups_path() -> Result<PathBuf> {
    Ok(ensure_chime_home()?.join("wakeups.json"))
}
