use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("roster {} is locked by another process ({})", .roster.display(), .lock_path.display())]
pub struct RosterLocked {
    pub roster: PathBuf,
    pub lock_path: PathBuf,
}

/// Exclusive advisory lock on `<roster>.lock`, released on drop.
pub struct RosterLock {
    file: File,
}

impl RosterLock {
    pub fn acquire(roster_path: &Path) -> Result<Self> {
        let lock_path = lock_path_for(roster_path);
        if let Some(parent) = lock_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file {}", lock_path.display()))?;

        if file.try_lock_exclusive().is_err() {
            return Err(RosterLocked {
                roster: roster_path.to_path_buf(),
                lock_path,
            }
            .into());
        }

        let metadata = format!(
            "owner_pid={}\nacquired_at={}\n",
            std::process::id(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        );
        file.set_len(0)?;
        file.write_all(metadata.as_bytes())?;
        file.flush()?;

        Ok(Self { file })
    }
}

impl Drop for RosterLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

pub fn lock_path_for(roster_path: &Path) -> PathBuf {
    let mut name = roster_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "roster".into());
    name.push(".lock");
    roster_path.with_file_name(name)
}
