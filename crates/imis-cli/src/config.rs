use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const ROSTER_ENV: &str = "IMIS_ROSTER";
pub const COUNT_ENV: &str = "IMIS_SELECT_COUNT";
pub const DEFAULT_SELECT_COUNT: usize = 10;
const CONFIG_RELATIVE_PATH: &str = ".imis/config.json";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImisConfig {
    #[serde(default)]
    pub roster_path: Option<PathBuf>,
    #[serde(default)]
    pub default_count: Option<usize>,
    #[serde(default)]
    pub backup: Option<bool>,
}

/// An explicitly named config file must exist and parse. Otherwise the
/// project file is tried, then the one under the home directory, and a broken
/// file is only warned about.
pub fn load_config(explicit: Option<&Path>) -> Result<ImisConfig> {
    if let Some(path) = explicit {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()));
    }

    let mut candidates = Vec::new();
    let local = std::env::current_dir()
        .map(|dir| dir.join(CONFIG_RELATIVE_PATH))
        .ok();
    match local {
        Some(path) if path.exists() => candidates.push(path),
        _ => {
            if let Some(home) = dirs::home_dir() {
                candidates.push(home.join(CONFIG_RELATIVE_PATH));
            }
        }
    }

    for path in candidates {
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<ImisConfig>(&content) {
                Ok(config) => return Ok(config),
                Err(err) => {
                    warn!(path = %path.display(), %err, "ignoring unparseable config file");
                }
            }
        }
    }
    Ok(ImisConfig::default())
}

pub fn resolve_roster_path(flag: Option<&Path>, config: &ImisConfig) -> Option<PathBuf> {
    pick_roster_path(flag, env_value(ROSTER_ENV), config)
}

pub fn resolve_count(flag: Option<usize>, config: &ImisConfig) -> Result<usize> {
    pick_count(flag, env_value(COUNT_ENV), config)
}

pub fn resolve_backup(no_backup: bool, config: &ImisConfig) -> bool {
    !no_backup && config.backup.unwrap_or(true)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn pick_roster_path(
    flag: Option<&Path>,
    env: Option<String>,
    config: &ImisConfig,
) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env {
        return Some(PathBuf::from(value.trim()));
    }
    config.roster_path.clone()
}

fn pick_count(flag: Option<usize>, env: Option<String>, config: &ImisConfig) -> Result<usize> {
    if let Some(count) = flag {
        return Ok(count);
    }
    if let Some(value) = env {
        return value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{COUNT_ENV} must be a non-negative integer, got {value:?}"));
    }
    Ok(config.default_count.unwrap_or(DEFAULT_SELECT_COUNT))
}
