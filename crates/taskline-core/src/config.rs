use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_DATA_FILE: &str = "tasks.json";
pub const PROJECT_CONFIG_NAMES: [&str; 2] = [".taskline.toml", ".tasklinerc"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct TasklineConfig {
    /// Where tasks are saved. Relative paths resolve against the directory
    /// holding the config file.
    pub data_file: Option<String>,
}

impl TasklineConfig {
    fn data_file(&self) -> Option<&str> {
        self.data_file
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFileSource {
    Flag,
    Project,
    Global,
    Default,
}

impl DataFileSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFileSource::Flag => "flag",
            DataFileSource::Project => "project",
            DataFileSource::Global => "global",
            DataFileSource::Default => "default",
        }
    }
}

fn non_empty_env(var: &str) -> Option<PathBuf> {
    let value = std::env::var(var).ok()?;
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

/// `TASKLINE_HOME`, else `~/.taskline`.
pub fn taskline_home() -> Option<PathBuf> {
    non_empty_env("TASKLINE_HOME").or_else(|| {
        ["HOME", "USERPROFILE"]
            .into_iter()
            .find_map(non_empty_env)
            .map(|home| home.join(".taskline"))
    })
}

pub fn global_config_path() -> Option<PathBuf> {
    taskline_home().map(|home| home.join("config.toml"))
}

/// The nearest project config file at or above `start`.
pub fn find_project_config(start: &Path) -> Option<PathBuf> {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    start.ancestors().find_map(|dir| {
        PROJECT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    })
}

/// Reads one config file. An unreadable or malformed file is logged and
/// treated as absent.
pub fn read_config(path: &Path) -> Option<TasklineConfig> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cannot read config, ignoring it");
            return None;
        }
    };
    match toml::from_str::<TasklineConfig>(&text) {
        Ok(config) => {
            debug!(path = %path.display(), "loaded config");
            Some(config)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "malformed config, ignoring it");
            None
        }
    }
}

/// Picks the data file: explicit flag, then the nearest project config,
/// then the global config, then `tasks.json` in `cwd`.
pub fn resolve_data_file_with_source(
    cwd: &Path,
    flag: Option<&Path>,
) -> (PathBuf, DataFileSource) {
    if let Some(path) = flag {
        return (cwd.join(path), DataFileSource::Flag);
    }
    if let Some(path) = find_project_config(cwd) {
        let config = read_config(&path).unwrap_or_default();
        if let (Some(file), Some(root)) = (config.data_file(), path.parent()) {
            return (root.join(file), DataFileSource::Project);
        }
    }
    if let Some(path) = global_config_path().filter(|path| path.is_file()) {
        let config = read_config(&path).unwrap_or_default();
        if let (Some(file), Some(home)) = (config.data_file(), path.parent()) {
            return (home.join(file), DataFileSource::Global);
        }
    }
    (cwd.join(DEFAULT_DATA_FILE), DataFileSource::Default)
}
