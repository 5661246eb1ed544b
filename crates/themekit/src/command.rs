//! The `themes:*` commands.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::descriptor::is_enabled;
use crate::error::CommandError;
use crate::service::ServiceBindings;
use crate::settings::CONFIG_FILE_STEM;

/// The configuration written by `themes:config`.
pub const DEFAULT_CONFIG: &str = include_str!("../config/themes.toml");

/// Writes the default configuration to `<config_dir>/themes.toml`.
///
/// Never overwrites an existing file.
pub fn send_config(config_dir: &Path) -> Result<PathBuf, CommandError> {
    std::fs::create_dir_all(config_dir).map_err(|source| CommandError::Write {
        path: config_dir.to_path_buf(),
        source,
    })?;

    let path = config_dir.join(format!("{}.toml", CONFIG_FILE_STEM));
    let write_error = |source: std::io::Error| CommandError::Write {
        path: path.clone(),
        source,
    };
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(CommandError::AlreadyExists(path.clone()));
        }
        Err(e) => return Err(write_error(e)),
    };
    file.write_all(DEFAULT_CONFIG.as_bytes()).map_err(write_error)?;

    info!(path = %path.display(), "wrote theme config");
    Ok(path)
}

/// One row of `themes:list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThemeSummary {
    /// Directory name.
    pub name: String,
    /// `title` from `info.ini`, if any.
    pub title: Option<String>,
    /// `version` from `info.ini`, if any.
    pub version: Option<String>,
    /// Whether the theme can be dispatched to.
    pub enabled: bool,
}

/// Summarizes the service bindings, one row per theme.
pub fn list_themes(bindings: &ServiceBindings) -> Vec<ThemeSummary> {
    bindings
        .iter()
        .map(|(name, info)| ThemeSummary {
            name: name.clone(),
            title: info.get("title").and_then(scalar),
            version: info.get("version").and_then(scalar),
            enabled: is_enabled(info),
        })
        .collect()
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
