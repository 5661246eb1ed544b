//! Loaders for the on-disk theme descriptor files.
//!
//! - `info.ini`: typed key/value metadata. Must carry `status` for the theme
//!   to be dispatchable.
//! - `config.yaml`: settings for an admin UI, each a mapping with at least a
//!   `value` plus free-form metadata:
//!
//! ```yaml
//! title:
//!   label: Site title
//!   type: text
//!   value: My Shop
//! per_page:
//!   label: Items per page
//!   type: number
//!   value: 20
//! ```

use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ThemeError;

/// Theme metadata, as parsed from `info.ini`.
pub type InfoMap = Map<String, Value>;

/// Name of the metadata file inside a theme directory.
pub const INFO_FILE: &str = "info.ini";

/// Name of the settings file inside a theme directory.
pub const SETTINGS_FILE: &str = "config.yaml";

/// Parses an `info.ini` file. A missing file yields `None`.
///
/// Scalars are coerced the way a typed INI scan does: `true`/`on`/`yes`
/// become `true`, `false`/`off`/`no`/`none` become `false`, `null` becomes
/// null, and integer strings become integers. Sections become nested objects,
/// and so do dotted keys: `author.name = bob` reads as
/// `{"author": {"name": "bob"}}`.
pub fn load_info(path: &Path) -> Result<Option<InfoMap>, ThemeError> {
    if !path.is_file() {
        return Ok(None);
    }
    let info_error = |message: String| ThemeError::Info {
        path: path.to_path_buf(),
        message,
    };
    let raw: InfoMap = Config::builder()
        .add_source(File::new(&path.to_string_lossy(), FileFormat::Ini))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| info_error(e.to_string()))?;

    Ok(Some(raw.into_iter().map(|(k, v)| (k, coerce(v))).collect()))
}

fn coerce(value: Value) -> Value {
    match value {
        Value::String(s) => coerce_scalar(s),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, coerce(v))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(coerce).collect()),
        other => other,
    }
}

fn coerce_scalar(raw: String) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => return Value::Bool(true),
        "false" | "off" | "no" | "none" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    match trimmed.parse::<i64>() {
        Ok(n) if n.to_string() == trimmed => Value::from(n),
        _ => Value::String(raw),
    }
}

/// Returns true if `info.status` is present and truthy.
pub fn is_enabled(info: &InfoMap) -> bool {
    match info.get("status") {
        Some(Value::Bool(enabled)) => *enabled,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty() && s != "0",
        _ => false,
    }
}

/// One setting from `config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingDescriptor {
    /// The setting's current value.
    #[serde(default)]
    pub value: Value,
    /// Label, type, options and anything else the file declares.
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

/// Parses a `config.yaml` into setting → full descriptor. A missing or
/// empty file yields an empty map.
pub fn load_settings(path: &Path) -> Result<Map<String, Value>, ThemeError> {
    if !path.is_file() {
        return Ok(Map::new());
    }
    let settings_error = |message: String| ThemeError::Settings {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Map::new());
    }
    let parsed: std::collections::BTreeMap<String, SettingDescriptor> =
        serde_yaml::from_str(&content).map_err(|e| settings_error(e.to_string()))?;

    parsed
        .into_iter()
        .map(|(key, descriptor)| {
            serde_json::to_value(descriptor)
                .map(|value| (key, value))
                .map_err(|e| settings_error(e.to_string()))
        })
        .collect()
}

/// Reduces setting descriptors to setting → `value`.
pub fn flatten_settings(full: &Map<String, Value>) -> Map<String, Value> {
    full.iter()
        .map(|(key, descriptor)| {
            let value = descriptor.get("value").cloned().unwrap_or(Value::Null);
            (key.clone(), value)
        })
        .collect()
}
