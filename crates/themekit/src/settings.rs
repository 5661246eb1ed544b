//! Application configuration.
//!
//! Settings are read from `<config_dir>/themes.{toml,yaml,json,ini}` and
//! overlaid with environment variables prefixed `THEMEKIT_`, using `__` as
//! the nesting separator:
//!
//! | Key | Environment | Default |
//! |-----|-------------|---------|
//! | `app.debug` | `THEMEKIT_APP__DEBUG` | `false` |
//! | `theme.autoload` | `THEMEKIT_THEME__AUTOLOAD` | `true` |
//! | `theme.name` | `THEMEKIT_THEME__NAME` | unset |
//! | `theme.hooks` | | empty |
//! | `theme.route` | | empty |
//! | `theme.cache_dir` | `THEMEKIT_THEME__CACHE_DIR` | `<root>/runtime` |
//! | `theme.url_suffix` | `THEMEKIT_THEME__URL_SUFFIX` | unset |
//! | `route.url_convert` | `THEMEKIT_ROUTE__URL_CONVERT` | `true` |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ThemeError;

/// File stem of the application config file.
pub const CONFIG_FILE_STEM: &str = "themes";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "THEMEKIT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application-wide switches.
    pub app: AppSettings,
    /// Theme system settings.
    pub theme: ThemeSettings,
    /// Routing settings.
    pub route: RouteSettings,
}

/// `[app]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Debug mode disables the hook table cache.
    pub debug: bool,
}

/// `[theme]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    /// Collect theme-declared hooks at startup.
    pub autoload: bool,
    /// Active theme enforced by the guard middleware.
    pub name: Option<String>,
    /// Event name → themes listening to it.
    pub hooks: BTreeMap<String, HookList>,
    /// Named routes mapping directly onto the dispatcher.
    pub route: BTreeMap<String, RouteEntry>,
    /// Directory of the hook table cache.
    pub cache_dir: Option<PathBuf>,
    /// Suffix appended to generated URLs and stripped from matched ones.
    pub url_suffix: Option<String>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            autoload: true,
            name: None,
            hooks: BTreeMap::new(),
            route: BTreeMap::new(),
            cache_dir: None,
            url_suffix: None,
        }
    }
}

/// `[route]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteSettings {
    /// Lower-case theme, controller and action before dispatch.
    pub url_convert: bool,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self { url_convert: true }
    }
}

/// Themes subscribed to one hook, written either as `"a,b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookList {
    /// Comma-separated theme names.
    Csv(String),
    /// Explicit list of theme names.
    List(Vec<String>),
}

impl HookList {
    /// Theme names with blanks removed.
    pub fn themes(&self) -> Vec<String> {
        let names: Vec<&str> = match self {
            HookList::Csv(csv) => csv.split(',').collect(),
            HookList::List(list) => list.iter().map(String::as_str).collect(),
        };
        names
            .into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    }
}

/// One `theme.route` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteEntry {
    /// `key = "theme/controller/action"`: the key is the route pattern.
    Target(String),
    /// Routes that only match on `domain`: pattern → `"theme/controller/action"`.
    Domain {
        /// Host the rules are scoped to.
        domain: String,
        /// Pattern → target triple.
        #[serde(default)]
        rule: BTreeMap<String, String>,
    },
}

impl AppConfig {
    /// Loads `<config_dir>/themes.*` (optional) and environment overrides.
    pub fn load(config_dir: &Path) -> Result<Self, ThemeError> {
        let file = config_dir.join(CONFIG_FILE_STEM);
        debug!(path = %file.display(), "loading application config");
        let settings = Config::builder()
            .add_source(File::with_name(&file.to_string_lossy()).required(false))
            .add_source(env_source())
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Parses configuration from TOML text, without environment overrides.
    pub fn from_toml(source: &str) -> Result<Self, ThemeError> {
        let settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Directory of the hook table cache for an application rooted at `root`.
    pub fn cache_dir(&self, root: &Path) -> PathBuf {
        match &self.theme.cache_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => root.join(dir),
            None => root.join("runtime"),
        }
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
