//! Theme entities.
//!
//! Every theme ships one [`Plugin`] (its entry point) and any number of
//! controllers. Both are built around a [`ThemeBase`], which knows the
//! theme's name and directory and gives access to:
//!
//! - the theme's metadata (`info.ini`), via [`ThemeBase::info_with`]
//! - the theme's settings (`config.yaml`), via [`ThemeBase::config`]
//! - a view scoped to `<theme>/view/`, via [`ThemeBase::fetch`] and friends
//!
//! Metadata and settings are loaded once per process and cached in the
//! environment's [`ConfigStore`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{Map, Value};
use themekit_dispatch::{Event, HookError, RequestContext};
use themekit_render::{RenderError, TemplateEngine, ViewContext};
use tracing::debug;

use crate::descriptor::{self, InfoMap, INFO_FILE, SETTINGS_FILE};
use crate::error::ThemeError;
use crate::store::ConfigStore;
use crate::url::UrlBuilder;

/// Name of the template directory inside a theme.
pub const VIEW_DIR: &str = "view";

/// Everything a theme entity needs from the host application.
#[derive(Clone)]
pub struct ThemeEnv {
    inner: Arc<EnvInner>,
}

struct EnvInner {
    themes_path: PathBuf,
    store: ConfigStore,
    engine: Arc<dyn TemplateEngine>,
    urls: UrlBuilder,
}

impl ThemeEnv {
    /// Creates an environment rooted at `themes_path` (`<root>/theme`).
    pub fn new(
        themes_path: impl Into<PathBuf>,
        engine: Arc<dyn TemplateEngine>,
        urls: UrlBuilder,
    ) -> Self {
        Self {
            inner: Arc::new(EnvInner {
                themes_path: themes_path.into(),
                store: ConfigStore::new(),
                engine,
                urls,
            }),
        }
    }

    /// Directory holding one sub-directory per theme.
    pub fn themes_path(&self) -> &Path {
        &self.inner.themes_path
    }

    /// `<themes>/<name>/`.
    pub fn theme_path(&self, name: &str) -> PathBuf {
        self.inner.themes_path.join(name)
    }

    /// `<themes>/<name>/view/`.
    pub fn view_path(&self, name: &str) -> PathBuf {
        self.theme_path(name).join(VIEW_DIR)
    }

    /// Descriptor cache shared by all themes.
    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    /// Template engine every view renders with.
    pub fn engine(&self) -> Arc<dyn TemplateEngine> {
        Arc::clone(&self.inner.engine)
    }

    /// URL builder configured with the application's suffix.
    pub fn urls(&self) -> &UrlBuilder {
        &self.inner.urls
    }
}

impl std::fmt::Debug for ThemeEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeEnv")
            .field("themes_path", &self.inner.themes_path)
            .field("urls", &self.inner.urls)
            .finish_non_exhaustive()
    }
}

/// State shared by a theme's plugin and its controllers.
pub struct ThemeBase {
    name: String,
    path: PathBuf,
    env: ThemeEnv,
    view: Mutex<ViewContext>,
}

impl ThemeBase {
    /// Creates the base for theme `name`.
    pub fn new(env: &ThemeEnv, name: &str) -> Self {
        let view = ViewContext::new(env.view_path(name), env.engine());
        Self {
            name: name.to_string(),
            path: env.theme_path(name),
            env: env.clone(),
            view: Mutex::new(view),
        }
    }

    /// Theme name, e.g. `shop`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Theme directory, e.g. `<themes>/shop/`.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The environment this theme was built from.
    pub fn env(&self) -> &ThemeEnv {
        &self.env
    }

    /// Theme metadata without any entity-declared defaults.
    pub fn info(&self) -> Result<InfoMap, ThemeError> {
        self.info_with(&InfoMap::new())
    }

    /// Theme metadata: `info.ini` plus a generated `url`, overlaid with
    /// `declared`. Without `info.ini` the result is just `declared`.
    ///
    /// The first non-empty result is cached for the rest of the process.
    pub fn info_with(&self, declared: &InfoMap) -> Result<InfoMap, ThemeError> {
        let key = self.store_key("info");
        if let Some(Value::Object(cached)) = self.env.store().get(&key) {
            if !cached.is_empty() {
                return Ok(cached);
            }
        }

        let mut info = match descriptor::load_info(&self.path.join(INFO_FILE))? {
            Some(mut from_file) => {
                from_file.insert("url".into(), Value::String(self.env.urls().home(&self.name)));
                from_file
            }
            None => InfoMap::new(),
        };
        info.extend(declared.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(theme = %self.name, keys = info.len(), "loaded theme info");
        self.env.store().set(key, Value::Object(info.clone()));
        Ok(info)
    }

    /// Theme settings from `config.yaml`.
    ///
    /// With `full` each setting maps to its whole descriptor (label, type,
    /// value, ...); otherwise to its `value` alone. A missing file yields an
    /// empty map.
    pub fn config(&self, full: bool) -> Result<Map<String, Value>, ThemeError> {
        let key = self.store_key("config");
        let settings = match self.env.store().get(&key) {
            Some(Value::Object(cached)) => cached,
            _ => {
                let loaded = descriptor::load_settings(&self.path.join(SETTINGS_FILE))?;
                self.env.store().set(key, Value::Object(loaded.clone()));
                loaded
            }
        };
        Ok(if full {
            settings
        } else {
            descriptor::flatten_settings(&settings)
        })
    }

    /// Binds a variable for later renders of this theme's views.
    pub fn assign(&self, name: &str, value: impl Serialize) -> Result<&Self, RenderError> {
        self.view().assign(name, value)?;
        Ok(self)
    }

    /// Renders `<theme>/view/<template>`.
    pub fn fetch(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        self.view().fetch(template, vars)
    }

    /// Renders inline template content with this theme's assigned variables.
    pub fn display(&self, content: &str, vars: &Value) -> Result<String, RenderError> {
        self.view().display(content, vars)
    }

    /// Builds a theme URL relative to `current`.
    pub fn url(
        &self,
        spec: &str,
        current: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> String {
        self.env.urls().build(spec, current, params)
    }

    fn view(&self) -> MutexGuard<'_, ViewContext> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_key(&self, kind: &str) -> String {
        format!("theme_{}_{}", self.name, kind)
    }
}

impl std::fmt::Debug for ThemeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeBase")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A theme's entry point.
///
/// One instance exists per theme per process; it is created on first use
/// and shared from then on.
///
/// ```ignore
/// struct Shop {
///     base: ThemeBase,
/// }
///
/// impl Plugin for Shop {
///     fn base(&self) -> &ThemeBase {
///         &self.base
///     }
///     fn install(&self) -> anyhow::Result<()> {
///         Ok(())
///     }
///     fn uninstall(&self) -> anyhow::Result<()> {
///         Ok(())
///     }
///     fn hooks(&self) -> &'static [&'static str] {
///         &["page_footer"]
///     }
///     fn on_hook(&self, hook: &str, _event: &Event<'_>) -> Result<Option<String>, HookError> {
///         Ok(Some(format!("<footer>{hook}</footer>")))
///     }
/// }
/// ```
pub trait Plugin: Send + Sync + 'static {
    /// Shared theme state.
    fn base(&self) -> &ThemeBase;

    /// Installs the theme.
    fn install(&self) -> anyhow::Result<()>;

    /// Uninstalls the theme.
    fn uninstall(&self) -> anyhow::Result<()>;

    /// Metadata overriding `info.ini`, and standing in for it when absent.
    fn declared_info(&self) -> InfoMap {
        InfoMap::new()
    }

    /// Events this theme listens to.
    fn hooks(&self) -> &'static [&'static str] {
        &[]
    }

    /// Handles one of [`hooks`](Plugin::hooks). Returned text is collected
    /// by the event bus.
    fn on_hook(&self, _hook: &str, _event: &Event<'_>) -> Result<Option<String>, HookError> {
        Ok(None)
    }

    /// Theme name.
    fn name(&self) -> &str {
        self.base().name()
    }

    /// Theme metadata including [`declared_info`](Plugin::declared_info).
    fn info(&self) -> Result<InfoMap, ThemeError> {
        self.base().info_with(&self.declared_info())
    }

    /// Theme settings, full descriptors or values only.
    fn config(&self, full: bool) -> Result<Map<String, Value>, ThemeError> {
        self.base().config(full)
    }
}
