//! Startup wiring: hook table, hook cache, service bindings and routes.
//!
//! The hook table maps event names to the themes listening to them. It is
//! the union of `theme.hooks` from configuration and, with
//! `theme.autoload`, the [`Plugin::hooks`](crate::theme::Plugin::hooks) of
//! every theme found on disk. Outside debug mode it is cached as JSON in
//! `<cache_dir>/hooks.json` and reused on later starts.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use themekit_dispatch::{Event, EventBus, HookError, Listener, THEME_INIT};
use tracing::{debug, info, warn};

use crate::descriptor::{self, InfoMap, INFO_FILE};
use crate::error::ThemeError;
use crate::registry::ThemeRegistry;
use crate::router::{RouteRule, Router};
use crate::settings::{AppConfig, RouteEntry, ThemeSettings};

/// Name of the hook table cache file.
pub const HOOK_CACHE_FILE: &str = "hooks.json";

/// Theme name → parsed `info.ini`, for every theme directory that has one.
pub type ServiceBindings = BTreeMap<String, InfoMap>;

/// Event name → themes listening to it, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookTable(BTreeMap<String, Vec<String>>);

impl HookTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `theme.hooks`.
    pub fn from_settings(settings: &ThemeSettings) -> Self {
        let mut table = Self::new();
        for (hook, themes) in &settings.hooks {
            for theme in themes.themes() {
                table.add(hook, &theme);
            }
        }
        table
    }

    /// Subscribes `theme` to `hook`. Returns false if it already was.
    pub fn add(&mut self, hook: &str, theme: &str) -> bool {
        let themes = self.0.entry(hook.to_string()).or_default();
        if themes.iter().any(|t| t == theme) {
            return false;
        }
        themes.push(theme.to_string());
        true
    }

    /// Themes subscribed to `hook`, in subscription order.
    pub fn themes(&self, hook: &str) -> &[String] {
        self.0.get(hook).map(Vec::as_slice).unwrap_or_default()
    }

    /// `(hook, themes)` pairs, ordered by hook name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(hook, themes)| (hook.as_str(), themes.as_slice()))
    }

    /// Number of `(hook, theme)` subscriptions.
    pub fn len(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// True if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// JSON file cache of the hook table.
#[derive(Debug, Clone)]
pub struct HookCache {
    path: PathBuf,
}

impl HookCache {
    /// A cache stored in `<dir>/hooks.json`.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(HOOK_CACHE_FILE),
        }
    }

    /// Cache file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cached table. A missing or unreadable cache yields `None`.
    pub fn load(&self) -> Option<HookTable> {
        let content = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "ignoring corrupt hook cache");
                None
            }
        }
    }

    /// Writes the table.
    pub fn store(&self, table: &HookTable) -> Result<(), ThemeError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(table)
            .map_err(|e| ThemeError::Config(format!("cannot serialize hook table: {}", e)))?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    /// Deletes the cache file if present.
    pub fn clear(&self) -> Result<(), ThemeError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Theme directory names below `themes_path`, sorted. A missing directory
/// yields an empty list.
pub fn theme_dirs(themes_path: &Path) -> Result<Vec<String>, ThemeError> {
    let entries = match fs::read_dir(themes_path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Builds the hook table from configuration and, with `autoload`, from the
/// hooks declared by every registered theme found on disk.
pub fn collect_hooks(
    settings: &ThemeSettings,
    registry: &ThemeRegistry,
) -> Result<HookTable, ThemeError> {
    let mut table = HookTable::from_settings(settings);
    if !settings.autoload {
        return Ok(table);
    }
    for name in theme_dirs(registry.env().themes_path())? {
        let Some(plugin) = registry.resolve_instance(&name) else {
            debug!(theme = %name, "skipping unregistered theme directory");
            continue;
        };
        for hook in plugin.hooks() {
            table.add(hook, &name);
        }
    }
    Ok(table)
}

/// Returns the cached hook table, or collects and caches a fresh one.
/// Debug mode always collects and never writes the cache.
pub fn load_hook_table(
    config: &AppConfig,
    root: &Path,
    registry: &ThemeRegistry,
) -> Result<HookTable, ThemeError> {
    let cache = HookCache::new(&config.cache_dir(root));
    if !config.app.debug {
        if let Some(table) = cache.load().filter(|t| !t.is_empty()) {
            debug!(path = %cache.path().display(), "using cached hook table");
            return Ok(table);
        }
    }

    let table = collect_hooks(&config.theme, registry)?;
    if !config.app.debug {
        cache.store(&table)?;
    }
    Ok(table)
}

/// Runs [`THEME_INIT`] on its subscribers, then subscribes every other
/// `(hook, theme)` pair on `events`.
pub fn register_hooks(
    table: &HookTable,
    registry: &Arc<ThemeRegistry>,
    events: &EventBus,
) -> Result<(), ThemeError> {
    for theme in table.themes(THEME_INIT) {
        match registry.resolve_instance(theme) {
            Some(plugin) => {
                plugin.on_hook(THEME_INIT, &Event::Theme(theme))?;
            }
            None => warn!(theme = %theme, hook = THEME_INIT, "hook subscriber is not registered"),
        }
    }

    let listeners: Vec<(String, Listener)> = table
        .iter()
        .filter(|(hook, _)| *hook != THEME_INIT)
        .flat_map(|(hook, themes)| {
            themes
                .iter()
                .map(move |theme| (hook.to_string(), theme_listener(registry, hook, theme)))
        })
        .collect();
    let count = listeners.len();
    events.listen_events(listeners);
    debug!(listeners = count, "registered theme hooks");
    Ok(())
}

fn theme_listener(registry: &Arc<ThemeRegistry>, hook: &str, theme: &str) -> Listener {
    let registry = Arc::clone(registry);
    let hook = hook.to_string();
    let theme = theme.to_string();
    Arc::new(
        move |event: &Event<'_>| -> Result<Option<String>, HookError> {
            match registry.resolve_instance(&theme) {
                Some(plugin) => plugin.on_hook(&hook, event),
                None => {
                    warn!(theme = %theme, hook = %hook, "hook subscriber is not registered");
                    Ok(None)
                }
            }
        },
    )
}

/// Parses `info.ini` of every theme directory that has one.
///
/// A file that fails to parse leaves its theme out of the bindings; requests
/// for that theme still fail on their own.
pub fn load_bindings(themes_path: &Path) -> Result<ServiceBindings, ThemeError> {
    let mut bindings = ServiceBindings::new();
    for name in theme_dirs(themes_path)? {
        match descriptor::load_info(&themes_path.join(&name).join(INFO_FILE)) {
            Ok(Some(info)) => {
                bindings.insert(name, info);
            }
            Ok(None) => {}
            Err(err @ ThemeError::Info { .. }) => {
                warn!(theme = %name, error = %err, "skipping theme with unreadable info");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(bindings)
}

/// Builds the route table: the guarded catch-all first, then `theme.route`.
pub fn build_routes(settings: &ThemeSettings) -> Result<Router, ThemeError> {
    let mut router = Router::new(settings.url_suffix.as_deref());
    router.push(RouteRule::catch_all());
    for (key, entry) in &settings.route {
        match entry {
            RouteEntry::Target(target) if target.trim().is_empty() => {}
            RouteEntry::Target(target) => router.push(RouteRule::fixed(key, key, target, None)?),
            RouteEntry::Domain { domain, rule } => {
                for (pattern, target) in rule {
                    router.push(RouteRule::fixed(key, pattern, target, Some(domain))?);
                }
            }
        }
    }
    info!(rules = router.rules().len(), "built theme routes");
    Ok(router)
}

/// Ensures `<root>/theme` exists and returns it.
pub fn ensure_themes_dir(root: &Path) -> Result<PathBuf, ThemeError> {
    let path = root.join(crate::THEMES_DIR);
    if !path.is_dir() {
        fs::create_dir_all(&path)?;
        info!(path = %path.display(), "created themes directory");
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::HookList;
    use tempfile::TempDir;

    #[test]
    fn test_hook_table_dedupes() {
        let mut table = HookTable::new();
        assert!(table.add("footer", "shop"));
        assert!(!table.add("footer", "shop"));
        assert!(table.add("footer", "blog"));
        assert_eq!(table.themes("footer"), ["shop", "blog"]);
        assert!(table.themes("header").is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_hook_table_from_settings() {
        let mut settings = ThemeSettings::default();
        settings
            .hooks
            .insert("footer".into(), HookList::Csv("shop,blog,shop".into()));
        let table = HookTable::from_settings(&settings);
        assert_eq!(table.themes("footer"), ["shop", "blog"]);
    }

    #[test]
    fn test_hook_cache_roundtrip_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = HookCache::new(&dir.path().join("runtime"));
        assert!(cache.load().is_none());

        let mut table = HookTable::new();
        table.add("footer", "shop");
        cache.store(&table).unwrap();
        assert_eq!(cache.load(), Some(table));

        cache.clear().unwrap();
        assert!(cache.load().is_none());
        cache.clear().unwrap();
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let dir = TempDir::new().unwrap();
        let cache = HookCache::new(dir.path());
        fs::write(cache.path(), "not json").unwrap();
        assert!(cache.load().is_none());
    }

    #[test]
    fn test_theme_dirs_and_bindings() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("shop")).unwrap();
        fs::create_dir_all(dir.path().join("bare")).unwrap();
        fs::write(dir.path().join("shop").join(INFO_FILE), "name = shop\nstatus = 1\n").unwrap();
        fs::write(dir.path().join("README"), "not a theme").unwrap();

        assert_eq!(theme_dirs(dir.path()).unwrap(), vec!["bare", "shop"]);
        let bindings = load_bindings(dir.path()).unwrap();
        assert_eq!(bindings.keys().collect::<Vec<_>>(), vec!["shop"]);
        assert_eq!(bindings["shop"]["status"], serde_json::json!(1));

        assert!(theme_dirs(&dir.path().join("missing")).unwrap().is_empty());
    }

    #[test]
    fn test_build_routes_order() {
        let mut settings = ThemeSettings::default();
        settings
            .route
            .insert("home".into(), RouteEntry::Target("shop/index/index".into()));
        settings.route.insert("skip".into(), RouteEntry::Target(" ".into()));
        let mut rule = BTreeMap::new();
        rule.insert("list".to_string(), "shop/goods/list".to_string());
        settings.route.insert(
            "mall".into(),
            RouteEntry::Domain {
                domain: "mall.example.com".into(),
                rule,
            },
        );

        let router = build_routes(&settings).unwrap();
        let names: Vec<Option<&str>> = router.rules().iter().map(|r| r.name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("home"), Some("mall")]);
        assert_eq!(router.rules()[2].domain.as_deref(), Some("mall.example.com"));
    }

    #[test]
    fn test_ensure_themes_dir() {
        let dir = TempDir::new().unwrap();
        let path = ensure_themes_dir(dir.path()).unwrap();
        assert!(path.is_dir());
        assert_eq!(ensure_themes_dir(dir.path()).unwrap(), path);
    }
}
