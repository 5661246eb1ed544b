//! Theme registration, class resolution and the per-process singleton cache.
//!
//! Themes are compiled in: each one is described by a [`ThemeModule`] that
//! names its plugin factory and its controllers. The registry maps
//! `(theme, kind, class)` to a stable class id and builds instances from the
//! registered factories.
//!
//! Class ids follow one scheme:
//!
//! | Kind | Id |
//! |------|----|
//! | [`ClassKind::Plugin`] | `themes::<theme>::Plugin` |
//! | [`ClassKind::Controller`] | `themes::<theme>::controller::<Class>` |
//!
//! `Class` is the studly-cased controller name. A dotted name such as
//! `admin.user_list` keeps its leading segments and studly-cases the last one:
//! `themes::shop::controller::admin::UserList`.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use themekit_dispatch::{into_object, Controller, ControllerObject};
use tracing::debug;

use crate::descriptor::InfoMap;
use crate::error::ThemeError;
use crate::naming::studly;
use crate::theme::{Plugin, ThemeBase, ThemeEnv};

/// Root namespace of every class id.
pub const THEMES_NAMESPACE: &str = "themes";

/// What a class id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// The theme's entry point.
    Plugin,
    /// A controller.
    Controller,
}

/// Builds the class id for `theme`, `kind` and optional `class`.
pub fn class_id(theme: &str, kind: ClassKind, class: Option<&str>) -> String {
    let theme = theme.trim();
    match kind {
        ClassKind::Plugin => format!("{}::{}::Plugin", THEMES_NAMESPACE, theme),
        ClassKind::Controller => {
            let class = class.map(str::trim).unwrap_or(theme);
            let class = match class.rsplit_once('.') {
                Some((prefix, last)) if !prefix.is_empty() => {
                    format!("{}::{}", prefix.replace('.', "::"), studly(last))
                }
                _ => studly(class),
            };
            format!("{}::{}::controller::{}", THEMES_NAMESPACE, theme, class)
        }
    }
}

type PluginFactory = Arc<dyn Fn(ThemeBase) -> Arc<dyn Plugin> + Send + Sync>;
type ControllerFactory = Arc<dyn Fn(ThemeBase) -> Box<dyn ControllerObject> + Send + Sync>;

/// Registration record for one compiled-in theme.
///
/// ```ignore
/// let module = ThemeModule::new("shop", |base| Shop { base })
///     .controller("index", |base| IndexController { base })
///     .controller("goods", |base| GoodsController { base });
/// ```
pub struct ThemeModule {
    name: String,
    plugin: PluginFactory,
    controllers: Vec<(String, ControllerFactory)>,
}

impl ThemeModule {
    /// Declares theme `name` with the factory of its plugin.
    pub fn new<P, F>(name: &str, factory: F) -> Self
    where
        P: Plugin,
        F: Fn(ThemeBase) -> P + Send + Sync + 'static,
    {
        let plugin: PluginFactory = Arc::new(move |base: ThemeBase| Arc::new(factory(base)) as Arc<dyn Plugin>);
        Self {
            name: name.trim().to_string(),
            plugin,
            controllers: Vec::new(),
        }
    }

    /// Adds controller `name` (e.g. `index`, `goods_item`, `admin.user`).
    ///
    /// The controller's action table is built here, once.
    pub fn controller<C, F>(mut self, name: &str, factory: F) -> Self
    where
        C: Controller,
        F: Fn(ThemeBase) -> C + Send + Sync + 'static,
    {
        let class = class_id(&self.name, ClassKind::Controller, Some(name));
        let actions = Arc::new(C::actions());
        let object_class = class.clone();
        let make: ControllerFactory = Arc::new(move |base: ThemeBase| {
            into_object(object_class.clone(), factory(base), Arc::clone(&actions))
        });
        self.controllers.push((class, make));
        self
    }

    /// Theme name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Class ids of the registered controllers.
    pub fn controller_classes(&self) -> impl Iterator<Item = &str> {
        self.controllers.iter().map(|(class, _)| class.as_str())
    }
}

impl std::fmt::Debug for ThemeModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeModule")
            .field("name", &self.name)
            .field("controllers", &self.controller_classes().collect::<Vec<_>>())
            .finish()
    }
}

/// All registered themes of one application.
pub struct ThemeRegistry {
    env: ThemeEnv,
    plugins: RwLock<HashMap<String, PluginFactory>>,
    controllers: RwLock<HashMap<String, ControllerFactory>>,
    instances: RwLock<HashMap<String, Arc<dyn Plugin>>>,
}

impl ThemeRegistry {
    /// Creates an empty registry over `env`.
    pub fn new(env: ThemeEnv) -> Self {
        Self {
            env,
            plugins: RwLock::new(HashMap::new()),
            controllers: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// The environment themes are built from.
    pub fn env(&self) -> &ThemeEnv {
        &self.env
    }

    /// Registers a theme. A later registration under the same name replaces
    /// the factories but not an already created plugin instance.
    pub fn register(&self, module: ThemeModule) {
        let ThemeModule {
            name,
            plugin,
            controllers,
        } = module;
        debug!(theme = %name, controllers = controllers.len(), "registering theme");
        self.controllers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(controllers);
        self.plugins
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, plugin);
    }

    /// True if a theme is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered theme names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Returns the plugin instance of theme `name`, creating it on first use.
    ///
    /// At most one instance per name is ever created, even under concurrent
    /// first calls. Plugin factories must not resolve other themes.
    pub fn resolve_instance(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        if let Some(instance) = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(Arc::clone(instance));
        }

        let factory = self
            .plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()?;

        let mut instances = self
            .instances
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let instance = instances.entry(name.to_string()).or_insert_with(|| {
            debug!(theme = %name, "creating theme plugin instance");
            factory(ThemeBase::new(&self.env, name))
        });
        Some(Arc::clone(instance))
    }

    /// Returns the class id if such a class is registered.
    pub fn resolve_class(&self, theme: &str, kind: ClassKind, class: Option<&str>) -> Option<String> {
        let theme = theme.trim();
        if theme.is_empty() {
            return None;
        }
        let id = class_id(theme, kind, class);
        let exists = match kind {
            ClassKind::Plugin => self.is_registered(theme),
            ClassKind::Controller => self
                .controllers
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(&id),
        };
        exists.then_some(id)
    }

    /// Creates a fresh controller instance for `class` bound to `theme`.
    pub fn instantiate_controller(&self, class: &str, theme: &str) -> Option<Box<dyn ControllerObject>> {
        let factory = self
            .controllers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(class)
            .cloned()?;
        Some(factory(ThemeBase::new(&self.env, theme)))
    }

    /// Metadata of theme `name`; empty when the theme is not registered.
    pub fn theme_info(&self, name: &str) -> Result<InfoMap, ThemeError> {
        match self.resolve_instance(name) {
            Some(plugin) => plugin.info(),
            None => Ok(InfoMap::new()),
        }
    }
}

impl std::fmt::Debug for ThemeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeRegistry")
            .field("env", &self.env)
            .field("themes", &self.names())
            .finish_non_exhaustive()
    }
}
