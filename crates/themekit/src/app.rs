//! The assembled theme service.
//!
//! ```ignore
//! let app = App::builder()
//!     .root("/srv/site")
//!     .theme(shop::module())
//!     .build()?;
//!
//! let response = app.handle(&Request::get("/themes/shop/index/index"))?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value};
use themekit_dispatch::{Event, EventBus, HookError, RequestContext, Response};
use themekit_render::{MiniJinjaEngine, TemplateEngine};
use tracing::{debug, info};

use crate::descriptor::InfoMap;
use crate::dispatcher::Dispatcher;
use crate::error::ThemeError;
use crate::guard::{Middleware, ThemeGuard};
use crate::registry::{ThemeModule, ThemeRegistry};
use crate::router::{Request, RouteTarget, Router};
use crate::service::{self, HookTable, ServiceBindings};
use crate::settings::AppConfig;
use crate::theme::ThemeEnv;
use crate::url::UrlBuilder;

/// Builder for [`App`].
#[derive(Default)]
pub struct AppBuilder {
    root: Option<PathBuf>,
    config: Option<AppConfig>,
    engine: Option<Arc<dyn TemplateEngine>>,
    modules: Vec<ThemeModule>,
    middleware: Vec<Middleware>,
}

impl AppBuilder {
    /// Creates a builder with no themes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Application root. Defaults to the current directory.
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Uses `config` instead of loading `<root>/config/themes.*`.
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Template engine for theme views. Defaults to [`MiniJinjaEngine`].
    pub fn engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Registers a compiled-in theme.
    pub fn theme(mut self, module: ThemeModule) -> Self {
        self.modules.push(module);
        self
    }

    /// Adds a middleware step to every request on the themed catch-all
    /// route. Steps run in the order added, after the theme guard.
    pub fn middleware<F>(mut self, step: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), ThemeError> + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(step));
        self
    }

    /// Runs the startup sequence.
    ///
    /// 1. ensure `<root>/theme` exists
    /// 2. register themes
    /// 3. load (or collect and cache) the hook table
    /// 4. run `ThemeInit` subscribers and subscribe the remaining hooks
    /// 5. read each theme's `info.ini` into the service bindings
    /// 6. build the route table
    pub fn build(self) -> Result<App, ThemeError> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let config = match self.config {
            Some(config) => config,
            None => AppConfig::load(&root.join(crate::CONFIG_DIR))?,
        };
        let engine = self
            .engine
            .unwrap_or_else(|| Arc::new(MiniJinjaEngine::new()) as Arc<dyn TemplateEngine>);

        let themes_path = service::ensure_themes_dir(&root)?;
        let env = ThemeEnv::new(
            &themes_path,
            engine,
            UrlBuilder::new(config.theme.url_suffix.clone()),
        );
        let registry = Arc::new(ThemeRegistry::new(env));
        for module in self.modules {
            registry.register(module);
        }

        let events = Arc::new(EventBus::new());
        let hooks = service::load_hook_table(&config, &root, &registry)?;
        service::register_hooks(&hooks, &registry, &events)?;

        let bindings = service::load_bindings(&themes_path)?;
        let router = service::build_routes(&config.theme)?;

        let url_convert = config.route.url_convert;
        let dispatcher = Dispatcher::new(Arc::clone(&registry), Arc::clone(&events), url_convert);
        let guard = ThemeGuard::new(
            config.theme.name.clone(),
            Arc::clone(&registry),
            Arc::clone(&events),
            url_convert,
        )
        .with_middleware(self.middleware);

        info!(
            root = %root.display(),
            themes = registry.names().len(),
            hooks = hooks.len(),
            bindings = bindings.len(),
            "theme service ready"
        );

        Ok(App {
            root,
            config,
            registry,
            events,
            hooks,
            bindings,
            router,
            dispatcher,
            guard,
        })
    }
}

impl std::fmt::Debug for AppBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppBuilder")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("modules", &self.modules)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// A bootstrapped theme service.
#[derive(Debug)]
pub struct App {
    root: PathBuf,
    config: AppConfig,
    registry: Arc<ThemeRegistry>,
    events: Arc<EventBus>,
    hooks: HookTable,
    bindings: ServiceBindings,
    router: Router,
    dispatcher: Dispatcher,
    guard: ThemeGuard,
}

impl App {
    /// Starts building an application.
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    /// Routes and dispatches `request`.
    ///
    /// Requests matched by the catch-all route pass the theme guard first;
    /// named routes from configuration go straight to the dispatcher.
    pub fn handle(&self, request: &Request) -> Result<Response, ThemeError> {
        let mut ctx = RequestContext::new(request.path.clone());
        self.handle_with(request, &mut ctx)
    }

    /// Like [`handle`](App::handle), leaving the request state in `ctx`.
    pub fn handle_with(
        &self,
        request: &Request,
        ctx: &mut RequestContext,
    ) -> Result<Response, ThemeError> {
        let matched = self
            .router
            .match_request(request)
            .ok_or_else(|| ThemeError::RouteNotFound(request.path.clone()))?;
        debug!(
            path = %request.path,
            rule = matched.rule.pattern.as_str(),
            fixed = matches!(matched.rule.target, RouteTarget::Fixed { .. }),
            "route matched"
        );

        ctx.host = request.host.clone();
        ctx.query = request.query.clone();
        ctx.params = matched.params;

        let dispatch = |ctx: &mut RequestContext| {
            let theme = ctx.param("theme").map(str::to_owned);
            let controller = ctx.param("controller").map(str::to_owned);
            let action = ctx.param("action").map(str::to_owned);
            self.dispatcher
                .execute(ctx, theme.as_deref(), controller.as_deref(), action.as_deref())
        };

        if matched.rule.guarded {
            self.guard.handle(ctx, dispatch)
        } else {
            dispatch(ctx)
        }
    }

    /// Dispatches directly, bypassing routing and the guard.
    pub fn execute(
        &self,
        ctx: &mut RequestContext,
        theme: Option<&str>,
        controller: Option<&str>,
        action: Option<&str>,
    ) -> Result<Response, ThemeError> {
        self.dispatcher.execute(ctx, theme, controller, action)
    }

    /// Fires `event` and joins the listeners' output.
    pub fn hook(&self, event: &str, payload: Event<'_>) -> Result<String, HookError> {
        self.events.hook(event, payload)
    }

    /// Builds a theme URL relative to `current`.
    pub fn url(
        &self,
        spec: &str,
        current: &RequestContext,
        params: &BTreeMap<String, String>,
    ) -> String {
        self.registry.env().urls().build(spec, current, params)
    }

    /// Settings of the theme serving `ctx`. Empty when no registered theme
    /// matches `ctx.theme`.
    pub fn theme_config(
        &self,
        ctx: &RequestContext,
        full: bool,
    ) -> Result<Map<String, Value>, ThemeError> {
        match self.registry.resolve_instance(&ctx.theme) {
            Some(theme) => theme.config(full),
            None => Ok(Map::new()),
        }
    }

    /// Parsed `info.ini` of theme `name`, as read at startup.
    pub fn binding(&self, name: &str) -> Option<&InfoMap> {
        self.bindings.get(name)
    }

    /// All service bindings.
    pub fn bindings(&self) -> &ServiceBindings {
        &self.bindings
    }

    /// The hook table in effect.
    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The theme registry.
    pub fn registry(&self) -> &ThemeRegistry {
        &self.registry
    }

    /// The route table.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Effective configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Application root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/theme`.
    pub fn themes_path(&self) -> &Path {
        self.registry.env().themes_path()
    }
}
