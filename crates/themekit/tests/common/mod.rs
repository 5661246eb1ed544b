//! Shared fixture: an application root with two themes.
//!
//! - `shop`: enabled; plugin hooks `page_footer` and `ThemeInit`; controllers
//!   `index` (with an empty-action fallback) and `goods`
//! - `blog`: disabled (`status = 0`); controller `index`
//! - `ghost`: a directory with `info.ini` but no registered code

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use tempfile::TempDir;
use themekit::{App, AppConfig, InfoMap, Plugin, ThemeBase, ThemeModule};
use themekit_dispatch::{
    ActionResult, Actions, Controller, Event, EventBus, HookError, RequestContext, Response,
    THEME_INIT,
};
use themekit_render::ViewContext;

#[derive(Debug, Default)]
pub struct Counters {
    pub plugins: AtomicUsize,
    pub controllers: AtomicUsize,
    pub inits: AtomicUsize,
}

impl Counters {
    pub fn plugins(&self) -> usize {
        self.plugins.load(Ordering::SeqCst)
    }

    pub fn controllers(&self) -> usize {
        self.controllers.load(Ordering::SeqCst)
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }
}

pub struct ShopPlugin {
    base: ThemeBase,
    counters: Arc<Counters>,
}

impl Plugin for ShopPlugin {
    fn base(&self) -> &ThemeBase {
        &self.base
    }

    fn install(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn uninstall(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn hooks(&self) -> &'static [&'static str] {
        &["page_footer", THEME_INIT]
    }

    fn on_hook(&self, hook: &str, _event: &Event<'_>) -> Result<Option<String>, HookError> {
        match hook {
            THEME_INIT => {
                self.counters.inits.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
            "page_footer" => Ok(Some(format!("<footer>{}</footer>", self.name()))),
            "broken" => Err(HookError::new(hook, "shop refuses")),
            _ => Ok(None),
        }
    }
}

pub struct BlogPlugin {
    base: ThemeBase,
}

impl Plugin for BlogPlugin {
    fn base(&self) -> &ThemeBase {
        &self.base
    }

    fn install(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn uninstall(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn declared_info(&self) -> InfoMap {
        let mut info = InfoMap::new();
        info.insert("author".into(), json!("blog team"));
        info
    }
}

pub struct IndexController {
    base: ThemeBase,
}

impl Controller for IndexController {
    fn actions() -> Actions<Self> {
        Actions::new()
            .action("index", Self::index)
            .action("hello", Self::hello)
            .action("settings", Self::settings)
            .empty(Self::missing)
    }
}

impl IndexController {
    fn index(&mut self, ctx: &mut RequestContext) -> ActionResult {
        let view = ctx.extensions.get_required::<ViewContext>()?;
        let html = view.fetch("", &json!({ "theme": ctx.theme }))?;
        Ok(Response::Html(html))
    }

    fn hello(&mut self, ctx: &mut RequestContext) -> ActionResult {
        let who = ctx.query.get("who").cloned().unwrap_or_else(|| "world".into());
        Ok(Response::Json(json!({ "hello": who, "id": ctx.param("id") })))
    }

    fn settings(&mut self, _ctx: &mut RequestContext) -> ActionResult {
        Ok(Response::Json(serde_json::Value::Object(self.base.config(false)?)))
    }

    fn missing(&mut self, _ctx: &mut RequestContext, action: &str) -> ActionResult {
        Ok(Response::Html(format!("missing:{}", action)))
    }
}

pub struct GoodsController;

impl Controller for GoodsController {
    fn actions() -> Actions<Self> {
        Actions::new().action("list", |_, ctx| {
            Ok(Response::Html(format!("goods of {}", ctx.theme)))
        })
    }
}

/// A temporary application root.
pub struct Fixture {
    pub dir: TempDir,
    pub counters: Arc<Counters>,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
            counters: Arc::new(Counters::default()),
        };
        fixture.write(
            "theme/shop/info.ini",
            "name = shop\ntitle = Shop\nversion = 1.0.0\nstatus = 1\n",
        );
        fixture.write(
            "theme/shop/config.yaml",
            "title:\n  label: Site title\n  type: text\n  value: My Shop\nper_page:\n  label: Per page\n  type: number\n  value: 20\n",
        );
        fixture.write(
            "theme/shop/view/index/index.html",
            "<h1>{{ theme }} home</h1>",
        );
        fixture.write("theme/blog/info.ini", "name = blog\nstatus = 0\n");
        fixture.write("theme/ghost/info.ini", "name = ghost\nstatus = 1\n");
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn shop(&self) -> ThemeModule {
        let plugins = Arc::clone(&self.counters);
        let controllers = Arc::clone(&self.counters);
        ThemeModule::new("shop", move |base| {
            plugins.plugins.fetch_add(1, Ordering::SeqCst);
            ShopPlugin {
                base,
                counters: Arc::clone(&plugins),
            }
        })
        .controller("index", move |base| {
            controllers.controllers.fetch_add(1, Ordering::SeqCst);
            IndexController { base }
        })
        .controller("goods", |_| GoodsController)
    }

    pub fn blog(&self) -> ThemeModule {
        let controllers = Arc::clone(&self.counters);
        ThemeModule::new("blog", |base| BlogPlugin { base }).controller("index", move |base| {
            controllers.controllers.fetch_add(1, Ordering::SeqCst);
            IndexController { base }
        })
    }

    pub fn app(&self, config: AppConfig) -> App {
        self.try_app(config).unwrap()
    }

    pub fn try_app(&self, config: AppConfig) -> Result<App, themekit::ThemeError> {
        App::builder()
            .root(self.root())
            .config(config)
            .theme(self.shop())
            .theme(self.blog())
            .build()
    }
}

/// Configuration with `shop` as the active theme.
pub fn shop_config() -> AppConfig {
    AppConfig::from_toml(
        r#"
        [theme]
        name = "shop"

        [theme.route]
        "/" = "shop/index/index"
        "hello/:id" = "shop/index/hello"
        "#,
    )
    .unwrap()
}

/// Records the name of every event fired on `events` from now on.
pub fn record(events: &EventBus, names: &[&'static str]) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for name in names {
        let seen = Arc::clone(&seen);
        let name = *name;
        events.listen(name, move |event: &Event<'_>| {
            let entry = match event {
                Event::Action(target) => format!("{}:{}", name, target),
                _ => name.to_string(),
            };
            seen.lock().unwrap().push(entry);
            Ok(None)
        });
    }
    seen
}
