//! # Themekit - multi-theme request dispatch
//!
//! Themekit lets an application ship several self-contained themes and serve
//! the active one under `/themes/<theme>/<controller>/<action>`. A theme is a
//! directory below `<root>/theme/` holding:
//!
//! - `info.ini`: metadata; `status` must be truthy for the theme to be served
//! - `config.yaml`: settings descriptors for an admin UI
//! - `view/`: templates rendered with MiniJinja
//!
//! plus compiled-in code registered as a [`ThemeModule`]: a [`Plugin`] entry
//! point and any number of [`Controller`](themekit_dispatch::Controller)s.
//!
//! ## Request flow
//!
//! ```text
//! Request ─► Router ─► ThemeGuard (catch-all only) ─► Dispatcher ─► action
//! ```
//!
//! - [`Router`]: matches `themes/:theme/:controller?/:action?` and the named
//!   routes from `theme.route`
//! - [`ThemeGuard`]: only the configured `theme.name` passes, and only while enabled
//! - [`Dispatcher`]: resolves the controller class, binds the action (or the
//!   controller's empty-action fallback) and runs it
//!
//! Events fire at fixed points (`themes_begin`, `theme_module_init`,
//! `themes_action_begin`, `theme_middleware`); themes subscribe through
//! `theme.hooks` or [`Plugin::hooks`].
//!
//! ## Quick start
//!
//! ```ignore
//! use themekit::{App, Plugin, Request, ThemeBase, ThemeModule};
//! use themekit_dispatch::{Actions, Controller, Response};
//!
//! struct Shop { base: ThemeBase }
//!
//! impl Plugin for Shop {
//!     fn base(&self) -> &ThemeBase { &self.base }
//!     fn install(&self) -> anyhow::Result<()> { Ok(()) }
//!     fn uninstall(&self) -> anyhow::Result<()> { Ok(()) }
//! }
//!
//! struct Index { base: ThemeBase }
//!
//! impl Controller for Index {
//!     fn actions() -> Actions<Self> {
//!         Actions::new().action("index", |c, _| {
//!             Ok(Response::Html(c.base.fetch("index", &serde_json::json!({}))?))
//!         })
//!     }
//! }
//!
//! let app = App::builder()
//!     .root("/srv/site")
//!     .theme(ThemeModule::new("shop", |base| Shop { base })
//!         .controller("index", |base| Index { base }))
//!     .build()?;
//!
//! let page = app.handle(&Request::get("/themes/shop"))?;
//! ```

pub mod app;
pub mod command;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod guard;
pub mod logging;
pub mod naming;
pub mod registry;
pub mod router;
pub mod service;
pub mod settings;
pub mod store;
pub mod theme;
pub mod url;

/// Directory below the application root holding the themes.
pub const THEMES_DIR: &str = "theme";

/// Directory below the application root holding `themes.toml`.
pub const CONFIG_DIR: &str = "config";

pub use app::{App, AppBuilder};
pub use descriptor::{is_enabled, InfoMap, SettingDescriptor};
pub use dispatcher::Dispatcher;
pub use error::{CommandError, HttpStatus, ThemeError};
pub use guard::{Middleware, ThemeGuard};
pub use registry::{class_id, ClassKind, ThemeModule, ThemeRegistry};
pub use router::{Request, RouteMatch, RoutePattern, RouteRule, RouteTarget, Router};
pub use service::{HookCache, HookTable, ServiceBindings};
pub use settings::AppConfig;
pub use store::ConfigStore;
pub use theme::{Plugin, ThemeBase, ThemeEnv};
pub use url::UrlBuilder;
