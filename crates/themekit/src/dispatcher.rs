//! Resolves `(theme, controller, action)` to a controller action and runs it.
//!
//! Events fired along the way, in order:
//!
//! 1. [`THEMES_BEGIN`] before anything is validated
//! 2. [`THEME_MODULE_INIT`] once the theme is known to be enabled
//! 3. [`THEMES_ACTION_BEGIN`] with the resolved [`ActionTarget`](themekit_dispatch::ActionTarget)
//!
//! A failing listener aborts the request.

use std::sync::Arc;

use themekit_dispatch::{
    Event, EventBus, RequestContext, Response, THEMES_ACTION_BEGIN, THEMES_BEGIN,
    THEME_MODULE_INIT,
};
use themekit_render::ViewContext;
use tracing::{debug, instrument};

use crate::descriptor::is_enabled;
use crate::error::ThemeError;
use crate::naming::studly;
use crate::registry::{ClassKind, ThemeRegistry};

/// Controller and action used when the request names none.
pub const DEFAULT_TARGET: &str = "index";

/// Runs theme controller actions.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ThemeRegistry>,
    events: Arc<EventBus>,
    url_convert: bool,
}

impl Dispatcher {
    /// Creates a dispatcher. With `url_convert`, names are lower-cased first.
    pub fn new(registry: Arc<ThemeRegistry>, events: Arc<EventBus>, url_convert: bool) -> Self {
        Self {
            registry,
            events,
            url_convert,
        }
    }

    /// Dispatches to `theme`'s `controller::action`.
    ///
    /// Missing controller or action names default to `index`. On success the
    /// context carries the canonical target, the theme's view path and a
    /// [`ViewContext`] scoped to the controller and action.
    #[instrument(skip(self, ctx), fields(path = %ctx.path))]
    pub fn execute(
        &self,
        ctx: &mut RequestContext,
        theme: Option<&str>,
        controller: Option<&str>,
        action: Option<&str>,
    ) -> Result<Response, ThemeError> {
        let theme = self.normalize(theme, "");
        let controller = self.normalize(controller, DEFAULT_TARGET);
        let action = self.normalize(action, DEFAULT_TARGET);

        self.events.trigger(THEMES_BEGIN, Event::Request(ctx))?;

        if theme.is_empty() || controller.is_empty() || action.is_empty() {
            return Err(ThemeError::EmptyTarget);
        }
        ctx.set_target(&theme, &controller, &action);

        let info = self.registry.theme_info(&theme)?;
        if info.is_empty() {
            return Err(ThemeError::ThemeNotFound(theme));
        }
        if !is_enabled(&info) {
            return Err(ThemeError::ThemeDisabled(theme));
        }

        self.events.trigger(THEME_MODULE_INIT, Event::Request(ctx))?;

        let class = self
            .registry
            .resolve_class(&theme, ClassKind::Controller, Some(&controller))
            .ok_or_else(|| ThemeError::ControllerNotFound(studly(&controller)))?;

        let env = self.registry.env();
        let view_path = env.view_path(&theme);
        ctx.view_path = Some(view_path.clone());
        ctx.extensions
            .insert(ViewContext::new(view_path, env.engine()).with_scope(&controller, &action));

        let instance = self
            .registry
            .instantiate_controller(&class, &theme)
            .ok_or_else(|| ThemeError::ControllerNotFound(studly(&controller)))?;
        let bound = instance
            .bind(&action)
            .ok_or_else(|| ThemeError::ActionNotFound(format!("{}->{}()", class, action)))?;

        self.events
            .trigger(THEMES_ACTION_BEGIN, Event::Action(bound.target()))?;

        debug!(target = %bound.target(), "invoking theme action");
        bound.invoke(ctx).map_err(|err| match err.downcast::<ThemeError>() {
            Ok(theme_error) => theme_error,
            Err(other) => ThemeError::Action(other),
        })
    }

    fn normalize(&self, value: Option<&str>, default: &str) -> String {
        match value {
            None | Some("") => default.to_string(),
            Some(value) if self.url_convert => value.trim().to_lowercase(),
            Some(value) => value.trim().to_string(),
        }
    }
}
