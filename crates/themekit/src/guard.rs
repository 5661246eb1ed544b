//! Middleware restricting themed routes to the configured active theme.

use std::sync::Arc;

use themekit_dispatch::{Event, EventBus, RequestContext, Response, THEME_MIDDLEWARE};
use tracing::debug;

use crate::descriptor::is_enabled;
use crate::error::ThemeError;
use crate::registry::ThemeRegistry;

/// A step shared by every themed route. Runs after the guard's checks and
/// may update the request or reject it.
pub type Middleware = Arc<dyn Fn(&mut RequestContext) -> Result<(), ThemeError> + Send + Sync>;

/// Rejects requests for anything but the active, enabled theme.
#[derive(Clone)]
pub struct ThemeGuard {
    active: Option<String>,
    registry: Arc<ThemeRegistry>,
    events: Arc<EventBus>,
    ignore_case: bool,
    middleware: Vec<Middleware>,
}

impl ThemeGuard {
    /// Creates a guard for `active` (`theme.name`).
    pub fn new(
        active: Option<String>,
        registry: Arc<ThemeRegistry>,
        events: Arc<EventBus>,
        ignore_case: bool,
    ) -> Self {
        Self {
            active: active
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty()),
            registry,
            events,
            ignore_case,
            middleware: Vec::new(),
        }
    }

    /// Runs `middleware`, in order, before handing over to the dispatcher.
    pub fn with_middleware(mut self, middleware: Vec<Middleware>) -> Self {
        self.middleware = middleware;
        self
    }

    /// The active theme, if one is configured.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Checks the request's `theme` parameter, fires [`THEME_MIDDLEWARE`],
    /// runs the shared middleware and hands over to `next`.
    pub fn handle<F>(&self, ctx: &mut RequestContext, next: F) -> Result<Response, ThemeError>
    where
        F: FnOnce(&mut RequestContext) -> Result<Response, ThemeError>,
    {
        let active = self.active.as_deref().ok_or(ThemeError::NoActiveTheme)?;
        let requested = ctx.param("theme").unwrap_or_default().trim();
        let same = if self.ignore_case {
            requested.eq_ignore_ascii_case(active)
        } else {
            requested == active
        };
        if !same {
            debug!(requested, active, "request for inactive theme");
            return Err(ThemeError::ThemeNotFound(requested.to_string()));
        }

        let info = self.registry.theme_info(active)?;
        if info.is_empty() {
            return Err(ThemeError::ThemeNotFound(active.to_string()));
        }
        if !is_enabled(&info) {
            return Err(ThemeError::ThemeDisabled(active.to_string()));
        }

        self.events.trigger(THEME_MIDDLEWARE, Event::Request(ctx))?;
        for step in &self.middleware {
            step(ctx)?;
        }
        next(ctx)
    }
}

impl std::fmt::Debug for ThemeGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeGuard")
            .field("active", &self.active)
            .field("ignore_case", &self.ignore_case)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}
