//! Request dispatch primitives for themekit.
//!
//! `themekit-dispatch` holds the request-level types shared by the theme
//! dispatcher, the guard middleware and theme controllers. It knows nothing
//! about themes, registries or templates.
//!
//! # Core Types
//!
//! - [`RequestContext`]: the per-request dispatch context and its [`Extensions`]
//! - [`Controller`] / [`Actions`]: explicit per-controller action tables,
//!   with an optional empty-action fallback
//! - [`ControllerObject`] / [`BoundAction`]: a type-erased controller instance
//!   and an action bound to it
//! - [`Response`] / [`ActionResult`]: what actions return
//! - [`EventBus`] / [`HookError`]: named lifecycle hooks
//!
//! ```rust
//! use themekit_dispatch::{Event, EventBus, THEMES_BEGIN};
//!
//! let bus = EventBus::new();
//! bus.listen(THEMES_BEGIN, |event| {
//!     Ok(event.request().map(|ctx| format!("begin {}", ctx.path)))
//! });
//! let ctx = themekit_dispatch::RequestContext::new("/themes/shop");
//! assert_eq!(bus.hook(THEMES_BEGIN, Event::Request(&ctx)).unwrap(), "begin /themes/shop");
//! ```

mod context;
mod controller;
mod hooks;

pub use context::{Extensions, RequestContext};

pub use controller::{
    into_object, ActionFn, ActionResult, ActionTarget, Actions, BoundAction, Controller,
    ControllerObject, EmptyActionFn, Response, EMPTY_ACTION,
};

pub use hooks::{
    Event, EventBus, HookError, Listener, THEMES_ACTION_BEGIN, THEMES_BEGIN, THEME_INIT,
    THEME_MIDDLEWARE, THEME_MODULE_INIT,
};
