//! Controller action tables.
//!
//! A theme controller does not expose its actions through reflection. Each
//! controller type declares an [`Actions`] table once: a set of named action
//! handlers plus an optional empty-action handler that receives the
//! requested action name when no named handler matches.
//!
//! ```rust
//! use themekit_dispatch::{ActionResult, Actions, Controller, RequestContext, Response};
//!
//! struct Index { greeting: String }
//!
//! impl Index {
//!     fn index(&mut self, _ctx: &mut RequestContext) -> ActionResult {
//!         Ok(Response::Html(self.greeting.clone()))
//!     }
//!
//!     fn fallback(&mut self, _ctx: &mut RequestContext, action: &str) -> ActionResult {
//!         Ok(Response::Html(format!("no page named {action}")))
//!     }
//! }
//!
//! impl Controller for Index {
//!     fn actions() -> Actions<Self> {
//!         Actions::new().action("index", Self::index).empty(Self::fallback)
//!     }
//! }
//! ```
//!
//! Action lookup is case-insensitive; the registered spelling is what the
//! [`ActionTarget`] reports.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::context::RequestContext;

/// What an action produces. Returned to the host unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Rendered markup or text.
    Html(String),
    /// Structured data for the host to serialize.
    Json(serde_json::Value),
    /// No body.
    Empty,
}

impl Response {
    /// Serializes `data` into a [`Response::Json`].
    pub fn json<T: Serialize>(data: &T) -> Result<Self, serde_json::Error> {
        Ok(Response::Json(serde_json::to_value(data)?))
    }

    /// Returns the body if this is an HTML response.
    pub fn as_html(&self) -> Option<&str> {
        match self {
            Response::Html(body) => Some(body),
            _ => None,
        }
    }

    /// Returns true if this response has no body.
    pub fn is_empty(&self) -> bool {
        matches!(self, Response::Empty)
    }
}

impl From<String> for Response {
    fn from(body: String) -> Self {
        Response::Html(body)
    }
}

/// The result type for controller actions.
pub type ActionResult = Result<Response, anyhow::Error>;

/// A named action handler.
pub type ActionFn<C> = fn(&mut C, &mut RequestContext) -> ActionResult;

/// The catch-all handler; receives the requested action name.
pub type EmptyActionFn<C> = fn(&mut C, &mut RequestContext, &str) -> ActionResult;

/// Action table for one controller type.
pub struct Actions<C> {
    named: HashMap<String, (String, ActionFn<C>)>,
    empty: Option<EmptyActionFn<C>>,
}

impl<C> Actions<C> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            named: HashMap::new(),
            empty: None,
        }
    }

    /// Registers a named action.
    pub fn action(mut self, name: &str, handler: ActionFn<C>) -> Self {
        self.named
            .insert(name.to_lowercase(), (name.to_string(), handler));
        self
    }

    /// Registers the empty-action fallback.
    pub fn empty(mut self, handler: EmptyActionFn<C>) -> Self {
        self.empty = Some(handler);
        self
    }

    /// Returns true if a named action matches.
    pub fn has_action(&self, name: &str) -> bool {
        self.named.contains_key(&name.to_lowercase())
    }

    /// Returns true if an empty-action fallback is registered.
    pub fn has_empty(&self) -> bool {
        self.empty.is_some()
    }

    /// Registered action names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.named.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Option<Call<C>> {
        if let Some((method, handler)) = self.named.get(&name.to_lowercase()) {
            return Some(Call::Named(method.clone(), *handler));
        }
        self.empty.map(Call::Empty)
    }
}

impl<C> Default for Actions<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Actions<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actions")
            .field("named", &self.names())
            .field("empty", &self.empty.is_some())
            .finish()
    }
}

enum Call<C> {
    Named(String, ActionFn<C>),
    Empty(EmptyActionFn<C>),
}

/// Implemented by every theme controller type.
pub trait Controller: Sized + 'static {
    /// Builds the action table. Called once per controller type at
    /// registration time.
    fn actions() -> Actions<Self>;
}

/// Name of the empty-action handler as reported in [`ActionTarget::method`].
pub const EMPTY_ACTION: &str = "_empty";

/// Describes a resolved action: which class, which method, which arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionTarget {
    /// Fully qualified controller class id.
    pub class: String,
    /// Method that will run ([`EMPTY_ACTION`] for the fallback).
    pub method: String,
    /// Positional arguments passed to the method.
    pub args: Vec<String>,
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}()", self.class, self.method)
    }
}

/// An action bound to its controller instance, ready to invoke.
pub struct BoundAction {
    target: ActionTarget,
    invoke: Box<dyn FnOnce(&mut RequestContext) -> ActionResult>,
}

impl BoundAction {
    /// The resolved target.
    pub fn target(&self) -> &ActionTarget {
        &self.target
    }

    /// Runs the action.
    pub fn invoke(self, ctx: &mut RequestContext) -> ActionResult {
        (self.invoke)(ctx)
    }
}

impl fmt::Debug for BoundAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAction")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// A type-erased controller instance.
pub trait ControllerObject {
    /// Fully qualified class id of the controller.
    fn class_name(&self) -> &str;

    /// Binds `action` to this instance, falling back to the empty action.
    /// Returns `None` when neither exists.
    fn bind(self: Box<Self>, action: &str) -> Option<BoundAction>;
}

struct Instance<C> {
    class: String,
    controller: C,
    actions: Arc<Actions<C>>,
}

impl<C: Controller> ControllerObject for Instance<C> {
    fn class_name(&self) -> &str {
        &self.class
    }

    fn bind(self: Box<Self>, action: &str) -> Option<BoundAction> {
        let Instance {
            class,
            mut controller,
            actions,
        } = *self;
        match actions.lookup(action)? {
            Call::Named(method, handler) => Some(BoundAction {
                target: ActionTarget {
                    class,
                    method,
                    args: Vec::new(),
                },
                invoke: Box::new(move |ctx: &mut RequestContext| {
                    handler(&mut controller, ctx)
                }),
            }),
            Call::Empty(handler) => {
                let requested = action.to_string();
                Some(BoundAction {
                    target: ActionTarget {
                        class,
                        method: EMPTY_ACTION.to_string(),
                        args: vec![requested.clone()],
                    },
                    invoke: Box::new(move |ctx: &mut RequestContext| {
                        handler(&mut controller, ctx, &requested)
                    }),
                })
            }
        }
    }
}

/// Erases a controller instance together with its shared action table.
pub fn into_object<C: Controller>(
    class: impl Into<String>,
    controller: C,
    actions: Arc<Actions<C>>,
) -> Box<dyn ControllerObject> {
    Box::new(Instance {
        class: class.into(),
        controller,
        actions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        hits: u32,
    }

    impl Counter {
        fn index(&mut self, _ctx: &mut RequestContext) -> ActionResult {
            self.hits += 1;
            Ok(Response::Html(format!("hits={}", self.hits)))
        }

        fn fallback(&mut self, _ctx: &mut RequestContext, action: &str) -> ActionResult {
            Ok(Response::Html(format!("fallback:{}", action)))
        }
    }

    impl Controller for Counter {
        fn actions() -> Actions<Self> {
            Actions::new()
                .action("index", Self::index)
                .empty(Self::fallback)
        }
    }

    struct Strict;

    impl Controller for Strict {
        fn actions() -> Actions<Self> {
            Actions::new()
        }
    }

    fn counter() -> Box<dyn ControllerObject> {
        into_object(
            "themes::shop::controller::Index",
            Counter { hits: 0 },
            Arc::new(Counter::actions()),
        )
    }

    #[test]
    fn test_named_action_binds_without_args() {
        let bound = counter().bind("index").unwrap();
        assert_eq!(bound.target().method, "index");
        assert!(bound.target().args.is_empty());

        let mut ctx = RequestContext::default();
        let response = bound.invoke(&mut ctx).unwrap();
        assert_eq!(response, Response::Html("hits=1".into()));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let bound = counter().bind("INDEX").unwrap();
        assert_eq!(bound.target().method, "index");
    }

    #[test]
    fn test_missing_action_falls_back_to_empty() {
        let bound = counter().bind("missingAction").unwrap();
        assert_eq!(bound.target().method, EMPTY_ACTION);
        assert_eq!(bound.target().args, vec!["missingAction".to_string()]);

        let mut ctx = RequestContext::default();
        let response = bound.invoke(&mut ctx).unwrap();
        assert_eq!(response.as_html(), Some("fallback:missingAction"));
    }

    #[test]
    fn test_no_action_and_no_fallback() {
        let object = into_object(
            "themes::shop::controller::Strict",
            Strict,
            Arc::new(Strict::actions()),
        );
        assert_eq!(object.class_name(), "themes::shop::controller::Strict");
        assert!(object.bind("index").is_none());
    }

    #[test]
    fn test_action_target_display() {
        let target = ActionTarget {
            class: "themes::shop::controller::Index".into(),
            method: "list".into(),
            args: vec![],
        };
        assert_eq!(target.to_string(), "themes::shop::controller::Index->list()");
    }

    #[test]
    fn test_actions_introspection() {
        let actions = Counter::actions();
        assert!(actions.has_action("Index"));
        assert!(!actions.has_action("list"));
        assert!(actions.has_empty());
        assert_eq!(actions.names(), vec!["index"]);
    }
}
