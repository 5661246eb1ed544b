//! Named event hooks.
//!
//! Themes and the host subscribe listeners to event names; the dispatcher
//! and middleware fire them at fixed points of a request:
//!
//! ```text
//! request
//!   → theme_middleware      (guard passed)
//!   → themes_begin          (before validation)
//!   → theme_module_init     (theme resolved and enabled)
//!   → themes_action_begin   (action bound, about to run)
//!   → action
//! ```
//!
//! Listeners run in registration order. A listener error aborts the
//! trigger and is propagated to the caller; nothing is swallowed.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tracing::trace;

use crate::context::RequestContext;
use crate::controller::ActionTarget;

/// Fired first by the dispatcher, before the target is validated.
pub const THEMES_BEGIN: &str = "themes_begin";
/// Fired once the theme is known to exist and be enabled.
pub const THEME_MODULE_INIT: &str = "theme_module_init";
/// Fired with the bound action just before it runs.
pub const THEMES_ACTION_BEGIN: &str = "themes_action_begin";
/// Fired by the guard middleware after its checks pass.
pub const THEME_MIDDLEWARE: &str = "theme_middleware";
/// Fired at bootstrap for every theme subscribed to it.
pub const THEME_INIT: &str = "ThemeInit";

/// Payload handed to listeners.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    /// The in-flight request.
    Request(&'a RequestContext),
    /// The action about to run.
    Action(&'a ActionTarget),
    /// A theme name (bootstrap events).
    Theme(&'a str),
    /// Arbitrary data from `hook()` callers.
    Data(&'a serde_json::Value),
    /// No payload.
    None,
}

impl<'a> Event<'a> {
    /// Returns the request if this is a request event.
    pub fn request(&self) -> Option<&'a RequestContext> {
        match *self {
            Event::Request(ctx) => Some(ctx),
            _ => None,
        }
    }
}

/// Error returned by a listener.
#[derive(Debug, Error)]
#[error("hook error ({event}): {message}")]
pub struct HookError {
    /// Event being fired when the error occurred.
    pub event: String,
    /// Human-readable error message.
    pub message: String,
    /// The underlying error, if any.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl HookError {
    /// Creates a hook error for `event`.
    pub fn new(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Sets the source error.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        self.source = Some(source.into());
        self
    }
}

/// A listener. `Some(text)` contributes to the joined output of [`EventBus::hook`].
pub type Listener = Arc<dyn Fn(&Event<'_>) -> Result<Option<String>, HookError> + Send + Sync>;

/// Registry of listeners keyed by event name.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a listener to `event`.
    pub fn listen<F>(&self, event: &str, listener: F)
    where
        F: Fn(&Event<'_>) -> Result<Option<String>, HookError> + Send + Sync + 'static,
    {
        self.listen_arc(event, Arc::new(listener));
    }

    /// Subscribes an already shared listener.
    pub fn listen_arc(&self, event: &str, listener: Listener) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    /// Subscribes many listeners at once.
    pub fn listen_events<I>(&self, listeners: I)
    where
        I: IntoIterator<Item = (String, Listener)>,
    {
        let mut map = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for (event, listener) in listeners {
            map.entry(event).or_default().push(listener);
        }
    }

    /// Fires `event`, collecting the text each listener returned.
    ///
    /// Listeners are snapshotted before running so they may subscribe
    /// further listeners without deadlocking.
    pub fn trigger(&self, event: &str, payload: Event<'_>) -> Result<Vec<String>, HookError> {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        trace!(event, listeners = snapshot.len(), "triggering event");
        let mut results = Vec::new();
        for listener in snapshot {
            if let Some(text) = listener(&payload)? {
                results.push(text);
            }
        }
        Ok(results)
    }

    /// Fires `event` and joins the listeners' output into one string.
    pub fn hook(&self, event: &str, payload: Event<'_>) -> Result<String, HookError> {
        Ok(self.trigger(event, payload)?.join(""))
    }

    /// Number of listeners subscribed to `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }

    /// Returns true if `event` has at least one listener.
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut counts: Vec<(&String, usize)> = map.iter().map(|(k, v)| (k, v.len())).collect();
        counts.sort();
        f.debug_struct("EventBus").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_trigger_without_listeners() {
        let bus = EventBus::new();
        assert!(bus.trigger("nothing", Event::None).unwrap().is_empty());
        assert!(!bus.has_listeners("nothing"));
    }

    #[test]
    fn test_listeners_run_in_order_and_join() {
        let bus = EventBus::new();
        bus.listen("footer", |_| Ok(Some("a".into())));
        bus.listen("footer", |_| Ok(None));
        bus.listen("footer", |_| Ok(Some("b".into())));

        assert_eq!(bus.trigger("footer", Event::None).unwrap(), vec!["a", "b"]);
        assert_eq!(bus.hook("footer", Event::None).unwrap(), "ab");
        assert_eq!(bus.listener_count("footer"), 3);
    }

    #[test]
    fn test_data_payload_reaches_listeners() {
        let bus = EventBus::new();
        bus.listen("page_footer", |event| match event {
            Event::Data(data) => Ok(data["year"].as_u64().map(|year| format!("(c) {}", year))),
            _ => Ok(None),
        });

        let data = serde_json::json!({"year": 2024});
        assert_eq!(bus.hook("page_footer", Event::Data(&data)).unwrap(), "(c) 2024");
        assert_eq!(bus.hook("page_footer", Event::None).unwrap(), "");
    }

    #[test]
    fn test_error_stops_later_listeners() {
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let after = calls.clone();
        bus.listen(THEMES_BEGIN, |_| Err(HookError::new(THEMES_BEGIN, "boom")));
        bus.listen(THEMES_BEGIN, move |_| {
            after.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        });

        let err = bus.trigger(THEMES_BEGIN, Event::None).unwrap_err();
        assert_eq!(err.event, THEMES_BEGIN);
        assert_eq!(err.to_string(), "hook error (themes_begin): boom");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_listener_sees_request_payload() {
        let bus = EventBus::new();
        bus.listen(THEME_MIDDLEWARE, |event| {
            Ok(event.request().map(|ctx| ctx.path.clone()))
        });
        let ctx = RequestContext::new("/themes/shop");
        let out = bus.hook(THEME_MIDDLEWARE, Event::Request(&ctx)).unwrap();
        assert_eq!(out, "/themes/shop");
    }

    #[test]
    fn test_listen_events_batch() {
        let bus = EventBus::new();
        fn constant(_: &Event<'_>) -> Result<Option<String>, HookError> {
            Ok(Some("x".into()))
        }
        let listener: Listener = Arc::new(constant);
        bus.listen_events(vec![
            ("a".to_string(), listener.clone()),
            ("b".to_string(), listener.clone()),
            ("a".to_string(), listener),
        ]);
        assert_eq!(bus.listener_count("a"), 2);
        assert_eq!(bus.listener_count("b"), 1);
    }

    #[test]
    fn test_listener_may_subscribe_while_running() {
        let bus = Arc::new(EventBus::new());
        let inner = bus.clone();
        bus.listen("grow", move |_| {
            inner.listen("grow", |_| Ok(None));
            Ok(None)
        });
        bus.trigger("grow", Event::None).unwrap();
        assert_eq!(bus.listener_count("grow"), 2);
    }
}
