//! Per-request dispatch context.
//!
//! [`RequestContext`] carries the resolved theme/controller/action triple,
//! the raw route parameters, and a type-keyed [`Extensions`] map for state
//! the dispatcher or middleware injects (for example the request's view
//! context). One context is created per request and dropped with it.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Type-safe container for injecting custom state into a request.
///
/// # Warning: Clone Behavior
///
/// Cloning an `Extensions` yields an empty map, since `Box<dyn Any>` values
/// cannot be cloned generically.
///
/// # Example
///
/// ```rust
/// use themekit_dispatch::RequestContext;
///
/// struct CurrentUser { id: u64 }
///
/// let mut ctx = RequestContext::new("/themes/shop");
/// ctx.extensions.insert(CurrentUser { id: 7 });
///
/// let user = ctx.extensions.get_required::<CurrentUser>()?;
/// assert_eq!(user.id, 7);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any>>,
}

impl Extensions {
    /// Creates a new empty extensions container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type.
    pub fn insert<T: 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Gets a reference to a value of the specified type.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Gets a mutable reference to a value of the specified type.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Gets a required reference, failing if the type was never inserted.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "Extension missing: type {} not found in context",
                std::any::type_name::<T>()
            )
        })
    }

    /// Removes a value of the specified type, returning it if it existed.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns `true` if a value of the specified type is present.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

impl Clone for Extensions {
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// State of one themed request as it moves through guard and dispatcher.
#[derive(Debug, Default, Clone)]
pub struct RequestContext {
    /// Canonical theme name, set by the dispatcher.
    pub theme: String,
    /// Canonical controller name, set by the dispatcher.
    pub controller: String,
    /// Canonical action name, set by the dispatcher.
    pub action: String,
    /// Route parameters captured by the matched rule (`theme`, `controller`, `action`).
    pub params: BTreeMap<String, String>,
    /// Query string parameters.
    pub query: BTreeMap<String, String>,
    /// Request host, used for domain-scoped routes.
    pub host: Option<String>,
    /// Request path as received.
    pub path: String,
    /// View base path of the dispatched theme (`<themes>/<theme>/view/`).
    pub view_path: Option<PathBuf>,
    /// Request-scoped injected state.
    pub extensions: Extensions,
}

impl RequestContext {
    /// Creates a context for the given request path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Returns a captured route parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Records the canonical dispatch target.
    pub fn set_target(&mut self, theme: &str, controller: &str, action: &str) {
        self.theme = theme.to_string();
        self.controller = controller.to_string();
        self.action = action.to_string();
    }
}
