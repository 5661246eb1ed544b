//! Template engine abstraction.
//!
//! [`TemplateEngine`] is the seam between themekit and a template backend.
//! The default implementation is [`MiniJinjaEngine`].

use minijinja::{Environment, Value};
use serde_json::Map;

use crate::error::RenderError;

/// A template engine that can render template source with data.
///
/// Engines are shared between every view context of a process, so they must
/// be `Send + Sync` and render through `&self`.
pub trait TemplateEngine: Send + Sync {
    /// Renders template source with the given data.
    fn render_template(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> Result<String, RenderError>;

    /// Renders template source with previously assigned variables merged in.
    ///
    /// Keys in `data` take precedence over keys in `context`. Non-object
    /// `data` is ignored.
    fn render_with_context(
        &self,
        template: &str,
        data: &serde_json::Value,
        context: &Map<String, serde_json::Value>,
    ) -> Result<String, RenderError> {
        let mut combined = context.clone();
        if let serde_json::Value::Object(map) = data {
            for (key, value) in map {
                combined.insert(key.clone(), value.clone());
            }
        }
        self.render_template(template, &serde_json::Value::Object(combined))
    }
}

/// MiniJinja-based template engine.
///
/// # Example
///
/// ```rust
/// use themekit_render::{MiniJinjaEngine, TemplateEngine};
/// use serde_json::json;
///
/// let engine = MiniJinjaEngine::new();
/// let output = engine
///     .render_template("Hello, {{ name }}!", &json!({"name": "World"}))
///     .unwrap();
/// assert_eq!(output, "Hello, World!");
/// ```
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// Creates a new engine with a default environment.
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
        }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MiniJinjaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiniJinjaEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine for MiniJinjaEngine {
    fn render_template(
        &self,
        template: &str,
        data: &serde_json::Value,
    ) -> Result<String, RenderError> {
        let value = Value::from_serialize(data);
        Ok(self.env.render_str(template, value)?)
    }
}
