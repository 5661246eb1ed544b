//! View contexts scoped to one theme's `view/` directory.
//!
//! A [`ViewContext`] owns the view base path, the shared engine, and the
//! variables bound with [`assign`](ViewContext::assign). Each theme entity
//! keeps a private one, and the dispatcher hands every request its own, so
//! the base path is never shared between requests.
//!
//! # Template Resolution
//!
//! | Requested name | Scope set | File looked up |
//! |----------------|-----------|----------------|
//! | `""` | `("index", "list")` | `index/list.<ext>` |
//! | `"edit"` | `("user", _)` | `user/edit.<ext>` |
//! | `"admin/edit"` | any | `admin/edit.<ext>` |
//! | `"edit.html"` | none | `edit.html` |
//!
//! Extensions are tried in [`TEMPLATE_EXTENSIONS`] order.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::engine::TemplateEngine;
use crate::error::RenderError;

/// Recognized template file extensions in priority order.
pub const TEMPLATE_EXTENSIONS: &[&str] = &[".html", ".jinja", ".jinja2", ".j2", ".txt"];

/// Rendering state bound to one view directory.
#[derive(Clone)]
pub struct ViewContext {
    view_path: PathBuf,
    engine: Arc<dyn TemplateEngine>,
    vars: Map<String, Value>,
    scope: Option<(String, String)>,
}

impl ViewContext {
    /// Creates a context rendering templates below `view_path`.
    pub fn new(view_path: impl Into<PathBuf>, engine: Arc<dyn TemplateEngine>) -> Self {
        Self {
            view_path: view_path.into(),
            engine,
            vars: Map::new(),
            scope: None,
        }
    }

    /// Scopes short template names to a controller directory.
    ///
    /// Dotted controller names (`admin.users`) map to nested directories.
    pub fn with_scope(mut self, controller: &str, action: &str) -> Self {
        self.scope = Some((controller.replace('.', "/"), action.to_string()));
        self
    }

    /// The directory templates are resolved against.
    pub fn view_path(&self) -> &Path {
        &self.view_path
    }

    /// Variables bound so far.
    pub fn assigned(&self) -> &Map<String, Value> {
        &self.vars
    }

    /// Binds a variable for every later render through this context.
    pub fn assign(
        &mut self,
        name: impl Into<String>,
        value: impl Serialize,
    ) -> Result<&mut Self, RenderError> {
        self.vars.insert(name.into(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Renders a template file. `vars` override assigned variables.
    pub fn fetch(&self, template: &str, vars: &Value) -> Result<String, RenderError> {
        let path = self.resolve(template)?;
        debug!(template, path = %path.display(), "rendering view template");
        let source = std::fs::read_to_string(&path)?;
        self.engine.render_with_context(&source, vars, &self.vars)
    }

    /// Renders inline template content. `vars` override assigned variables.
    pub fn display(&self, content: &str, vars: &Value) -> Result<String, RenderError> {
        self.engine.render_with_context(content, vars, &self.vars)
    }

    /// Resolves a template name to an existing file below the view path.
    pub fn resolve(&self, template: &str) -> Result<PathBuf, RenderError> {
        let name = self.template_name(template)?;
        let relative = Path::new(&name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(self.not_found(&name));
        }

        let direct = self.view_path.join(relative);
        if TEMPLATE_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) && direct.is_file() {
            return Ok(direct);
        }

        TEMPLATE_EXTENSIONS
            .iter()
            .map(|ext| self.view_path.join(format!("{}{}", name, ext)))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| self.not_found(&name))
    }

    fn template_name(&self, template: &str) -> Result<String, RenderError> {
        let template = template.trim().trim_start_matches('/');
        match &self.scope {
            Some((controller, action)) if template.is_empty() => {
                Ok(format!("{}/{}", controller, action))
            }
            Some((controller, _)) if !template.contains('/') => {
                Ok(format!("{}/{}", controller, template))
            }
            None if template.is_empty() => Err(self.not_found(template)),
            _ => Ok(template.to_string()),
        }
    }

    fn not_found(&self, name: &str) -> RenderError {
        RenderError::TemplateNotFound {
            name: name.to_string(),
            view_path: self.view_path.clone(),
        }
    }
}

impl std::fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewContext")
            .field("view_path", &self.view_path)
            .field("vars", &self.vars.len())
            .field("scope", &self.scope)
            .finish()
    }
}
