//! View rendering for themekit.
//!
//! Themes render views from their own `view/` directory. This crate provides
//! the pieces the dispatcher and theme entities need for that:
//!
//! - [`TemplateEngine`]: backend abstraction, implemented by [`MiniJinjaEngine`]
//! - [`ViewContext`]: a view directory plus assigned variables, with
//!   `fetch` (render a template file), `display` (render inline content) and
//!   `assign` (bind a variable)
//! - [`RenderError`]: the error type for all of the above
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use themekit_render::{MiniJinjaEngine, ViewContext};
//!
//! let mut view = ViewContext::new("theme/shop/view", Arc::new(MiniJinjaEngine::new()))
//!     .with_scope("index", "index");
//! view.assign("title", "Shop")?;
//! let html = view.fetch("", &serde_json::Value::Null)?; // theme/shop/view/index/index.html
//! ```

mod engine;
mod error;
mod view;

pub use engine::{MiniJinjaEngine, TemplateEngine};
pub use error::RenderError;
pub use view::{ViewContext, TEMPLATE_EXTENSIONS};
