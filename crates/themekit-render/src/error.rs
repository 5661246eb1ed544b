//! Error types for view rendering.
//!
//! [`RenderError`] is the single error type returned by the engine and by
//! [`ViewContext`](crate::ViewContext). It hides the underlying template
//! engine's error type behind a stable API.

use std::fmt;
use std::path::PathBuf;

/// Error type for view rendering operations.
#[derive(Debug)]
pub enum RenderError {
    /// Template syntax error or evaluation failure.
    TemplateError(String),

    /// No template file matched the requested name.
    TemplateNotFound {
        /// The name the caller asked for.
        name: String,
        /// The view directory that was searched.
        view_path: PathBuf,
    },

    /// Template variables could not be serialized.
    SerializationError(String),

    /// I/O error while reading a template from disk.
    IoError(std::io::Error),

    /// Other engine failure.
    OperationError(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::TemplateError(msg) => write!(f, "template error: {}", msg),
            RenderError::TemplateNotFound { name, view_path } => write!(
                f,
                "template not found: {} (searched {})",
                name,
                view_path.display()
            ),
            RenderError::SerializationError(msg) => write!(f, "serialization error: {}", msg),
            RenderError::IoError(err) => write!(f, "I/O error: {}", err),
            RenderError::OperationError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::IoError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::IoError(err)
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::SerializationError(err.to_string())
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::SyntaxError
            | ErrorKind::BadEscape
            | ErrorKind::UndefinedError
            | ErrorKind::UnknownTest
            | ErrorKind::UnknownFunction
            | ErrorKind::UnknownFilter
            | ErrorKind::UnknownMethod => RenderError::TemplateError(err.to_string()),
            ErrorKind::BadSerialization => RenderError::SerializationError(err.to_string()),
            _ => RenderError::OperationError(err.to_string()),
        }
    }
}
