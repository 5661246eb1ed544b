//! Error types for theme resolution, dispatch and setup.

use std::fmt;
use std::path::PathBuf;

use themekit_dispatch::HookError;
use themekit_render::RenderError;
use thiserror::Error;

/// HTTP-style status a failure maps to when handed back to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 500
    InternalServerError,
}

impl HttpStatus {
    /// Numeric status code.
    pub fn code(self) -> u16 {
        match self {
            HttpStatus::BadRequest => 400,
            HttpStatus::NotFound => 404,
            HttpStatus::InternalServerError => 500,
        }
    }
}

impl fmt::Display for HttpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            HttpStatus::BadRequest => "Bad Request",
            HttpStatus::NotFound => "Not Found",
            HttpStatus::InternalServerError => "Internal Server Error",
        };
        write!(f, "{} {}", self.code(), reason)
    }
}

/// Error type for everything between route matching and the action's return.
#[derive(Debug, Error)]
pub enum ThemeError {
    /// Theme, controller or action was empty after normalization.
    #[error("theme can not be empty")]
    EmptyTarget,

    /// No theme is registered under the name, or its info is empty.
    #[error("theme {0} not found")]
    ThemeNotFound(String),

    /// The theme's `status` is missing or falsy.
    #[error("theme {0} is disabled")]
    ThemeDisabled(String),

    /// No controller is registered under the resolved class id.
    #[error("theme controller {0} not found")]
    ControllerNotFound(String),

    /// The controller has neither the action nor an empty-action fallback.
    #[error("theme action {0} not found")]
    ActionNotFound(String),

    /// The guard found no active theme in the configuration.
    #[error("no theme configured")]
    NoActiveTheme,

    /// No route rule matched the request.
    #[error("no route matches {0}")]
    RouteNotFound(String),

    /// A hook listener failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// The action itself failed.
    #[error(transparent)]
    Action(anyhow::Error),

    /// A theme view failed to render.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// `info.ini` exists but could not be parsed.
    #[error("failed to read theme info {}: {message}", .path.display())]
    Info {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// `config.yaml` exists but could not be parsed.
    #[error("invalid theme settings {}: {message}", .path.display())]
    Settings {
        /// Path of the offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Application configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem failure during bootstrap.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ThemeError {
    /// The status the host should answer with.
    pub fn status(&self) -> HttpStatus {
        match self {
            ThemeError::EmptyTarget => HttpStatus::BadRequest,
            ThemeError::ThemeNotFound(_)
            | ThemeError::ThemeDisabled(_)
            | ThemeError::ControllerNotFound(_)
            | ThemeError::ActionNotFound(_)
            | ThemeError::NoActiveTheme
            | ThemeError::RouteNotFound(_) => HttpStatus::NotFound,
            ThemeError::Hook(_)
            | ThemeError::Action(_)
            | ThemeError::Render(_)
            | ThemeError::Info { .. }
            | ThemeError::Settings { .. }
            | ThemeError::Config(_)
            | ThemeError::Io(_) => HttpStatus::InternalServerError,
        }
    }
}

impl From<config::ConfigError> for ThemeError {
    fn from(err: config::ConfigError) -> Self {
        ThemeError::Config(err.to_string())
    }
}

/// Errors from the `themes:*` commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The destination config file is already present.
    #[error("The config file \"{}\" already exists", .0.display())]
    AlreadyExists(PathBuf),

    /// The destination could not be created or written.
    #[error("The config file \"{}\" could not be written: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
