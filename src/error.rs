//! Error types for jellyfetch.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for jellyfetch.
#[derive(Error, Debug)]
pub enum Error {
    // Catalog errors
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Missing field {field} on item {item}")]
    MissingField { item: String, field: &'static str },

    // Transfer errors
    #[error("Transfer failed for {path}: {message}")]
    Transfer { path: String, message: String },

    #[error("Write failed for {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cancelled")]
    Cancelled,

    // Interactive errors
    #[error("Prompt failed: {0}")]
    Prompt(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // TOML errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Create a transfer error for a destination path.
    pub fn transfer<P: Into<String>, M: std::fmt::Display>(path: P, message: M) -> Self {
        Error::Transfer {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Wrap an IO error raised while writing `path`.
    pub fn write<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Error::Write {
            path: path.into(),
            source,
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Prompt(e.to_string())
    }
}
