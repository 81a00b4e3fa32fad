//! Common error type used throughout satsnap.
//!
//! Every failure carries enough information for the HTTP layer to derive a
//! status code via [`Error::http_status`].

use std::fmt;

/// Common error type for satsnap.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity was not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "image").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The imagery provider failed or returned nothing usable.
    #[error("Upstream error [{provider}]: {message}")]
    Upstream {
        /// Name of the provider that failed.
        provider: String,
        /// Human-readable error description.
        message: String,
    },

    /// Raster data from the provider could not be decoded.
    #[error("Image error: {0}")]
    Image(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input or configuration was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Upstream { .. } => 502,
            Error::Image(_) => 502,
            Error::Io(_) => 500,
            Error::InvalidInput(_) => 400,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Upstream { .. } => "upstream_error",
            Error::Image(_) => "image_error",
            Error::Io(_) => "io_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Upstream error.
    pub fn upstream(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a new Image error.
    pub fn image<S: Into<String>>(msg: S) -> Self {
        Self::Image(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
