//! Error types for tenant user sync

use std::path::PathBuf;
use thiserror::Error;

/// Sync error type
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or inconsistent asset files. Aborts the whole run.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Tenant rejected the API key or the session token expired
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Non-2xx response from the tenant API
    #[error("remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// Transport failure talking to the tenant API
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A declared role does not exist in the tenant
    #[error("role '{0}' is not defined in the tenant")]
    UnknownRole(String),

    /// Asset directory or file could not be written
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// Returns true for configuration errors, which abort the run
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }

    /// Returns true if this is an authentication error
    pub fn is_authentication(&self) -> bool {
        matches!(self, Error::Authentication(_))
    }

    /// Returns true if the tenant rejected the request payload (4xx)
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::RemoteApi { status, .. } if (400..500).contains(status))
    }

    /// Returns true if the failure is likely to go away on a later run (5xx, timeouts)
    pub fn is_transient(&self) -> bool {
        match self {
            Error::RemoteApi { status, .. } => *status >= 500,
            Error::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}

/// Result type for tenant user sync
pub type Result<T> = std::result::Result<T, Error>;
