//! Error types for the tarball library.
//!
//! Only a handful of conditions abort an operation: an archive that cannot be
//! opened, a glob that cannot be compiled, an owner or group that does not
//! exist, and a filesystem primitive that fails.  Everything else the
//! extraction encounters (unsupported entry types, dangling hard links,
//! entries stripped down to nothing) is logged and skipped.

use std::path::PathBuf;

/// Result type alias for operations that may return an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for listing and extraction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source archive could not be opened at all.
    #[error("cannot open archive {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An exclude or extract-list pattern could not be compiled.
    #[error("invalid pattern {pattern:?}: {message}")]
    Pattern { pattern: String, message: String },

    /// The requested owner is neither numeric nor a known account.
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// The requested group is neither numeric nor a known group.
    #[error("unknown group: {0}")]
    UnknownGroup(String),

    /// Creating a directory, file or link at `path` failed.
    #[error("failed to provision {path}: {source}")]
    Provision {
        path: PathBuf,
        source: std::io::Error,
    },

    /// I/O error while reading the archive stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn provision(path: impl Into<PathBuf>, source: impl Into<std::io::Error>) -> Self {
        Error::Provision {
            path: path.into(),
            source: source.into(),
        }
    }
}
