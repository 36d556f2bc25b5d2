//! Error types for staging and packaging operations.
//!
//! Provides contextual error chaining, filesystem errors that carry the
//! offending path, and the variants raised by individual pipeline stages.
//!
//! [`Context`] wraps an error (or a `None`) with a message, [`ErrorExt`]
//! attaches the path to an `io::Error`, and [`bail!`](crate::bail) returns
//! early with a formatted message.
//!
//! # Example
//!
//! ```no_run
//! use linux_release_packager::bundler::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_template(path: &Path) -> Result<String> {
//!     let text = std::fs::read_to_string(path)
//!         .fs_context("reading template", path)?;
//!     Ok(text)
//! }
//!
//! fn load(path: &Path) -> Result<String> {
//!     read_template(path).context("failed to load desktop entry template")
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Everything that can go wrong while staging or packaging.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// An inner error wrapped with a message by [`Context`].
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// An I/O failure on a known path, see [`ErrorExt::fs_context`].
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading manifest")
        context: &'static str,
        /// Path the operation touched
        path: PathBuf,
        /// Source error
        error: io::Error,
    },

    /// Child process could not be started.
    #[error("could not start {command}: {error}")]
    CommandFailed {
        /// Program name
        command: String,
        /// Spawn error
        error: io::Error,
    },

    /// The application manifest is missing required data.
    #[error("invalid manifest {path}: {reason}")]
    Manifest {
        /// Manifest location
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// Resource archive could not be sealed.
    #[error("failed to seal resource archive {output}: {reason}")]
    Archive {
        /// Archive being written
        output: PathBuf,
        /// Underlying failure
        reason: String,
    },

    /// One or more independent artifacts of a stage failed.
    #[error("{stage} failed for {}", .failures.join("; "))]
    Stage {
        /// Stage name
        stage: &'static str,
        /// One entry per failed artifact
        failures: Vec<String>,
    },

    /// Bare I/O error without a path.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Directory traversal failure.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// A walked path was outside its root.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Malformed JSON in a manifest or archive header.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// Malformed configuration file.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// Invalid placeholder pattern.
    #[error("{0}")]
    RegexError(#[from] regex::Error),

    /// Invalid unpack glob.
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// Unreadable glob match.
    #[error("{0}")]
    Glob(#[from] glob::GlobError),

    /// Architecture name outside the supported set.
    #[error("unknown architecture `{0}`")]
    ArchError(String),

    /// Free-form message, raised by `bail!` and `Option::context`.
    #[error("{0}")]
    GenericError(String),
}

/// Result alias used throughout the bundler.
pub type Result<T> = std::result::Result<T, Error>;

/// Attaches a message to a failed [`Result`] or a missing [`Option`] value.
pub trait Context<T> {
    /// Wraps the error with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Like [`Context::context`], building the message only on failure.
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Adds the path to raw `io::Error`s.
pub trait ErrorExt<T> {
    /// Converts the error into [`Error::Fs`]. `context` reads as a gerund,
    /// such as "writing control file".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

impl Error {
    /// Returns true when the error ultimately stems from a path that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Context(_, inner) => inner.is_not_found(),
            Error::Fs { error, .. } | Error::IoError(error) => {
                error.kind() == io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
///
/// ```ignore
/// bail!("{} is not a directory", path.display());
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_wraps_message() {
        let err: Result<()> = Err(Error::GenericError("boom".into()));
        let err = err.context("staging runtime").unwrap_err();
        assert_eq!(err.to_string(), "staging runtime: boom");
    }

    #[test]
    fn test_fs_context_keeps_path() {
        let io: std::io::Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = io.fs_context("reading manifest", "/tmp/app/package.json").unwrap_err();
        assert!(err.to_string().contains("/tmp/app/package.json"));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_stage_error_lists_failures() {
        let err = Error::Stage {
            stage: "metadata finalizer",
            failures: vec!["icon: missing".into(), "dictionaries: missing".into()],
        };
        assert_eq!(
            err.to_string(),
            "metadata finalizer failed for icon: missing; dictionaries: missing"
        );
    }
}
