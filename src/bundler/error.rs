//! Error types for bundler operations.
//!
//! Provides contextual error chaining, filesystem-specific errors with path
//! context, and the packaging failure taxonomy (setup, missing files, external
//! tool failures).
//!
//! # Example
//!
//! ```no_run
//! # use std::path::{Path, PathBuf};
//! # type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
//! #
//! # trait ErrorExt<T> {
//! #     fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
//! # }
//! # impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
//! #     fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
//! #         self.map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
//! #     }
//! # }
//! #
//! fn read_metadata(path: &Path) -> Result<Vec<u8>> {
//!     let bytes = std::fs::read(path).fs_context("reading bundle metadata", path)?;
//!     Ok(bytes)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the bundler.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "copying framework")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// A precondition on the bundle template is unmet.
    #[error("bundle setup failed: {reason}")]
    Setup {
        /// What was wrong with the template or target
        reason: String,
    },

    /// A referenced file is absent on disk.
    #[error("{path} does not exist")]
    MissingFile {
        /// The path that was expected to exist
        path: PathBuf,
    },

    /// An external tool ran but exited unsuccessfully.
    #[error("{command} exited with {}: {stderr}", .status.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    ExternalTool {
        /// Rendered command line
        command: String,
        /// Exit code, `None` when killed by a signal
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// Child process could not be started.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// Two different library sources would land under the same bundle name.
    #[error(
        "library name collision: {name} is already bundled from {existing}, refusing to overwrite it with {incoming}"
    )]
    NameCollision {
        /// Bundle-relative name both sources map to
        name: String,
        /// Source that claimed the name first
        existing: PathBuf,
        /// Source that collided with it
        incoming: PathBuf,
    },

    /// Staging destinations are absolute paths inside the image root.
    #[error("staging destination must start with '/': {0}")]
    InvalidStagingPath(String),

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking directory (used in recursive copies).
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Property list (plist) parsing/writing error.
    #[error("{0}")]
    Plist(#[from] plist::Error),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Similar to `anyhow::Context` but integrated with bundler's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
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

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying framework".
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
    /// True for failures the packaging policy treats as skippable for a single
    /// dependency rather than fatal for the run.
    pub fn is_missing_file(&self) -> bool {
        match self {
            Error::MissingFile { .. } => true,
            Error::Context(_, inner) => inner.is_missing_file(),
            _ => false,
        }
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError($msg.into()))
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
    fn external_tool_renders_status() {
        let err = Error::ExternalTool {
            command: "hdiutil create".into(),
            status: Some(1),
            stderr: "no space".into(),
        };
        assert_eq!(err.to_string(), "hdiutil create exited with status 1: no space");
    }

    #[test]
    fn missing_file_survives_context() {
        let err: Result<()> = Err(Error::MissingFile {
            path: PathBuf::from("/opt/lib/libfoo.dylib"),
        });
        let err = err.context("bundling libfoo").unwrap_err();
        assert!(err.is_missing_file());
        assert!(!Error::GenericError("x".into()).is_missing_file());
    }
}
