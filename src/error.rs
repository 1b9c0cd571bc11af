//! Error types for macos_dist operations.
//!
//! This module defines the top-level error with actionable messages and
//! recovery suggestions. Bundling failures live in [`crate::bundler::Error`]
//! and are wrapped here.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for macos_dist operations
pub type Result<T> = std::result::Result<T, DistError>;

/// Main error type for all macos_dist operations
#[derive(Error, Debug)]
pub enum DistError {
    /// Bundle assembly, signing or disk image errors
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),

    /// Library probe errors
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings file parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Library probe errors
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No candidate install root contains the marker header
    #[error("{}", not_found_message(.library, .location.as_ref(), .option))]
    NotFound {
        /// Library name, e.g. `ndn-cpp`
        library: String,
        /// Explicit override that was checked, if any
        location: Option<PathBuf>,
        /// CLI option users pass to point at an install root
        option: String,
    },

    /// The compiler used for the version probe is not on PATH
    #[error("C++ compiler '{compiler}' not found; set CXX or install a compiler")]
    CompilerMissing {
        /// Compiler command that was looked up
        compiler: String,
    },

    /// Compiling the version probe failed
    #[error("Failed to compile {library} version probe against {root}: {reason}")]
    Compile {
        /// Library name
        library: String,
        /// Install root the probe was compiled against
        root: PathBuf,
        /// Compiler diagnostics
        reason: String,
    },

    /// Running the compiled version probe failed
    #[error("Failed to run {library} version probe: {reason}")]
    Execute {
        /// Library name
        library: String,
        /// Failure description
        reason: String,
    },

    /// The probe ran but printed nothing
    #[error("{library} version probe produced no output")]
    EmptyVersion {
        /// Library name
        library: String,
    },

    /// Scratch space for the probe could not be prepared
    #[error("Failed to prepare probe scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
}

fn not_found_message(library: &str, location: Option<&PathBuf>, option: &str) -> String {
    match location {
        Some(path) => format!("{} not found in {}", library, path.display()),
        None => format!(
            "{} not found, please provide a --{} argument (see help)",
            library, option
        ),
    }
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Missing required argument
    #[error("Missing required argument: {argument}")]
    MissingArgument {
        /// Argument name
        argument: String,
    },

    /// Command execution failed
    #[error("Command execution failed: {command} - {reason}")]
    ExecutionFailed {
        /// Command that failed
        command: String,
        /// Reason for the error
        reason: String,
    },

    /// Host cannot run the packaging tools
    #[error("Unsupported host: {reason}")]
    UnsupportedHost {
        /// Reason for the error
        reason: String,
    },
}

impl DistError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error as BundlerError;

        match self {
            DistError::Bundler(BundlerError::Setup { .. }) => vec![
                "Build the application first so the template .app exists".to_string(),
                "Remove a stale output bundle from a previous run".to_string(),
            ],
            DistError::Bundler(BundlerError::ExternalTool { command, .. })
                if command.starts_with("codesign") =>
            {
                vec![
                    "List available identities: security find-identity -v -p codesigning"
                        .to_string(),
                    "Unlock the keychain holding the signing certificate".to_string(),
                ]
            }
            DistError::Bundler(BundlerError::CommandFailed { command, .. }) => vec![format!(
                "Ensure '{}' is installed (Xcode Command Line Tools: xcode-select --install)",
                command.split_whitespace().next().unwrap_or(command)
            )],
            DistError::Bundler(BundlerError::NameCollision { name, .. }) => vec![format!(
                "Two different libraries are both named {}; link against only one of them",
                name
            )],
            DistError::Probe(ProbeError::NotFound { option, .. }) => vec![format!(
                "Point --{} at the install prefix containing include/ and lib/",
                option
            )],
            DistError::Probe(ProbeError::CompilerMissing { .. }) => vec![
                "Install the Xcode Command Line Tools or set CXX to a C++ compiler".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
