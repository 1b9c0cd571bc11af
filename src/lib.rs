//! # macos_dist
//!
//! Distribution tooling for macOS desktop applications.
//!
//! This crate turns a freshly built `.app` into something that can be handed
//! to users, and helps builds find the native libraries such an app links.
//!
//! ## Features
//!
//! - **Self-contained bundles**: non-system dylibs and frameworks are copied
//!   into `Contents/Frameworks` and every install name is rewritten
//! - **Plugins and resources**: toolkit plugins and extra files are injected
//! - **Code signing**: deep, forced `codesign` with a keychain identity
//! - **Disk images**: drag-to-install `.dmg` with an `Applications` shortcut
//! - **Library probe**: locate an installed library, read its version and
//!   publish include / link / library-path variables
//!
//! ## Usage
//!
//! ```bash
//! macos_dist package --release 0.5 --app build/ChronoChat.app --codesign "Developer ID"
//! macos_dist package --git --app build/ChronoChat.app
//! macos_dist probe --ndn-cpp-dir /usr/local/ndn --format cargo
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod error;
pub mod probe;
pub mod version;

// Re-export main types for public API
pub use bundler::{AppBundle, DiskImage, Settings, ToolRunner};
pub use cli::Args;
pub use error::{CliError, DistError, ProbeError, Result};
pub use probe::{BuildVariables, LibraryProbe, LibrarySpec};
pub use version::VersionSelection;
