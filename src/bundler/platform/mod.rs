//! Platform-specific bundling implementations.
//!
//! Only macOS application distribution is supported. The modules are compiled
//! on every host because all platform tools are reached through a
//! [`ToolRunner`](super::tool::ToolRunner); the CLI refuses to package on
//! other systems.

pub mod macos;
