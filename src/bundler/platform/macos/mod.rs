//! macOS distribution support: .app bundles, code signing and DMG images.
//!
//! # Build Requirements
//!
//! | Step | Required Tools | Notes |
//! |------|----------------|-------|
//! | Dependency relocation | `otool`, `install_name_tool` | Xcode Command Line Tools |
//! | Plugins | `qmake` | Only when plugins are bundled |
//! | Code Signing | `codesign`, signing identity | Optional |
//! | .dmg | `hdiutil` | Built into macOS |
//!
//! All tools are run through a [`ToolRunner`](crate::bundler::tool::ToolRunner),
//! so the modules here build and test on any host.

pub mod app;
pub mod dmg;
pub mod dylib;
pub mod plugins;
pub mod sign;

pub use app::AppBundle;
pub use dmg::{DiskImage, ImageReport};
pub use dylib::{LibraryKind, LibraryReference, ResolutionReport};
pub use sign::sign;
