//! macOS application bundler.
//!
//! Turns a built `.app` into a self-contained, optionally signed bundle and
//! packs it into a drag-to-install disk image.
//!
//! # Configuration
//!
//! Bundling is configured through a TOML settings file (see [`Settings`]):
//!
//! ```toml
//! [bundle]
//! excluded_plugins = ["phonon_backend", "designer", "script"]
//!
//! [dmg]
//! format = "UDBZ"
//! ```
//!
//! # Pipeline
//!
//! ```no_run
//! use macos_dist::bundler::{AppBundle, BundleSettings, DiskImage, SystemRunner};
//! use std::path::Path;
//!
//! # async fn example() -> macos_dist::bundler::Result<()> {
//! let runner = SystemRunner;
//! let mut app = AppBundle::initialize(
//!     Path::new("build/ChronoChat.app"),
//!     Path::new("build/Mavericks-10.9/ChronoChat.app"),
//!     BundleSettings::default(),
//!     &runner,
//! )
//! .await?;
//! app.inject_plugins().await?;
//! app.resolve_dependencies(None).await?;
//! let bundle = app.finalize()?;
//!
//! let image = DiskImage::new("build/ChronoChat.dmg", "ChronoChat", "UDBZ")?;
//! image.stage(&bundle, "/ChronoChat.app").await?;
//! image.create(&runner).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
pub mod platform;
mod settings;
pub mod tool;
pub mod utils;

// Public re-exports
pub use error::{Context, Error, ErrorExt, Result};
pub use platform::macos::{
    AppBundle, DiskImage, ImageReport, LibraryKind, LibraryReference, ResolutionReport, sign,
};
pub use settings::{BundleSettings, DmgSettings, PackageSettings, Settings};
pub use tool::{Invocation, SystemRunner, ToolOutput, ToolRunner};
