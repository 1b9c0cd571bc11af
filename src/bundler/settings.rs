//! Configuration structures for packaging operations.
//!
//! Every field has a default matching the stock macOS/Qt packaging flow, so a
//! settings file only needs to mention what differs:
//!
//! ```toml
//! [package]
//! app = "build/ChronoChat.app"
//! resources = ["qt.conf"]
//!
//! [bundle]
//! excluded_plugins = ["designer"]
//!
//! [dmg]
//! format = "UDZO"
//! ```

use crate::error::{DistError, Result};
use crate::probe::LibrarySpec;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level settings file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Dependency relocation and plugin handling.
    pub bundle: BundleSettings,
    /// Inputs and outputs of the `package` command.
    pub package: PackageSettings,
    /// Disk image creation.
    pub dmg: DmgSettings,
    /// Library probed by the `probe` command.
    pub probe: LibrarySpec,
}

impl Settings {
    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|error| {
            DistError::Bundler(crate::bundler::Error::Fs {
                context: "reading settings file",
                path: path.to_path_buf(),
                error,
            })
        })?;
        Self::parse(&contents)
    }

    /// Parse settings from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}

/// How an `.app` bundle's dependencies and plugins are treated.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleSettings {
    /// Install-name prefixes that are provided by the OS (or a shared
    /// system-wide install) and must never be copied into the bundle.
    pub system_prefixes: Vec<String>,

    /// Directories searched for frameworks referenced by a relative install
    /// name such as `QtCore.framework/Versions/4/QtCore`.
    ///
    /// `~/Library/Frameworks` is searched first when `HOME` is set.
    pub framework_search_paths: Vec<PathBuf>,

    /// Command printing the plugin install directory on stdout.
    pub plugin_query: Vec<String>,

    /// Directory under `Contents/` receiving the plugin tree.
    pub plugins_dir: String,

    /// Plugin categories removed from the bundle entirely.
    pub excluded_plugins: Vec<String>,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            system_prefixes: vec![
                "/System/Library/".into(),
                "/usr/lib/".into(),
                "/usr/local/ndn/lib/".into(),
            ],
            framework_search_paths: vec![
                PathBuf::from("/Library/Frameworks"),
                PathBuf::from("/Network/Library/Frameworks"),
            ],
            plugin_query: vec![
                "qmake".into(),
                "-query".into(),
                "QT_INSTALL_PLUGINS".into(),
            ],
            plugins_dir: "QtPlugins".into(),
            excluded_plugins: vec![
                "phonon_backend".into(),
                "designer".into(),
                "script".into(),
            ],
        }
    }
}

impl BundleSettings {
    /// Framework search paths with the user's own framework folder first.
    pub fn effective_framework_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(self.framework_search_paths.len() + 1);
        if let Ok(home) = std::env::var("HOME") {
            paths.push(PathBuf::from(home).join("Library/Frameworks"));
        }
        paths.extend(self.framework_search_paths.iter().cloned());
        paths
    }
}

/// Inputs and outputs of a packaging run.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageSettings {
    /// Template `.app` produced by the build.
    pub app: Option<PathBuf>,
    /// Directory receiving the staged bundle and the disk image.
    pub output_dir: PathBuf,
    /// Suffix naming the platform the image targets.
    pub platform_tag: String,
    /// Value written to `LSMinimumSystemVersion`.
    pub minimum_system_version: String,
    /// Files or directories copied into `Contents/Resources`.
    pub resources: Vec<PathBuf>,
    /// Whether to copy and relocate the plugin tree.
    pub plugins: bool,
}

impl Default for PackageSettings {
    fn default() -> Self {
        Self {
            app: None,
            output_dir: PathBuf::from("build"),
            platform_tag: "Mavericks-10.9".into(),
            minimum_system_version: "10.9.0".into(),
            resources: vec![PathBuf::from("qt.conf")],
            plugins: true,
        }
    }
}

/// macOS DMG disk image configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DmgSettings {
    /// `hdiutil` image format. `UDBZ` is bzip2-compressed read-only.
    pub format: String,
    /// Place an `Applications` shortcut next to the app for drag-to-install.
    pub applications_link: bool,
}

impl Default for DmgSettings {
    fn default() -> Self {
        Self {
            format: "UDBZ".into(),
            applications_link: true,
        }
    }
}
