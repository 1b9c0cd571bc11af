//! macOS application bundle (.app) assembly.
//!
//! An [`AppBundle`] starts from a `.app` template produced by the build,
//! copies it to its distribution location and then makes it self-contained:
//! non-system libraries are pulled into `Contents/Frameworks`, plugins and
//! resources are injected and `Info.plist` is updated. [`AppBundle::finalize`]
//! writes the metadata back and consumes the assembler.

use super::dylib::{DependencyRelocator, ResolutionReport, set_install_id};
use super::plugins;
use crate::bundler::{
    error::{Context, Error, ErrorExt, Result},
    settings::BundleSettings,
    tool::ToolRunner,
    utils::fs,
};
use path_absolutize::Absolutize;
use plist::{Dictionary, Value};
use std::path::{Path, PathBuf};

/// A `.app` bundle being prepared for distribution.
#[derive(Debug)]
pub struct AppBundle<'r, R> {
    root: PathBuf,
    info: Dictionary,
    executable: String,
    settings: BundleSettings,
    runner: &'r R,
    relocator: DependencyRelocator<'r, R>,
}

impl<'r, R: ToolRunner> AppBundle<'r, R> {
    /// Copies `template` to `target` and loads its `Info.plist`.
    ///
    /// Nothing is copied unless the template is a directory with a readable
    /// `Contents/Info.plist` naming its executable and `target` is free.
    pub async fn initialize(
        template: &Path,
        target: &Path,
        settings: BundleSettings,
        runner: &'r R,
    ) -> Result<Self> {
        if !template.is_dir() {
            return Err(Error::Setup {
                reason: format!("{} is not an application bundle", template.display()),
            });
        }
        if target.symlink_metadata().is_ok() {
            return Err(Error::Setup {
                reason: format!("{} already exists", target.display()),
            });
        }

        let info = read_info_plist(&template.join("Contents/Info.plist"))?;
        let executable = info
            .get("CFBundleExecutable")
            .and_then(Value::as_string)
            .map(str::to_string)
            .ok_or_else(|| Error::Setup {
                reason: format!(
                    "{} has no CFBundleExecutable in Contents/Info.plist",
                    template.display()
                ),
            })?;

        log::info!("Copying {} to {}", template.display(), target.display());
        fs::copy_dir(template, target).await?;

        let root = target
            .absolutize()
            .fs_context("resolving bundle path", target)?
            .into_owned();
        let relocator = DependencyRelocator::new(
            runner,
            root.join("Contents/Frameworks"),
            settings.system_prefixes.clone(),
            settings.effective_framework_search_paths(),
        );

        Ok(Self {
            root,
            info,
            executable,
            settings,
            runner,
            relocator,
        })
    }

    /// Bundle root (`<Name>.app`).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Contents` directory.
    pub fn contents_dir(&self) -> PathBuf {
        self.root.join("Contents")
    }

    /// Directory receiving relocated libraries.
    pub fn frameworks_dir(&self) -> &Path {
        self.relocator.library_dir()
    }

    /// Value of `CFBundleExecutable`.
    pub fn executable_name(&self) -> &str {
        &self.executable
    }

    /// Main executable inside `Contents/MacOS`.
    pub fn executable_path(&self) -> PathBuf {
        self.contents_dir().join("MacOS").join(&self.executable)
    }

    /// Metadata as it will be written by [`finalize`](Self::finalize).
    pub fn info(&self) -> &Dictionary {
        &self.info
    }

    /// Relocates the non-system dependencies of `binary` (the main executable
    /// when `None`) into `Contents/Frameworks`.
    pub async fn resolve_dependencies(&mut self, binary: Option<&Path>) -> Result<ResolutionReport> {
        let binary = binary
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.executable_path());
        self.relocator.resolve(&binary).await
    }

    /// Copies files or directories into `Contents/Resources`, replacing
    /// entries of the same name. Missing sources are skipped.
    ///
    /// Returns the number of entries injected.
    pub async fn inject_resources(&self, paths: &[PathBuf]) -> Result<usize> {
        let resources = self.contents_dir().join("Resources");
        fs::create_dir_all(&resources, false).await?;

        let mut injected = 0;
        for source in paths {
            let Some(name) = source.file_name() else {
                log::warn!("Skipping resource with no file name: {}", source.display());
                continue;
            };
            if !source.exists() {
                log::warn!(
                    "Skipping resource: {}",
                    Error::MissingFile {
                        path: source.clone()
                    }
                );
                continue;
            }

            let dest = resources.join(name);
            if source.is_dir() {
                fs::remove_path(&dest).await?;
                fs::copy_dir(source, &dest).await?;
            } else {
                fs::copy_file(source, &dest).await?;
            }
            log::debug!("Injected resource {}", dest.display());
            injected += 1;
        }

        Ok(injected)
    }

    /// Copies the toolkit's plugin tree into the bundle, prunes it and
    /// relocates every remaining plugin's dependencies.
    pub async fn inject_plugins(&mut self) -> Result<ResolutionReport> {
        let source = plugins::query_plugin_root(self.runner, &self.settings.plugin_query).await?;
        let dest = self.contents_dir().join(&self.settings.plugins_dir);

        log::info!("Copying plugins from {}", source.display());
        fs::remove_path(&dest).await?;
        fs::copy_dir_resolved(&source, &dest).await?;

        let libraries = plugins::prune_plugins(&dest, &self.settings.excluded_plugins).await?;

        let mut report = ResolutionReport::default();
        for library in libraries {
            let id = library
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("plugin path {} has no file name", library.display()))?;
            fs::make_executable(&library).await?;
            set_install_id(self.runner, &library, &id)
                .await
                .with_context(|| format!("setting the install name of plugin {}", id))?;
            report.absorb(self.relocator.resolve(&library).await?);
        }

        Ok(report)
    }

    /// Sets `LSMinimumSystemVersion`.
    pub fn set_minimum_platform_version(&mut self, version: &str) {
        self.info
            .insert("LSMinimumSystemVersion".into(), version.into());
    }

    /// Sets `CFBundleShortVersionString` and `CFBundleVersion`.
    pub fn stamp_version(&mut self, version: &str) {
        self.info
            .insert("CFBundleShortVersionString".into(), version.into());
        self.info.insert("CFBundleVersion".into(), version.into());
    }

    /// Writes `Contents/Info.plist` and returns the bundle root.
    pub fn finalize(self) -> Result<PathBuf> {
        let plist_path = self.contents_dir().join("Info.plist");
        Value::Dictionary(self.info)
            .to_file_xml(&plist_path)
            .map_err(Error::from)
            .with_context(|| format!("writing {}", plist_path.display()))?;
        log::info!("Finalized {}", self.root.display());
        Ok(self.root)
    }
}

fn read_info_plist(path: &Path) -> Result<Dictionary> {
    let value = Value::from_file(path).map_err(|e| Error::Setup {
        reason: format!("cannot read {}: {}", path.display(), e),
    })?;
    value.into_dictionary().ok_or_else(|| Error::Setup {
        reason: format!("{} is not a dictionary", path.display()),
    })
}
