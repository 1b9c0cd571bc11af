//! Dynamic library dependency discovery and relocation for macOS .app bundles.
//!
//! Non-system dylibs and frameworks referenced by a binary are copied into
//! `Contents/Frameworks`, their own install names are rewritten to
//! `@executable_path/../Frameworks/...`, their dependencies are relocated
//! recursively, and finally the referencing binary's load command is pointed
//! at the bundled copy.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    tool::{Invocation, ToolRunner},
    utils::fs,
};
use path_absolutize::Absolutize;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Install-name prefix of everything stored in `Contents/Frameworks`.
pub const BUNDLE_LIBRARY_PREFIX: &str = "@executable_path/../Frameworks";

/// Install name for a path relative to `Contents/Frameworks`.
pub fn bundle_install_name(relative: &str) -> String {
    format!("{}/{}", BUNDLE_LIBRARY_PREFIX, relative)
}

/// How a dependency is treated during relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryKind {
    /// Provided by the OS or a shared system-wide install; never bundled.
    System,
    /// Already loader-relative (`@executable_path`, `@loader_path`, `@rpath`).
    BundleRelative,
    /// Lives inside a `.framework` directory which is bundled as a unit.
    Framework {
        /// The `<Name>.framework` directory, possibly relative.
        root: PathBuf,
        /// Framework name without the `.framework` suffix.
        name: String,
    },
    /// A flat shared library file.
    Dylib,
}

/// One load command of a Mach-O binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryReference {
    /// Install name as printed by `otool -L`.
    pub install_name: String,
    /// Classification of the install name.
    pub kind: LibraryKind,
}

impl LibraryReference {
    /// Classify an install name against the configured system prefixes.
    pub fn classify(install_name: &str, system_prefixes: &[String]) -> Self {
        let kind = if install_name.starts_with('@') {
            LibraryKind::BundleRelative
        } else if system_prefixes
            .iter()
            .any(|prefix| install_name.starts_with(prefix.as_str()))
        {
            LibraryKind::System
        } else if let Some((root, name)) = framework_root(install_name) {
            LibraryKind::Framework { root, name }
        } else {
            LibraryKind::Dylib
        };

        Self {
            install_name: install_name.to_string(),
            kind,
        }
    }
}

/// Extracts the base `.framework` directory from a path anywhere inside a
/// framework, e.g. `/Library/Frameworks/QtCore.framework/Versions/4/QtCore`
/// yields `/Library/Frameworks/QtCore.framework` and `QtCore`.
pub fn framework_root(install_name: &str) -> Option<(PathBuf, String)> {
    let mut root = PathBuf::new();
    for component in Path::new(install_name).components() {
        root.push(component.as_os_str());
        if let Component::Normal(part) = component {
            let part = part.to_string_lossy();
            if let Some(name) = part.strip_suffix(".framework") {
                return Some((root, name.to_string()));
            }
        }
    }
    None
}

/// Parses `otool -L` output into install names.
///
/// Entries naming the binary itself (a dylib's own identity line) are dropped,
/// as are duplicates printed once per architecture of a universal binary.
pub fn parse_otool_output(output: &str, binary: &Path) -> Vec<String> {
    static LOAD_COMMAND_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^\t(.+) \(.*$").expect("otool load command regex is valid")
    });

    let own_name = binary.file_name().map(|n| n.to_string_lossy().into_owned());
    let own_path = binary.to_string_lossy();
    let mut seen = HashSet::new();

    output
        .lines()
        .filter_map(|line| LOAD_COMMAND_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .filter(|lib| Some(lib.as_str()) != own_name.as_deref() && lib.as_str() != own_path)
        .filter(|lib| seen.insert(lib.clone()))
        .collect()
}

/// Lists the dynamic library references of a binary using `otool -L`.
pub async fn list_dependencies<R: ToolRunner>(runner: &R, binary: &Path) -> Result<Vec<String>> {
    let invocation = Invocation::new("otool").arg("-L").arg(binary);
    let output = runner.run_checked(&invocation).await?;
    Ok(parse_otool_output(&output.stdout, binary))
}

/// Rewrites the identity (install name) a library records for itself.
pub async fn set_install_id<R: ToolRunner>(runner: &R, library: &Path, id: &str) -> Result<()> {
    let invocation = Invocation::new("install_name_tool")
        .arg("-id")
        .arg(id)
        .arg(library);
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// Points one load command of `binary` at a new install name.
pub async fn change_install_name<R: ToolRunner>(
    runner: &R,
    binary: &Path,
    old: &str,
    new: &str,
) -> Result<()> {
    log::debug!("  Rewriting: {} -> {}", old, new);
    let invocation = Invocation::new("install_name_tool")
        .arg("-change")
        .arg(old)
        .arg(new)
        .arg(binary);
    runner.run_checked(&invocation).await?;
    Ok(())
}

/// What a relocation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionReport {
    /// Bundle-relative names copied into `Contents/Frameworks` during this pass.
    pub copied: Vec<String>,
    /// Load commands rewritten to point inside the bundle.
    pub rewritten: usize,
    /// References left alone (system or already loader-relative).
    pub skipped: usize,
    /// Install names whose source file could not be found.
    pub missing: Vec<String>,
}

impl ResolutionReport {
    /// Fold another pass into this one.
    pub fn absorb(&mut self, other: ResolutionReport) {
        self.copied.extend(other.copied);
        self.rewritten += other.rewritten;
        self.skipped += other.skipped;
        self.missing.extend(other.missing);
    }
}

/// Relocates dependencies into a bundle's library directory.
///
/// Holds the relocation ledger for one bundle: every source (canonical path of
/// a dylib, or of a framework directory) is copied at most once, and every
/// bundle-relative name belongs to exactly one source.
#[derive(Debug)]
pub struct DependencyRelocator<'r, R> {
    runner: &'r R,
    library_dir: PathBuf,
    system_prefixes: Vec<String>,
    framework_search_paths: Vec<PathBuf>,
    prepared: bool,
    relocated: HashMap<PathBuf, String>,
    claimed: HashMap<String, PathBuf>,
}

impl<'r, R: ToolRunner> DependencyRelocator<'r, R> {
    /// Create a relocator storing libraries in `library_dir`.
    pub fn new(
        runner: &'r R,
        library_dir: PathBuf,
        system_prefixes: Vec<String>,
        framework_search_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            runner,
            library_dir,
            system_prefixes,
            framework_search_paths,
            prepared: false,
            relocated: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    /// Directory receiving bundled libraries.
    pub fn library_dir(&self) -> &Path {
        &self.library_dir
    }

    /// Relocates every non-system dependency of `binary`, recursively.
    ///
    /// The first call empties the library directory; later calls reuse what
    /// earlier calls bundled.
    pub async fn resolve(&mut self, binary: &Path) -> Result<ResolutionReport> {
        if !self.prepared {
            fs::create_dir_all(&self.library_dir, true).await?;
            self.prepared = true;
        }

        let binary = binary
            .absolutize()
            .fs_context("resolving binary path", binary)?
            .into_owned();

        log::info!("Discovering dylib dependencies for {}", binary.display());

        let mut report = ResolutionReport::default();
        self.relocate_binary(&binary, &mut report).await?;

        if !report.copied.is_empty() {
            log::info!(
                "Bundled {} new libraries for {}",
                report.copied.len(),
                binary.display()
            );
        }
        Ok(report)
    }

    async fn relocate_binary(&mut self, binary: &Path, report: &mut ResolutionReport) -> Result<()> {
        let references = list_dependencies(self.runner, binary).await?;

        for install_name in references {
            let reference = LibraryReference::classify(&install_name, &self.system_prefixes);

            let relative = match reference.kind {
                LibraryKind::System | LibraryKind::BundleRelative => {
                    report.skipped += 1;
                    continue;
                }
                LibraryKind::Framework { root, name } => {
                    self.relocate_framework(&install_name, &root, &name, report)
                        .await?
                }
                LibraryKind::Dylib => self.relocate_dylib(&install_name, report).await?,
            };

            let Some(relative) = relative else {
                continue;
            };

            fs::make_executable(binary).await?;
            change_install_name(
                self.runner,
                binary,
                &install_name,
                &bundle_install_name(&relative),
            )
            .await?;
            report.rewritten += 1;
        }

        Ok(())
    }

    /// Returns the bundle-relative name, or `None` when the source is missing.
    async fn relocate_dylib(
        &mut self,
        install_name: &str,
        report: &mut ResolutionReport,
    ) -> Result<Option<String>> {
        let source = Path::new(install_name);
        let canonical = match source.file_name() {
            Some(_) if source.is_absolute() => tokio::fs::canonicalize(source).await.ok(),
            _ => None,
        };
        let Some(canonical) = canonical else {
            self.note_missing(install_name, source, report);
            return Ok(None);
        };

        if let Some(existing) = self.relocated.get(&canonical) {
            return Ok(Some(existing.clone()));
        }

        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.claim(&name, &canonical)?;

        let dest = self.library_dir.join(&name);
        log::debug!("Bundling dylib: {} -> {}", install_name, dest.display());
        fs::copy_file(&canonical, &dest).await?;
        fs::make_executable(&dest).await?;
        set_install_id(self.runner, &dest, &bundle_install_name(&name)).await?;

        self.relocated.insert(canonical, name.clone());
        report.copied.push(name.clone());

        Box::pin(self.relocate_binary(&dest, report)).await?;

        Ok(Some(name))
    }

    /// Returns the bundle-relative path of the framework binary, or `None`
    /// when the framework cannot be found.
    async fn relocate_framework(
        &mut self,
        install_name: &str,
        root: &Path,
        name: &str,
        report: &mut ResolutionReport,
    ) -> Result<Option<String>> {
        let Some(source_root) = self.find_framework(root) else {
            self.note_missing(install_name, root, report);
            return Ok(None);
        };
        let canonical = tokio::fs::canonicalize(&source_root)
            .await
            .fs_context("resolving framework path", &source_root)?;

        if let Some(existing) = self.relocated.get(&canonical) {
            return Ok(Some(existing.clone()));
        }

        let dir_name = format!("{}.framework", name);
        let relative = format!("{}/{}", dir_name, name);
        self.claim(&dir_name, &canonical)?;

        let dest_root = self.library_dir.join(&dir_name);
        log::debug!("Bundling framework: {} -> {}", source_root.display(), dest_root.display());
        fs::copy_dir(&source_root, &dest_root).await?;
        strip_framework_artifacts(&dest_root, name).await;

        let binary = framework_binary(&dest_root, name, install_name, root);
        fs::make_executable(&binary).await?;
        set_install_id(self.runner, &binary, &bundle_install_name(&relative)).await?;

        self.relocated.insert(canonical, relative.clone());
        report.copied.push(dir_name);

        Box::pin(self.relocate_binary(&binary, report)).await?;
        write_framework_info_plist(&dest_root).await;

        Ok(Some(relative))
    }

    fn find_framework(&self, root: &Path) -> Option<PathBuf> {
        if root.is_absolute() {
            return root.is_dir().then(|| root.to_path_buf());
        }
        self.framework_search_paths
            .iter()
            .map(|dir| dir.join(root))
            .find(|candidate| candidate.is_dir())
    }

    fn claim(&mut self, name: &str, canonical: &Path) -> Result<()> {
        match self.claimed.get(name) {
            Some(existing) if existing != canonical => Err(Error::NameCollision {
                name: name.to_string(),
                existing: existing.clone(),
                incoming: canonical.to_path_buf(),
            }),
            Some(_) => Ok(()),
            None => {
                self.claimed.insert(name.to_string(), canonical.to_path_buf());
                Ok(())
            }
        }
    }

    fn note_missing(&self, install_name: &str, path: &Path, report: &mut ResolutionReport) {
        let err = Error::MissingFile {
            path: path.to_path_buf(),
        };
        log::warn!("Skipping {}: {}", install_name, err);
        report.missing.push(install_name.to_string());
    }
}

/// The Mach-O inside a bundled framework: the top-level `<Name>` link when
/// present, otherwise the versioned file the install name pointed at.
fn framework_binary(dest_root: &Path, name: &str, install_name: &str, root: &Path) -> PathBuf {
    let top_level = dest_root.join(name);
    if top_level.exists() {
        return top_level;
    }
    Path::new(install_name)
        .strip_prefix(root)
        .map(|inner| dest_root.join(inner))
        .unwrap_or(top_level)
}

/// Removes headers, link metadata and debug variants from a copied framework.
///
/// Best-effort: anything that cannot be removed is left in place.
async fn strip_framework_artifacts(dest_root: &Path, name: &str) {
    let mut targets = vec![
        dest_root.join("Headers"),
        dest_root.join(format!("{}.prl", name)),
        dest_root.join(format!("{}_debug", name)),
        dest_root.join(format!("{}_debug.prl", name)),
    ];

    let versions = glob::Pattern::escape(&dest_root.join("Versions").to_string_lossy());
    for pattern in [
        format!("{}/*/Headers", versions),
        format!("{}/*/{}_debug", versions, glob::Pattern::escape(name)),
    ] {
        match glob::glob(&pattern) {
            Ok(paths) => targets.extend(paths.flatten()),
            Err(e) => log::debug!("Ignoring artifact pattern {}: {}", pattern, e),
        }
    }

    for target in targets {
        if let Err(e) = fs::remove_path(&target).await {
            log::debug!("Could not strip {}: {}", target.display(), e);
        }
    }
}

/// Gives a bundled framework a minimal Info.plist when it ships without one;
/// codesign refuses frameworks lacking it.
async fn write_framework_info_plist(dest_root: &Path) {
    let resources = dest_root.join("Resources");
    let plist_path = resources.join("Info.plist");
    if plist_path.exists() {
        return;
    }

    let result = async {
        tokio::fs::create_dir_all(&resources)
            .await
            .fs_context("creating framework Resources", &resources)?;
        let mut dict = plist::Dictionary::new();
        dict.insert("CFBundleSignature".into(), "????".into());
        plist::Value::Dictionary(dict).to_file_xml(&plist_path)?;
        Ok::<(), Error>(())
    }
    .await;

    if let Err(e) = result {
        log::debug!("Could not write {}: {}", plist_path.display(), e);
    }
}
