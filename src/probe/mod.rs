//! Native library probe.
//!
//! Locates an installed C++ library by its marker header, compiles and runs a
//! tiny program printing the library's version macro, and publishes the
//! include / link / library-path variables a build needs to use it.
//!
//! ```no_run
//! use macos_dist::bundler::SystemRunner;
//! use macos_dist::probe::{LibraryProbe, LibrarySpec};
//!
//! # async fn example() -> Result<(), macos_dist::error::ProbeError> {
//! let mut probe = LibraryProbe::new(LibrarySpec::default(), &SystemRunner);
//! let vars = probe.check(None, "NDNCPP").await?;
//! print!("{}", vars.to_env_lines());
//! # Ok(())
//! # }
//! ```

use crate::bundler::{Invocation, ToolRunner};
use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Result type for probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Describes the library being probed.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LibrarySpec {
    /// Human-readable library name used in messages.
    pub name: String,
    /// CLI option that overrides the install root, without dashes.
    pub option: String,
    /// Header whose presence under `<root>/<include_dir>` identifies an install.
    pub marker_header: String,
    /// Include directory relative to the install root.
    pub include_dir: String,
    /// Library directory relative to the install root.
    pub lib_dir: String,
    /// Name passed to the linker.
    pub link_name: String,
    /// Preprocessor macro expanding to the version string.
    pub version_macro: String,
    /// Install roots tried, in order, when no override matches.
    pub search_roots: Vec<PathBuf>,
}

impl Default for LibrarySpec {
    fn default() -> Self {
        Self {
            name: "ndn-cpp".into(),
            option: "ndn-cpp-dir".into(),
            marker_header: "ndn-cpp/ndn-cpp-config.h".into(),
            include_dir: "include".into(),
            lib_dir: "lib".into(),
            link_name: "ndn-cpp".into(),
            version_macro: "NDN_CPP_PACKAGE_VERSION".into(),
            search_roots: ["/usr/local/ndn", "/usr", "/usr/local", "/opt/local", "/sw"]
                .into_iter()
                .map(PathBuf::from)
                .collect(),
        }
    }
}

impl LibrarySpec {
    /// Whether `root` holds an install of this library.
    pub fn is_install_root(&self, root: &Path) -> bool {
        root.join(&self.include_dir)
            .join(&self.marker_header)
            .is_file()
    }

    /// Source of the program printing the version macro.
    pub fn probe_source(&self) -> String {
        format!(
            "#include <iostream>\n#include <{}>\nint main() {{ std::cout << {}; }}\n",
            self.marker_header, self.version_macro
        )
    }
}

/// Build variables published for a located library.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BuildVariables {
    namespace: String,
    include: PathBuf,
    lib: String,
    libpath: PathBuf,
    version: Option<String>,
}

impl BuildVariables {
    /// Namespace suffix, e.g. `NDNCPP`.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Variables as `KEY -> VALUE` pairs, sorted by key.
    pub fn entries(&self) -> BTreeMap<String, String> {
        let ns = &self.namespace;
        let mut vars = BTreeMap::new();
        vars.insert(
            format!("INCLUDES_{ns}"),
            self.include.to_string_lossy().into_owned(),
        );
        vars.insert(format!("LIB_{ns}"), self.lib.clone());
        vars.insert(
            format!("LIBPATH_{ns}"),
            self.libpath.to_string_lossy().into_owned(),
        );
        if let Some(version) = &self.version {
            vars.insert(format!("{ns}_VERSION"), version.clone());
        }
        vars
    }

    /// Looks up one variable by its full name.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries().remove(key)
    }

    /// `KEY=VALUE` lines.
    pub fn to_env_lines(&self) -> String {
        self.entries()
            .into_iter()
            .map(|(k, v)| format!("{k}={v}\n"))
            .collect()
    }

    /// A JSON object of the variables.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries())
    }

    /// Directives for a cargo build script linking against the library.
    pub fn to_cargo_directives(&self) -> String {
        let mut out = format!(
            "cargo:rustc-link-search=native={}\ncargo:rustc-link-lib={}\ncargo:include={}\n",
            self.libpath.display(),
            self.lib,
            self.include.display()
        );
        if let Some(version) = &self.version {
            out.push_str(&format!("cargo:version={}\n", version));
        }
        out
    }
}

/// Finds and inspects one installed library.
#[derive(Debug)]
pub struct LibraryProbe<'r, R> {
    spec: LibrarySpec,
    runner: &'r R,
    compiler: String,
    versions: HashMap<PathBuf, String>,
}

impl<'r, R: ToolRunner> LibraryProbe<'r, R> {
    /// Creates a probe compiling with `$CXX`, or `c++` when unset.
    ///
    /// Only the first word of the compiler command is looked up on `PATH`;
    /// the rest is passed through as leading arguments.
    pub fn new(spec: LibrarySpec, runner: &'r R) -> Self {
        let compiler = std::env::var("CXX")
            .ok()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "c++".to_string());
        Self {
            spec,
            runner,
            compiler,
            versions: HashMap::new(),
        }
    }

    /// Uses the `compiler` command line instead of `$CXX`.
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = compiler.into();
        self
    }

    /// Library being probed.
    pub fn spec(&self) -> &LibrarySpec {
        &self.spec
    }

    /// Finds the install root: `override_root` when it holds the library,
    /// otherwise the first matching default root.
    pub fn locate_install_root(&self, override_root: Option<&Path>) -> Result<PathBuf> {
        if let Some(root) = override_root
            && self.spec.is_install_root(root)
        {
            return Ok(root.to_path_buf());
        }

        if let Some(root) = self
            .spec
            .search_roots
            .iter()
            .find(|root| self.spec.is_install_root(root))
        {
            log::debug!("Found {} in {}", self.spec.name, root.display());
            return Ok(root.clone());
        }

        Err(ProbeError::NotFound {
            library: self.spec.name.clone(),
            location: override_root.map(Path::to_path_buf),
            option: self.spec.option.clone(),
        })
    }

    /// Compiles and runs the version program against `root`.
    ///
    /// The first whitespace-separated word of its output is the version.
    /// Results are cached per root.
    pub async fn probe_version(&mut self, root: &Path) -> Result<String> {
        if let Some(version) = self.versions.get(root) {
            return Ok(version.clone());
        }

        // `CXX` may carry a launcher or flags, e.g. `ccache clang++ -stdlib=libc++`.
        let mut compiler = self.compiler.split_whitespace();
        let compiler_program = compiler.next().unwrap_or_default();
        which::which(compiler_program).map_err(|_| ProbeError::CompilerMissing {
            compiler: self.compiler.clone(),
        })?;

        let scratch = tempfile::Builder::new()
            .prefix("library-probe-")
            .tempdir()
            .map_err(ProbeError::Scratch)?;
        let source = scratch.path().join("version.cpp");
        let program = scratch.path().join("version");
        tokio::fs::write(&source, self.spec.probe_source())
            .await
            .map_err(ProbeError::Scratch)?;

        let compile = Invocation::new(compiler_program)
            .args(compiler)
            .arg(format!(
                "-I{}",
                root.join(&self.spec.include_dir).display()
            ))
            .arg(&source)
            .arg("-o")
            .arg(&program)
            .current_dir(scratch.path());
        let compile_failed = |reason: String| ProbeError::Compile {
            library: self.spec.name.clone(),
            root: root.to_path_buf(),
            reason,
        };
        let compiled = self
            .runner
            .run(&compile)
            .await
            .map_err(|e| compile_failed(e.to_string()))?;
        if !compiled.succeeded() {
            return Err(compile_failed(compiled.stderr.trim().to_string()));
        }

        let execute_failed = |reason: String| ProbeError::Execute {
            library: self.spec.name.clone(),
            reason,
        };
        let ran = self
            .runner
            .run(&Invocation::new(program.to_string_lossy()))
            .await
            .map_err(|e| execute_failed(e.to_string()))?;
        if !ran.succeeded() {
            return Err(execute_failed(format!(
                "exited with {:?}: {}",
                ran.status,
                ran.stderr.trim()
            )));
        }

        let version = ran
            .stdout
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| ProbeError::EmptyVersion {
                library: self.spec.name.clone(),
            })?;

        self.versions.insert(root.to_path_buf(), version.clone());
        Ok(version)
    }

    /// Build variables for `root` under `namespace`.
    ///
    /// `<NS>_VERSION` is included once the version of `root` has been probed.
    pub fn publish(&self, root: &Path, namespace: &str) -> BuildVariables {
        BuildVariables {
            namespace: namespace.to_string(),
            include: root.join(&self.spec.include_dir),
            lib: self.spec.link_name.clone(),
            libpath: root.join(&self.spec.lib_dir),
            version: self.versions.get(root).cloned(),
        }
    }

    /// Locates, probes and publishes in one step.
    pub async fn check(
        &mut self,
        override_root: Option<&Path>,
        namespace: &str,
    ) -> Result<BuildVariables> {
        let root = self.locate_install_root(override_root)?;
        let version = self.probe_version(&root).await?;
        log::info!("Checking {}: {}", self.spec.name, version);

        let vars = self.publish(&root, namespace);
        log::debug!("  {} include : {}", namespace, vars.include.display());
        log::debug!("  {} lib     : {}", namespace, vars.lib);
        log::debug!("  {} libpath : {}", namespace, vars.libpath.display());
        Ok(vars)
    }
}
