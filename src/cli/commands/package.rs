//! The `package` command: bundle, sign and pack an application.

use crate::bundler::{
    AppBundle, BundleSettings, DiskImage, ImageReport, ResolutionReport, Settings, SystemRunner,
    ToolRunner, sign, tool::missing_tools, utils::fs,
};
use crate::cli::{OutputManager, PackageArgs};
use crate::error::{CliError, Result};
use crate::version::VersionSelection;
use std::path::{Path, PathBuf};

/// Everything a packaging run needs, merged from flags and the settings file.
#[derive(Debug, Clone)]
pub struct PackagePlan {
    /// Application bundle produced by the build.
    pub app: PathBuf,
    /// Application name, the bundle's file stem.
    pub name: String,
    /// Directory receiving the staged bundle and the image.
    pub output_dir: PathBuf,
    /// Platform suffix of output names.
    pub platform_tag: String,
    /// Value for `LSMinimumSystemVersion`.
    pub minimum_system_version: String,
    /// Copied into `Contents/Resources`.
    pub resources: Vec<PathBuf>,
    /// Whether toolkit plugins are bundled.
    pub plugins: bool,
    /// Signing identity.
    pub codesign: Option<String>,
    /// `hdiutil` format.
    pub dmg_format: String,
    /// Whether the image gets an `Applications` shortcut.
    pub applications_link: bool,
    /// Relocation settings.
    pub bundle: BundleSettings,
}

impl PackagePlan {
    /// Merges command line flags over the settings file.
    pub fn new(args: &PackageArgs, settings: &Settings) -> Result<Self> {
        let app = args
            .app
            .clone()
            .or_else(|| settings.package.app.clone())
            .ok_or_else(|| CliError::MissingArgument {
                argument: "--app (or package.app in the settings file)".to_string(),
            })?;
        let name = app
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| CliError::InvalidArguments {
                reason: format!("cannot derive an application name from {}", app.display()),
            })?;

        let resources = if args.resources.is_empty() {
            settings.package.resources.clone()
        } else {
            args.resources.clone()
        };

        Ok(Self {
            app,
            name,
            output_dir: args
                .output_dir
                .clone()
                .unwrap_or_else(|| settings.package.output_dir.clone()),
            platform_tag: args
                .platform_tag
                .clone()
                .unwrap_or_else(|| settings.package.platform_tag.clone()),
            minimum_system_version: args
                .min_macos
                .clone()
                .unwrap_or_else(|| settings.package.minimum_system_version.clone()),
            resources,
            plugins: settings.package.plugins && !args.no_plugins,
            codesign: args.codesign.clone(),
            dmg_format: settings.dmg.format.clone(),
            applications_link: settings.dmg.applications_link,
            bundle: settings.bundle.clone(),
        })
    }

    /// Where the distributable bundle is assembled: `<out>/<tag>/<Name>.app`.
    pub fn bundle_path(&self) -> PathBuf {
        self.output_dir
            .join(&self.platform_tag)
            .join(format!("{}.app", self.name))
    }

    /// Image title and volume label: `<Name>-<version>-<tag>`.
    pub fn title(&self, version: &str) -> String {
        format!("{}-{}-{}", self.name, version, self.platform_tag)
    }

    /// Image file: `<out>/<title>.dmg`.
    pub fn image_path(&self, version: &str) -> PathBuf {
        self.output_dir.join(format!("{}.dmg", self.title(version)))
    }

    /// External programs this plan invokes.
    pub fn required_tools(&self, selection: &VersionSelection) -> Vec<&str> {
        let mut tools = vec!["otool", "install_name_tool", "hdiutil"];
        if self.codesign.is_some() {
            tools.push("codesign");
        }
        if self.plugins
            && let Some(query) = self.bundle.plugin_query.first()
        {
            tools.push(query.as_str());
        }
        if *selection == VersionSelection::Git {
            tools.push("git");
        }
        tools
    }
}

/// Artifacts of a packaging run.
#[derive(Debug, Clone)]
pub struct PackageOutcome {
    /// Version string the run used.
    pub version: String,
    /// Finalized (and possibly signed) bundle.
    pub bundle: PathBuf,
    /// What image creation produced.
    pub image: ImageReport,
}

pub(super) async fn execute_package(
    args: &PackageArgs,
    selection: VersionSelection,
    output: &OutputManager,
) -> Result<i32> {
    let settings = Settings::load_or_default(args.config.as_deref())?;
    let plan = PackagePlan::new(args, &settings)?;

    if !cfg!(target_os = "macos") {
        return Err(CliError::UnsupportedHost {
            reason: format!(
                "packaging needs the macOS developer tools, this host runs {}",
                std::env::consts::OS
            ),
        }
        .into());
    }

    let missing = missing_tools(plan.required_tools(&selection));
    if !missing.is_empty() {
        return Err(CliError::ExecutionFailed {
            command: "package".to_string(),
            reason: format!("required tools not found in PATH: {}", missing.join(", ")),
        }
        .into());
    }

    // A failed hdiutil run has already been narrated as a warning.
    run_package(&SystemRunner, &plan, &selection, output).await?;
    Ok(0)
}

/// Runs the whole pipeline with `runner`.
///
/// Image creation failures are reported in [`PackageOutcome::image`] rather
/// than returned as errors.
pub async fn run_package<R: ToolRunner>(
    runner: &R,
    plan: &PackagePlan,
    selection: &VersionSelection,
    output: &OutputManager,
) -> Result<PackageOutcome> {
    let version = selection.resolve(runner).await?;
    output.section(&format!("Packaging {} {} ({})", plan.name, version, selection));

    let target = plan.bundle_path();
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent, false).await?;
    }

    output.progress(&format!("Preparing {}", target.display()));
    let mut app = AppBundle::initialize(&plan.app, &target, plan.bundle.clone(), runner).await?;

    if plan.plugins {
        output.progress("Copying plugins");
        let report = app.inject_plugins().await?;
        narrate_report(output, &report);
    }

    output.progress("Taking care of libraries");
    let report = app.resolve_dependencies(None).await?;
    narrate_report(output, &report);

    if !plan.resources.is_empty() {
        output.progress("Copying resources");
        let copied = app.inject_resources(&plan.resources).await?;
        output.indent(&format!("{} of {} resources copied", copied, plan.resources.len()));
    }

    output.progress(&format!(
        "Setting minimum macOS version to {}",
        plan.minimum_system_version
    ));
    app.set_minimum_platform_version(&plan.minimum_system_version);
    app.stamp_version(&version);
    let bundle = app.finalize()?;
    output.success(&format!("Bundle ready: {}", bundle.display()));

    if let Some(identity) = &plan.codesign {
        output.section("Signing");
        output.progress(&format!("Signing binaries with identity '{}'", identity));
        sign(runner, identity, std::slice::from_ref(&bundle)).await?;
        output.success("Signed");
    }

    output.section("Creating disk image");
    let title = plan.title(&version);
    let image = DiskImage::new(plan.image_path(&version), title.as_str(), plan.dmg_format.as_str())?;
    if plan.applications_link {
        image.symlink(Path::new("/Applications"), "/Applications")?;
    }
    image.stage(&bundle, &format!("/{}.app", plan.name)).await?;
    let report = image.create(runner).await?;

    if report.succeeded() {
        output.success(&format!("Created {}", report.path.display()));
    } else {
        output.warn(&format!(
            "hdiutil failed ({:?}); {} may be missing or incomplete",
            report.output.status,
            report.path.display()
        ));
    }

    Ok(PackageOutcome {
        version,
        bundle,
        image: report,
    })
}

fn narrate_report(output: &OutputManager, report: &ResolutionReport) {
    for name in &report.copied {
        output.indent(&format!("bundled {}", name));
    }
    for name in &report.missing {
        output.warn(&format!("{} not found, left as is", name));
    }
}
