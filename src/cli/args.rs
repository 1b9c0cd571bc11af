//! Command line argument parsing and validation.

use crate::version::VersionSelection;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand, ValueEnum};
use std::ffi::OsString;
use std::path::PathBuf;

/// Package macOS applications and probe native libraries
#[derive(Parser, Debug)]
#[command(
    name = "macos_dist",
    version,
    about = "Package macOS applications into signed, self-contained disk images",
    long_about = "Package macOS applications into signed, self-contained disk images.

Usage:
  macos_dist package --release 0.5 --app build/ChronoChat.app
  macos_dist package --git --codesign \"Developer ID Application: Example\"
  macos_dist probe --ndn-cpp-dir /usr/local/ndn --format cargo"
)]
pub struct Args {
    /// Command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Suppress progress narration
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle, sign and pack an application into a disk image
    Package(PackageArgs),
    /// Locate a native library and print its build variables
    Probe(ProbeArgs),
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Command::Package(_) => "package",
            Command::Probe(_) => "probe",
        }
    }
}

/// Arguments of `macos_dist package`
#[derive(clap::Args, Debug, Clone, Default)]
pub struct PackageArgs {
    /// Build a release with this version number
    #[arg(short = 'r', long, value_name = "VERSION")]
    pub release: Option<String>,

    /// Build a snapshot with this version label
    #[arg(short = 's', long, value_name = "VERSION")]
    pub snapshot: Option<String>,

    /// Build a snapshot labelled by `git describe`
    #[arg(short = 'g', long)]
    pub git: bool,

    /// Identity to sign with (no signing when absent)
    #[arg(long, value_name = "IDENTITY")]
    pub codesign: Option<String>,

    /// Application bundle produced by the build
    #[arg(long, value_name = "APP")]
    pub app: Option<PathBuf>,

    /// Directory receiving the bundle and the disk image [default: build]
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Platform suffix of output names [default: Mavericks-10.9]
    #[arg(long, value_name = "TAG")]
    pub platform_tag: Option<String>,

    /// Minimum macOS version written to Info.plist [default: 10.9.0]
    #[arg(long = "min-macos", value_name = "VERSION")]
    pub min_macos: Option<String>,

    /// File or directory copied into Contents/Resources (repeatable)
    #[arg(long = "resource", value_name = "PATH")]
    pub resources: Vec<PathBuf>,

    /// Do not bundle toolkit plugins
    #[arg(long)]
    pub no_plugins: bool,

    /// Settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl PackageArgs {
    /// The version flag that was given; exactly one is required.
    pub fn version_selection(&self) -> Result<VersionSelection, String> {
        match (&self.release, &self.snapshot, self.git) {
            (Some(v), None, false) => Ok(VersionSelection::Release(v.clone())),
            (None, Some(v), false) => Ok(VersionSelection::Snapshot(v.clone())),
            (None, None, true) => Ok(VersionSelection::Git),
            (None, None, false) => {
                Err("ERROR: Neither snapshot or release selected. Bailing.".to_string())
            }
            _ => Err(
                "ERROR: --release, --snapshot and --git are mutually exclusive. Bailing."
                    .to_string(),
            ),
        }
    }
}

/// Output formats of `macos_dist probe`
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeFormat {
    /// `KEY=VALUE` lines
    #[default]
    Env,
    /// A JSON object
    Json,
    /// Cargo build script directives
    Cargo,
}

/// Arguments of `macos_dist probe`
#[derive(clap::Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Install root of the library, e.g. /usr/local/ndn
    #[arg(long, value_name = "DIR", visible_aliases = ["ndn-cpp-dir", "ndn-cpp"])]
    pub dir: Option<PathBuf>,

    /// Suffix of the published variable names
    #[arg(long, default_value = "NDNCPP")]
    pub namespace: String,

    /// How to print the variables
    #[arg(long, value_enum, default_value_t)]
    pub format: ProbeFormat,

    /// Settings file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ProbeArgs {
    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.namespace.trim().is_empty() {
            return Err("--namespace must not be empty".to_string());
        }
        Ok(())
    }
}

impl Args {
    /// Parse command line arguments, accepting `--<library_option>` as one
    /// more spelling of `probe --dir`. Exits on a parse error.
    pub fn parse_with_library_option<I, T>(argv: I, library_option: &str) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_with_library_option(argv, library_option).unwrap_or_else(|e| e.exit())
    }

    /// Fallible form of [`parse_with_library_option`](Self::parse_with_library_option).
    pub fn try_parse_with_library_option<I, T>(
        argv: I,
        library_option: &str,
    ) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command_with_library_option(library_option).try_get_matches_from(argv)?;
        Self::from_arg_matches(&matches)
    }

    /// The parser, with `--<library_option>` registered on `probe --dir`.
    ///
    /// An option already spelled by another flag is left out.
    pub fn command_with_library_option(library_option: &str) -> clap::Command {
        let command = Self::command();
        let option = library_option.trim_start_matches('-');
        if option.is_empty() || ["help", "version"].contains(&option) {
            return command;
        }

        let spelled = |cmd: &clap::Command| {
            cmd.get_arguments().any(|arg| {
                arg.get_long_and_visible_aliases()
                    .is_some_and(|longs| longs.contains(&option))
            })
        };
        let taken = spelled(&command)
            || command
                .find_subcommand("probe")
                .is_some_and(|probe| spelled(probe));
        if taken {
            return command;
        }

        let option = option.to_string();
        command.mut_subcommand("probe", |probe| {
            probe.mut_arg("dir", |dir| dir.visible_alias(option))
        })
    }
}

/// Value of `--config` in a raw argument list, if any.
pub fn config_path(argv: &[OsString]) -> Option<PathBuf> {
    let mut args = argv.iter();
    while let Some(arg) = args.next() {
        let arg = arg.to_string_lossy();
        if arg == "--" {
            break;
        }
        if arg == "--config" {
            return args.next().map(PathBuf::from);
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(PathBuf::from(path));
        }
    }
    None
}
