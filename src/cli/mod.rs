//! Command line interface for macos_dist.

mod args;
pub mod commands;
mod output;

pub use args::{Args, Command, PackageArgs, ProbeArgs, ProbeFormat, config_path};
pub use commands::{PackageOutcome, PackagePlan, execute_command, run_package};
pub use output::OutputManager;

use crate::bundler::Settings;
use crate::error::Result;
use crate::probe::LibrarySpec;
use std::ffi::OsString;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let argv: Vec<OsString> = std::env::args_os().collect();

    // The probed library's override flag comes from the settings file, which
    // must be read before the command line can be parsed. A broken file is
    // reported by the command itself once parsing succeeds.
    let library_option = Settings::load_or_default(config_path(&argv).as_deref())
        .map(|settings| settings.probe.option)
        .unwrap_or_else(|_| LibrarySpec::default().option);

    let args = Args::parse_with_library_option(argv, &library_option);
    execute_command(args).await
}
