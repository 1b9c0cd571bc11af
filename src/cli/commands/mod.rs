//! Command execution with uniform error reporting.

mod package;
mod probe;

pub use package::{PackageOutcome, PackagePlan, run_package};
pub use probe::render;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;
use clap::CommandFactory;

use package::execute_package;
use probe::execute_probe;

/// Execute the command named by the parsed arguments and return the exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    let output = OutputManager::new(args.quiet);

    let result = match &args.command {
        Command::Package(package) => match package.version_selection() {
            Ok(selection) => execute_package(package, selection, &output).await,
            Err(reason) => return Ok(reject(&output, &reason, args.command.name())),
        },
        Command::Probe(probe) => match probe.validate() {
            Ok(()) => execute_probe(probe).await,
            Err(reason) => return Ok(reject(&output, &reason, args.command.name())),
        },
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            output.error(&format!("Command '{}' failed: {}", args.command.name(), e));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.println(&format!("  • {}", suggestion));
                }
            }

            Ok(1)
        }
    }
}

/// Reports invalid arguments with the subcommand's usage.
fn reject(output: &OutputManager, reason: &str, subcommand: &str) -> i32 {
    output.error(reason);
    print_usage(subcommand);
    1
}

fn print_usage(subcommand: &str) {
    let mut command = Args::command();
    command.build();
    let printed = match command.find_subcommand_mut(subcommand) {
        Some(sub) => sub.print_help(),
        None => command.print_help(),
    };
    if let Err(e) = printed {
        log::debug!("Could not print usage: {}", e);
    }
}
