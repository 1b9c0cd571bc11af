//! The `probe` command: locate a native library and print its build variables.

use crate::bundler::{Settings, SystemRunner};
use crate::cli::{ProbeArgs, ProbeFormat};
use crate::error::Result;
use crate::probe::{BuildVariables, LibraryProbe};

/// Variables go to stdout untouched so they can be captured by scripts.
pub(super) async fn execute_probe(args: &ProbeArgs) -> Result<i32> {
    let settings = Settings::load_or_default(args.config.as_deref())?;
    let mut probe = LibraryProbe::new(settings.probe, &SystemRunner);

    let vars = probe.check(args.dir.as_deref(), &args.namespace).await?;

    print!("{}", render(&vars, args.format)?);
    Ok(0)
}

/// Formats variables for stdout.
pub fn render(vars: &BuildVariables, format: ProbeFormat) -> Result<String> {
    Ok(match format {
        ProbeFormat::Env => vars.to_env_lines(),
        ProbeFormat::Json => format!("{}\n", vars.to_json()?),
        ProbeFormat::Cargo => vars.to_cargo_directives(),
    })
}
