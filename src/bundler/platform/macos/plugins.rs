//! Plugin tree discovery and pruning.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    tool::{Invocation, ToolRunner},
    utils::fs,
};
use std::path::{Path, PathBuf};

/// Asks the toolkit where its plugins are installed, e.g.
/// `qmake -query QT_INSTALL_PLUGINS`.
pub async fn query_plugin_root<R: ToolRunner>(runner: &R, query: &[String]) -> Result<PathBuf> {
    let Some((program, args)) = query.split_first() else {
        return Err(Error::GenericError("plugin query command is empty".into()));
    };

    let invocation = Invocation::new(program.as_str()).args(args);
    let output = runner.run_checked(&invocation).await?;
    let root = output.stdout.trim();
    if root.is_empty() {
        return Err(Error::GenericError(format!(
            "{} printed no plugin directory",
            invocation.display()
        )));
    }

    log::debug!("Plugin root: {}", root);
    Ok(PathBuf::from(root))
}

/// Removes excluded categories and debug builds from a copied plugin tree.
///
/// Returns the plugin libraries that remain, sorted by path.
pub async fn prune_plugins(plugins_dir: &Path, excluded: &[String]) -> Result<Vec<PathBuf>> {
    let mut libraries = Vec::new();

    for category in sorted_entries(plugins_dir).await? {
        if !category.is_dir() {
            continue;
        }
        let name = file_name(&category);
        if excluded.iter().any(|e| *e == name) {
            log::debug!("Removing excluded plugin category {}", name);
            fs::remove_path(&category).await?;
            continue;
        }

        for plugin in sorted_entries(&category).await? {
            if file_name(&plugin).ends_with("_debug.dylib") {
                fs::remove_path(&plugin).await?;
            } else if plugin.is_file() {
                libraries.push(plugin);
            }
        }
    }

    Ok(libraries)
}

async fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .fs_context("reading directory", dir)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .fs_context("reading directory entry", dir)?
    {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
