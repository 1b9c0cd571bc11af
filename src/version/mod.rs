//! Version selection for a packaging run.
//!
//! A distribution is either a numbered release, a named snapshot, or a
//! snapshot named after the current `git describe` output.

use crate::bundler::{Invocation, Result, ToolRunner};
use std::fmt;

/// How the version string of a distribution is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    /// A release with an explicit version number.
    Release(String),
    /// A snapshot with an explicit label.
    Snapshot(String),
    /// A snapshot labelled by `git describe` in the working directory.
    Git,
}

impl VersionSelection {
    /// Resolves the version string, running `git describe` when needed.
    pub async fn resolve<R: ToolRunner>(&self, runner: &R) -> Result<String> {
        match self {
            Self::Release(v) | Self::Snapshot(v) => Ok(v.clone()),
            Self::Git => git_describe(runner).await,
        }
    }
}

impl fmt::Display for VersionSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Release(v) => write!(f, "release {}", v),
            Self::Snapshot(v) => write!(f, "snapshot {}", v),
            Self::Git => write!(f, "git snapshot"),
        }
    }
}

/// Output of `git describe`, without the trailing newline.
pub async fn git_describe<R: ToolRunner>(runner: &R) -> Result<String> {
    let output = runner
        .run_checked(&Invocation::new("git").arg("describe"))
        .await?;
    let described = output.stdout.trim_end_matches(['\r', '\n']).to_string();
    if described.is_empty() {
        crate::bail!("git describe printed nothing");
    }
    Ok(described)
}
