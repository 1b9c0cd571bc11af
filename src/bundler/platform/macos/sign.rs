//! macOS code signing.
//!
//! Signs finished bundles with `codesign` using an identity from the user's
//! keychain. Signing is deep and forced, so nested frameworks and plugins are
//! re-signed along with the bundle.

use crate::bundler::{
    error::Result,
    tool::{Invocation, ToolRunner},
};
use std::path::{Path, PathBuf};

/// The `codesign` invocation for one path.
pub fn codesign_invocation(identity: &str, path: &Path) -> Invocation {
    Invocation::new("codesign")
        .args(["-vvvv", "--deep", "--force", "--sign", identity])
        .arg(path)
}

/// Signs each path in order with `identity`.
///
/// # Returns
/// * `Ok(())` - Every path was signed
/// * `Err(Error::ExternalTool)` - The first path `codesign` rejected; later
///   paths are not attempted and earlier signatures are left in place
pub async fn sign<R: ToolRunner>(runner: &R, identity: &str, paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        log::info!("Signing {} with identity '{}'", path.display(), identity);
        runner
            .run_checked(&codesign_invocation(identity, path))
            .await?;
        log::info!("✓ Successfully signed {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codesign_is_deep_and_forced() {
        let inv = codesign_invocation("Developer ID Application: Example", Path::new("A.app"));
        assert_eq!(inv.program(), "codesign");
        assert_eq!(
            inv.display(),
            "codesign -vvvv --deep --force --sign Developer ID Application: Example A.app"
        );
    }
}
