//! macOS DMG disk image creator.
//!
//! Content is assembled in a temporary staging folder whose root becomes the
//! root of the mounted volume, then packed with the native `hdiutil` tool.
//! Staging destinations are written as absolute paths inside that volume,
//! e.g. `/ChronoChat.app` or `/Docs/`.

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    tool::{Invocation, ToolOutput, ToolRunner},
    utils::fs,
};
use path_absolutize::Absolutize;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Default `hdiutil` format: bzip2-compressed, read-only.
pub const DEFAULT_FORMAT: &str = "UDBZ";

/// Result of [`DiskImage::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReport {
    /// Image file `hdiutil` was asked to write.
    pub path: PathBuf,
    /// What `hdiutil` returned.
    pub output: ToolOutput,
}

impl ImageReport {
    /// Whether `hdiutil` exited successfully.
    pub fn succeeded(&self) -> bool {
        self.output.succeeded()
    }
}

/// A disk image under construction.
#[derive(Debug)]
pub struct DiskImage {
    staging: TempDir,
    filename: PathBuf,
    volume_name: String,
    format: String,
}

impl DiskImage {
    /// Creates an empty staging folder for an image written to `filename`.
    pub fn new(
        filename: impl Into<PathBuf>,
        volume_name: impl Into<String>,
        format: impl Into<String>,
    ) -> Result<Self> {
        let staging = tempfile::Builder::new()
            .prefix("dmg-staging-")
            .tempdir()
            .map_err(|e| {
                Error::GenericError(format!(
                    "Failed to create temporary directory for DMG contents: {}",
                    e
                ))
            })?;

        Ok(Self {
            staging,
            filename: filename.into(),
            volume_name: volume_name.into(),
            format: format.into(),
        })
    }

    /// Root of the staging folder.
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Output image path.
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Copies `source` into the image at `dest`.
    ///
    /// A `dest` ending in `/` names a directory and receives the source's
    /// basename. Directories are copied with their symlinks intact.
    pub async fn stage(&self, source: &Path, dest: &str) -> Result<PathBuf> {
        let mut target = self.resolve(dest)?;
        if dest.ends_with('/') {
            let name = source.file_name().ok_or_else(|| {
                Error::GenericError(format!("{} has no file name", source.display()))
            })?;
            target = target.join(name);
        }

        if source.is_dir() {
            fs::copy_dir(source, &target).await?;
        } else if source.exists() {
            fs::copy_file(source, &target).await?;
        } else {
            return Err(Error::MissingFile {
                path: source.to_path_buf(),
            });
        }

        log::debug!("Staged {} at {}", source.display(), dest);
        Ok(target)
    }

    /// Creates a symlink at `link` inside the image pointing to `target` on
    /// the machine mounting it, e.g. `/Applications`.
    ///
    /// A relative `target` is made absolute against the current directory.
    pub fn symlink(&self, target: &Path, link: &str) -> Result<PathBuf> {
        let target = target
            .absolutize()
            .fs_context("resolving symlink target", target)?;
        let link_path = self.resolve(link)?;
        if let Some(parent) = link_path.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        fs::symlink(&target, &link_path).fs_context("creating symlink", &link_path)?;
        Ok(link_path)
    }

    /// Creates a directory inside the image.
    pub async fn mkdir(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        fs::create_dir_all(&path, false).await?;
        Ok(path)
    }

    /// Packs the staging folder into the image file.
    ///
    /// An existing file or directory at the output path is replaced. The
    /// staging folder is removed whatever happens. A non-zero `hdiutil` exit
    /// is not turned into an error; inspect [`ImageReport::output`].
    pub async fn create<R: ToolRunner>(self, runner: &R) -> Result<ImageReport> {
        let Self {
            staging,
            filename,
            volume_name,
            format,
        } = self;

        fs::remove_path(&filename).await?;
        if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent, false).await?;
        }

        log::info!("Creating DMG with format {}...", format);
        let invocation = Invocation::new("hdiutil")
            .arg("create")
            .arg("-srcfolder")
            .arg(staging.path())
            .args(["-format", format.as_str()])
            .args(["-volname", volume_name.as_str()])
            .arg(&filename);
        let result = runner.run(&invocation).await;

        if let Err(e) = staging.close() {
            log::warn!("Failed to remove DMG staging directory: {}", e);
        }

        let output = result?;
        if output.succeeded() {
            log::info!("Done");
        } else {
            log::warn!(
                "hdiutil exited with {:?}: {}",
                output.status,
                output.stderr.trim()
            );
        }

        Ok(ImageReport {
            path: filename,
            output,
        })
    }

    fn resolve(&self, dest: &str) -> Result<PathBuf> {
        let relative = dest
            .strip_prefix('/')
            .ok_or_else(|| Error::InvalidStagingPath(dest.to_string()))?;
        Ok(self.staging.path().join(relative.trim_end_matches('/')))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn relative_destinations_are_rejected() {
        let image = DiskImage::new("out.dmg", "Vol", DEFAULT_FORMAT).unwrap();
        let err = image.mkdir("Docs").await.unwrap_err();
        assert!(matches!(err, Error::InvalidStagingPath(ref d) if d == "Docs"));
    }

    #[tokio::test]
    async fn trailing_slash_appends_basename() {
        let tmp = tempfile::tempdir().unwrap();
        let readme = tmp.path().join("README.txt");
        std::fs::write(&readme, b"hi").unwrap();

        let image = DiskImage::new(tmp.path().join("out.dmg"), "Vol", DEFAULT_FORMAT).unwrap();
        let staged = image.stage(&readme, "/Docs/").await.unwrap();

        assert_eq!(staged, image.staging_dir().join("Docs/README.txt"));
        assert_eq!(std::fs::read(staged).unwrap(), b"hi");
    }

    #[cfg(unix)]
    #[test]
    fn relative_symlink_targets_become_absolute() {
        let image = DiskImage::new("out.dmg", "Vol", DEFAULT_FORMAT).unwrap();
        let link = image.symlink(Path::new("Applications"), "/Applications").unwrap();

        let target = std::fs::read_link(&link).unwrap();
        assert!(target.is_absolute());
        assert_eq!(
            target,
            std::env::current_dir().unwrap().join("Applications")
        );
    }

    #[tokio::test]
    async fn missing_source_is_reported() {
        let image = DiskImage::new("out.dmg", "Vol", DEFAULT_FORMAT).unwrap();
        let err = image
            .stage(Path::new("/definitely/not/here.app"), "/here.app")
            .await
            .unwrap_err();
        assert!(err.is_missing_file());
    }
}
