//! File system utilities for bundling.
//!
//! Provides safe file operations with automatic directory creation,
//! symlink preservation, and comprehensive error handling.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io::{self},
    path::Path,
};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        // Try removal, ignore NotFound (idempotent)
        match fs::remove_dir_all(path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).fs_context("erasing directory", path),
        }
    }

    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes whatever lives at `path`: a file, a symlink or a whole directory.
///
/// Symlinks are removed themselves, never followed.
pub async fn remove_path(path: &Path) -> Result<()> {
    let metadata = match fs::symlink_metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e).fs_context("inspecting path", path),
    };

    if metadata.is_dir() {
        remove_dir_all(path).await
    } else {
        fs::remove_file(path)
            .await
            .fs_context("removing file", path)
    }
}

/// Sets mode 0755 on the file (following symlinks).
pub async fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
            .await
            .fs_context("setting executable permissions", path)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

/// Makes a symbolic link at `dst` pointing to `src`.
#[cfg(unix)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

/// Makes a symbolic link at `dst` pointing to `src`.
#[cfg(windows)]
pub fn symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        std::os::windows::fs::symlink_dir(src, dst)
    } else {
        std::os::windows::fs::symlink_file(src, dst)
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// An existing destination is overwritten.
/// Fails if the source path is a directory or doesn't exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::MissingFile {
            path: from.to_path_buf(),
        });
    }
    if !from.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    // A read-only or symlinked destination would otherwise be written through.
    if fs::symlink_metadata(to).await.is_ok() {
        remove_path(to).await?;
    }
    fs::copy(from, to).await.fs_context("copying file", from)?;
    Ok(())
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Preserves symlinks on platforms that support them.
/// Fails if the source path is not a directory or doesn't exist.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    copy_dir_with(from, to, true).await
}

/// Recursively copies a directory, replacing every symlink with a copy of
/// what it points to.
pub async fn copy_dir_resolved(from: &Path, to: &Path) -> Result<()> {
    copy_dir_with(from, to, false).await
}

async fn copy_dir_with(from: &Path, to: &Path, preserve_symlinks: bool) -> Result<()> {
    if !from.exists() {
        return Err(Error::MissingFile {
            path: from.to_path_buf(),
        });
    }
    if !from.is_dir() {
        return Err(Error::GenericError(format!("{from:?} is not a Directory")));
    }

    // Clone paths for move into blocking closure
    let from = from.to_path_buf();
    let to = to.to_path_buf();

    // Offload blocking work to dedicated thread pool
    tokio::task::spawn_blocking(move || -> Result<()> {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }

        let walker = walkdir::WalkDir::new(&from).follow_links(!preserve_symlinks);
        for entry in walker {
            let entry = entry?;
            let rel_path = entry.path().strip_prefix(&from)?;
            let dest_path = to.join(rel_path);

            if entry.file_type().is_symlink() {
                let target = std::fs::read_link(entry.path())
                    .fs_context("reading symlink", entry.path())?;
                symlink(&target, &dest_path).fs_context("creating symlink", &dest_path)?;
            } else if entry.file_type().is_dir() {
                std::fs::create_dir_all(&dest_path)
                    .fs_context("creating directory", &dest_path)?;
            } else {
                std::fs::copy(entry.path(), &dest_path).fs_context("copying file", entry.path())?;
            }
        }

        Ok(())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Directory copy task panicked: {}", e)))?
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn copy_dir_keeps_symlinks_as_links() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("Foo.framework");
        std::fs::create_dir_all(src.join("Versions/A")).unwrap();
        std::fs::write(src.join("Versions/A/Foo"), b"bin").unwrap();
        symlink(Path::new("A"), &src.join("Versions/Current")).unwrap();
        symlink(Path::new("Versions/Current/Foo"), &src.join("Foo")).unwrap();

        let dst = tmp.path().join("out/Foo.framework");
        copy_dir(&src, &dst).await.unwrap();

        let link = std::fs::symlink_metadata(dst.join("Foo")).unwrap();
        assert!(link.file_type().is_symlink());
        assert_eq!(std::fs::read(dst.join("Foo")).unwrap(), b"bin");
    }

    #[tokio::test]
    async fn copy_dir_resolved_materializes_links() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("plugins");
        std::fs::create_dir_all(src.join("imageformats")).unwrap();
        std::fs::write(tmp.path().join("real.dylib"), b"plugin").unwrap();
        symlink(
            &tmp.path().join("real.dylib"),
            &src.join("imageformats/libqjpeg.dylib"),
        )
        .unwrap();

        let dst = tmp.path().join("QtPlugins");
        copy_dir_resolved(&src, &dst).await.unwrap();

        let meta = std::fs::symlink_metadata(dst.join("imageformats/libqjpeg.dylib")).unwrap();
        assert!(meta.file_type().is_file());
    }

    #[tokio::test]
    async fn copy_file_overwrites_and_reports_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("qt.conf");
        let dst = tmp.path().join("Resources/qt.conf");
        std::fs::write(&src, b"new").unwrap();
        std::fs::create_dir_all(dst.parent().unwrap()).unwrap();
        std::fs::write(&dst, b"old").unwrap();

        copy_file(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"new");

        let err = copy_file(&tmp.path().join("absent"), &dst).await.unwrap_err();
        assert!(err.is_missing_file());
    }

    #[tokio::test]
    async fn remove_path_handles_files_dirs_and_absence() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("Headers");
        std::fs::create_dir_all(dir.join("sub")).unwrap();
        let file = tmp.path().join("QtCore.prl");
        std::fs::write(&file, b"x").unwrap();

        remove_path(&dir).await.unwrap();
        remove_path(&file).await.unwrap();
        remove_path(&tmp.path().join("never-existed")).await.unwrap();
        assert!(!dir.exists());
        assert!(!file.exists());
    }
}
